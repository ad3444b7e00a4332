use anyhow::{Result, bail, ensure};
use log::{debug, trace};

use crate::process::mot::object::MotObject;
use crate::structs::mot::{MOT_DG_TYPE_BODY, MOT_DG_TYPE_HEADER, MotFile};
use crate::utils::errors::MotError;

/// Length of the CRC trailing every MOT data group.
const CRC_LEN: usize = 2;

/// Headers of one MOT data group (EN 300 401 clause 5.3.3, EN 301 234
/// clause 5.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotSegmentInfo {
    pub dg_type: u8,
    pub last: bool,
    pub segment_number: u16,
    pub transport_id: u16,
    /// Offset of the segment data.
    pub offset: usize,
    pub segment_size: usize,
}

impl MotSegmentInfo {
    pub fn is_header(&self) -> bool {
        self.dg_type == MOT_DG_TYPE_HEADER
    }

    /// Parses data group, session and segmentation headers.
    ///
    /// `dg` is the whole data group including its trailing CRC.
    pub fn read(dg: &[u8]) -> Result<Self> {
        let truncated = || MotError::Truncated(dg.len());

        // data group header
        ensure!(dg.len() >= 2, truncated());
        let flags = dg[0];
        let extension = flags & 0x80 != 0;
        let crc = flags & 0x40 != 0;
        let segment = flags & 0x20 != 0;
        let user_access = flags & 0x10 != 0;
        let dg_type = flags & 0x0F;
        let mut offset = 2 + if extension { 2 } else { 0 };

        if !(crc && segment && user_access) {
            bail!(MotError::MissingFlags {
                crc,
                segment,
                user_access,
            });
        }

        if dg_type != MOT_DG_TYPE_HEADER && dg_type != MOT_DG_TYPE_BODY {
            bail!(MotError::UnsupportedDataGroupType(dg_type));
        }

        // session header
        ensure!(dg.len() >= offset + 3, truncated());
        let last = dg[offset] & 0x80 != 0;
        let segment_number = u16::from_be_bytes([dg[offset] & 0x7F, dg[offset + 1]]);
        let transport_id_flag = dg[offset + 2] & 0x10 != 0;
        let length_indicator = dg[offset + 2] & 0x0F;
        offset += 3;

        ensure!(transport_id_flag, MotError::MissingTransportId);
        ensure!(
            length_indicator >= 2,
            MotError::ShortLengthIndicator(length_indicator)
        );
        ensure!(dg.len() >= offset + length_indicator as usize, truncated());

        let transport_id = u16::from_be_bytes([dg[offset], dg[offset + 1]]);
        offset += length_indicator as usize;

        // segmentation header
        ensure!(dg.len() >= offset + 2, truncated());
        let segment_size = (((dg[offset] & 0x1F) as usize) << 8) | dg[offset + 1] as usize;
        offset += 2;

        let available = dg.len().checked_sub(offset + CRC_LEN).ok_or_else(truncated)?;
        ensure!(
            segment_size == available,
            MotError::SegmentSizeMismatch {
                declared: segment_size,
                available,
            }
        );

        Ok(Self {
            dg_type,
            last,
            segment_number,
            transport_id,
            offset,
            segment_size,
        })
    }
}

/// Tracks the MOT object currently being transported.
///
/// Only one object is kept; a change of transport id replaces it.
#[derive(Debug, Default)]
pub struct MotManager {
    object: MotObject,
    transport_id: Option<u16>,
}

impl MotManager {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn transport_id(&self) -> Option<u16> {
        self.transport_id
    }

    /// Handles one CRC-checked MOT data group.
    ///
    /// Returns the completed file once its object is ready to be shown.
    pub fn handle_data_group(&mut self, dg: &[u8]) -> Option<MotFile> {
        let info = match MotSegmentInfo::read(dg) {
            Ok(info) => info,
            Err(err) => {
                debug!("MOT: dropping data group: {err}");
                return None;
            }
        };

        trace!(
            "MOT: {} segment {}{} of transport id {}, {} bytes",
            if info.is_header() { "header" } else { "body" },
            info.segment_number,
            if info.last { " (last)" } else { "" },
            info.transport_id,
            info.segment_size
        );

        if self.transport_id != Some(info.transport_id) {
            self.transport_id = Some(info.transport_id);
            self.object = MotObject::default();
        }

        self.object.add_segment(
            info.is_header(),
            info.segment_number,
            info.last,
            &dg[info.offset..info.offset + info.segment_size],
        );

        if !self.object.is_to_be_shown() {
            return None;
        }

        debug!("MOT: object {} complete", info.transport_id);
        Some(self.object.file().clone())
    }
}
