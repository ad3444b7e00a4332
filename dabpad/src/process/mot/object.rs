use anyhow::{Result, bail, ensure};
use log::{debug, trace};

use crate::process::mot::entity::MotEntity;
use crate::structs::mot::*;
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::charset::{Charset, to_utf8};
use crate::utils::errors::MotError;

/// Parameter length indicator (EN 301 234 clause 6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParameterLength {
    Fixed(usize),
    Variable,
}

impl From<u8> for ParameterLength {
    fn from(pli: u8) -> Self {
        match pli & 0b11 {
            0b00 => Self::Fixed(0),
            0b01 => Self::Fixed(1),
            0b10 => Self::Fixed(4),
            _ => Self::Variable,
        }
    }
}

/// A MOT object under reassembly: header entity, body entity and the file
/// built from the header.
#[derive(Debug, Clone, Default)]
pub struct MotObject {
    header: MotEntity,
    body: MotEntity,
    header_received: bool,
    shown: bool,
    file: MotFile,
}

impl MotObject {
    pub fn add_segment(&mut self, is_header: bool, index: u16, last: bool, bytes: &[u8]) {
        let entity = if is_header {
            &mut self.header
        } else {
            &mut self.body
        };

        entity.add_segment(index, last, bytes);
    }

    pub fn file(&self) -> &MotFile {
        &self.file
    }

    #[cfg(test)]
    pub fn header_received(&self) -> bool {
        self.header_received
    }

    /// Reports whether the object just became complete and shall be shown.
    ///
    /// Returns `true` at most once per object.
    pub fn is_to_be_shown(&mut self) -> bool {
        if self.shown {
            return false;
        }

        if self.header.is_finished() {
            let result = self.parse_header();
            // a later header update arrives in a fresh entity
            self.header.reset();

            if let Err(err) = result {
                debug!("MOT: header rejected: {err}");
                return false;
            }
        }

        if !self.header_received {
            return false;
        }

        if !self.body.is_finished() || self.body.size() != self.file.body_size {
            return false;
        }

        if !self.file.trigger_now {
            trace!("MOT: object complete but not triggered for now");
            return false;
        }

        self.file.body = self.body.data();
        self.shown = true;

        true
    }

    fn parse_header(&mut self) -> Result<()> {
        let data = self.header.data();
        let core = MotHeaderCore::read(&mut BsIoSliceReader::from_slice(&data))?;

        trace!(
            "MOT header: body size {}, header size {}, content type {:#06X}",
            core.body_size,
            core.header_size,
            core.full_content_type()
        );

        ensure!(
            core.header_size == self.header.size(),
            MotError::HeaderSizeMismatch {
                declared: core.header_size,
                received: self.header.size(),
            }
        );

        let update = core.full_content_type() == MOT_CONTENT_TYPE_HEADER_UPDATE;
        match (self.header_received, update) {
            (false, true) => bail!(MotError::UpdateWithoutHeader),
            (true, false) => bail!(MotError::DuplicateHeader),
            _ => {}
        }

        let mut file = self.file.clone();
        if !update {
            file.body_size = core.body_size;
            file.content_main_type = MotContentMainType::from(core.content_type);
            file.content_type = core.full_content_type();
        }

        let old_name = file.content_name.clone();
        let mut new_name = String::new();

        let mut offset = MOT_HEADER_CORE_LEN;
        while offset < data.len() {
            let pli = ParameterLength::from(data[offset] >> 6);
            let id = data[offset] & 0x3F;
            offset += 1;

            let len = match pli {
                ParameterLength::Fixed(len) => len,
                ParameterLength::Variable => {
                    let Some(&indicator) = data.get(offset) else {
                        bail!(MotError::ParameterOverrun {
                            id,
                            needed: offset + 1,
                            available: data.len(),
                        });
                    };
                    offset += 1;

                    let mut len = (indicator & 0x7F) as usize;
                    if indicator & 0x80 != 0 {
                        let Some(&low) = data.get(offset) else {
                            bail!(MotError::ParameterOverrun {
                                id,
                                needed: offset + 1,
                                available: data.len(),
                            });
                        };
                        offset += 1;
                        len = (len << 8) | low as usize;
                    }

                    len
                }
            };

            ensure!(
                offset + len <= data.len(),
                MotError::ParameterOverrun {
                    id,
                    needed: offset + len,
                    available: data.len(),
                }
            );

            let param = &data[offset..offset + len];
            match id {
                MOT_PARAM_EXPIRE_TIME => {
                    file.expire_time = read_time(id, param);
                }
                MOT_PARAM_TRIGGER_TIME => {
                    ensure!(len >= 4, MotError::ParameterLength { id, len });
                    // only the validity flag decides; the time itself is informational
                    file.trigger_now = param[0] & 0x80 == 0;
                    file.trigger_time = read_time(id, param);
                }
                MOT_PARAM_CONTENT_NAME => {
                    ensure!(len >= 1, MotError::ParameterLength { id, len });
                    let charset = Charset::from(param[0] >> 4);
                    file.content_name = to_utf8(&param[1..], charset);
                    file.content_name_charset = charset;
                    new_name = file.content_name.clone();
                    trace!("MOT ContentName: {:?}", file.content_name);
                }
                MOT_PARAM_UNIQUE_BODY_VERSION => {
                    ensure!(len == 4, MotError::ParameterLength { id, len });
                    let version = u32::from_be_bytes([param[0], param[1], param[2], param[3]]);
                    trace!("MOT UniqueBodyVersion: {version:#X}");
                    file.unique_body_version = Some(version);
                }
                MOT_PARAM_CATEGORY_SLIDE_ID => {
                    ensure!(len >= 2, MotError::ParameterLength { id, len });
                    file.category = Some(param[0]);
                    file.slide_id = Some(param[1]);
                    trace!("MOT Category/SlideID: {}/{}", param[0], param[1]);
                }
                MOT_PARAM_CATEGORY_TITLE => {
                    file.category_title = String::from_utf8_lossy(param).into_owned();
                }
                MOT_PARAM_CLICK_THROUGH_URL => {
                    file.click_through_url = String::from_utf8_lossy(param).into_owned();
                    trace!("MOT ClickThroughURL: {}", file.click_through_url);
                }
                MOT_PARAM_ALT_LOCATION_URL => {
                    file.alt_location_url = String::from_utf8_lossy(param).into_owned();
                    trace!("MOT AlternativeLocationURL: {}", file.alt_location_url);
                }
                MOT_PARAM_ALERT => debug!("MOT Alert ({len} bytes)"),
                _ => trace!("MOT: skipping parameter {id:#04X} ({len} bytes)"),
            }

            offset += len;
        }

        if update {
            ensure!(
                new_name == old_name,
                MotError::ContentNameMismatch {
                    old: old_name,
                    new: new_name,
                }
            );
        } else {
            self.header_received = true;
        }

        self.file = file;

        Ok(())
    }
}

/// Best-effort time parameter; a malformed value does not reject the header.
fn read_time(id: u8, param: &[u8]) -> Option<MotTime> {
    match MotTime::from_bytes(param) {
        Ok(time) => {
            trace!("MOT time parameter {id:#04X}: {time}");
            Some(time)
        }
        Err(err) => {
            debug!("MOT: ignoring time parameter {id:#04X}: {err}");
            None
        }
    }
}
