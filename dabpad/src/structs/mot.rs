//! MOT (Multimedia Object Transfer) structures.
//!
//! A MOT object consists of a header and a body, each transported in one or
//! more segments (EN 301 234). The header starts with a 7-byte core:
//!
//! ```text
//! | body size (28) | header size (13) | content type (6) | content subtype (9) |
//! ```
//!
//! followed by a list of TLV-coded header extension parameters.

use std::fmt::Display;

use anyhow::{Result, bail};
use log::warn;

use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::charset::Charset;
use crate::utils::errors::MotError;

/// Length of the header core in bytes.
pub const MOT_HEADER_CORE_LEN: usize = 7;

/// MOT data group type carrying header segments.
pub const MOT_DG_TYPE_HEADER: u8 = 3;

/// MOT data group type carrying body segments.
pub const MOT_DG_TYPE_BODY: u8 = 4;

/// Full content type of a header update (MOT transport / header update).
pub const MOT_CONTENT_TYPE_HEADER_UPDATE: u16 = 0x0500;

pub const MOT_PARAM_EXPIRE_TIME: u8 = 0x04;
pub const MOT_PARAM_TRIGGER_TIME: u8 = 0x05;
pub const MOT_PARAM_CONTENT_NAME: u8 = 0x0C;
pub const MOT_PARAM_UNIQUE_BODY_VERSION: u8 = 0x0D;
pub const MOT_PARAM_CATEGORY_SLIDE_ID: u8 = 0x25;
pub const MOT_PARAM_CATEGORY_TITLE: u8 = 0x26;
pub const MOT_PARAM_CLICK_THROUGH_URL: u8 = 0x27;
pub const MOT_PARAM_ALT_LOCATION_URL: u8 = 0x28;
pub const MOT_PARAM_ALERT: u8 = 0x29;

/// MOT content main type (6 bits).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MotContentMainType {
    #[default]
    General,
    Text,
    Image,
    Audio,
    Video,
    MotTransport,
    System,
    Proprietary,
    Reserved(u8),
}

impl From<u8> for MotContentMainType {
    fn from(value: u8) -> Self {
        match value & 0x3F {
            0x00 => Self::General,
            0x01 => Self::Text,
            0x02 => Self::Image,
            0x03 => Self::Audio,
            0x04 => Self::Video,
            0x05 => Self::MotTransport,
            0x06 => Self::System,
            0x3F => Self::Proprietary,
            other => Self::Reserved(other),
        }
    }
}

impl Display for MotContentMainType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::General => write!(f, "general data"),
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
            Self::MotTransport => write!(f, "MOT transport"),
            Self::System => write!(f, "system"),
            Self::Proprietary => write!(f, "proprietary"),
            Self::Reserved(value) => write!(f, "reserved ({value:#04X})"),
        }
    }
}

/// UTC time parameter (EN 301 234 clause 6.2.4.1).
///
/// ```text
/// | validity (1) | MJD (17) | rfu (2) | UTC flag (1) | hours (5) | minutes (6) |
/// [ seconds (6) | milliseconds (10) ]   only with UTC flag set
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotTime {
    /// Cleared validity means "now" for a trigger time.
    pub valid: bool,
    pub mjd: u32,
    pub long_form: bool,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub milliseconds: u16,
}

impl MotTime {
    pub fn read(reader: &mut BsIoSliceReader) -> Result<Self> {
        let mut time = Self {
            valid: reader.get()?,
            mjd: reader.get_n(17)?,
            ..Default::default()
        };

        reader.skip_n(2)?;
        time.long_form = reader.get()?;
        time.hours = reader.get_n(5)?;
        time.minutes = reader.get_n(6)?;

        if time.long_form {
            time.seconds = reader.get_n(6)?;
            time.milliseconds = reader.get_n(10)?;
        }

        Ok(time)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read(&mut BsIoSliceReader::from_slice(bytes))
    }

    /// Calendar date of the MJD field as `(year, month, day)`.
    pub fn date(&self) -> (i32, u8, u8) {
        let mjd = self.mjd as f64;
        let y = ((mjd - 15078.2) / 365.25).floor();
        let m = ((mjd - 14956.1 - (y * 365.25).floor()) / 30.6001).floor();
        let day = mjd - 14956.0 - (y * 365.25).floor() - (m * 30.6001).floor();
        let k = if m == 14.0 || m == 15.0 { 1.0 } else { 0.0 };

        (
            (y + k) as i32 + 1900,
            (m - 1.0 - k * 12.0) as u8,
            day as u8,
        )
    }
}

impl Display for MotTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.valid {
            return write!(f, "now");
        }

        let (year, month, day) = self.date();
        write!(
            f,
            "{year:04}-{month:02}-{day:02} {:02}:{:02}:{:02}.{:03} UTC",
            self.hours, self.minutes, self.seconds, self.milliseconds
        )
    }
}

/// The 7-byte MOT header core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotHeaderCore {
    pub body_size: usize,
    pub header_size: usize,
    pub content_type: u8,
    pub content_subtype: u8,
}

impl MotHeaderCore {
    pub fn read(reader: &mut BsIoSliceReader) -> Result<Self> {
        if reader.available()? < (MOT_HEADER_CORE_LEN as u64) << 3 {
            bail!(MotError::HeaderTooShort((reader.available()? >> 3) as usize));
        }

        let body_size = reader.get_n::<u32>(28)? as usize;
        let header_size = reader.get_n::<u16>(13)? as usize;
        let content_type = reader.get_n::<u8>(6)?;
        let subtype = reader.get_n::<u16>(9)?;

        if subtype > 0xFF {
            warn!("MOT content subtype {subtype:#05X} uses its 9th bit, truncating to 8 bits");
        }

        Ok(Self {
            body_size,
            header_size,
            content_type,
            content_subtype: subtype as u8,
        })
    }

    /// Content type and subtype packed as `type << 8 | subtype`.
    pub fn full_content_type(&self) -> u16 {
        ((self.content_type as u16) << 8) | self.content_subtype as u16
    }
}

/// A completely received MOT object with the header parameters relevant to
/// slideshow applications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MotFile {
    pub body: Vec<u8>,
    /// Declared in the header core.
    pub body_size: usize,

    pub content_main_type: MotContentMainType,
    pub content_type: u16,

    pub content_name: String,
    pub content_name_charset: Charset,
    pub click_through_url: String,
    pub alt_location_url: String,

    pub trigger_now: bool,
    pub trigger_time: Option<MotTime>,
    pub expire_time: Option<MotTime>,

    pub category: Option<u8>,
    pub slide_id: Option<u8>,
    pub category_title: String,

    pub unique_body_version: Option<u32>,
}

impl MotFile {
    /// File name extension matching the content type.
    pub fn file_extension(&self) -> &'static str {
        match self.content_type {
            0x0100 | 0x0101 => "txt",
            0x0102 => "html",
            0x0200 => "gif",
            0x0201 => "jpg",
            0x0202 => "bmp",
            0x0203 => "png",
            _ => "bin",
        }
    }

    pub fn is_image(&self) -> bool {
        self.content_main_type == MotContentMainType::Image
    }
}

impl Display for MotFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}, {:#06X}, {} bytes)",
            self.content_name,
            self.content_main_type,
            self.content_type,
            self.body.len()
        )
    }
}
