//! X-PAD contents indicators and application types.
//!
//! A contents indicator (CI) announces the length and application type of
//! the data subfield that follows it (EN 300 401 clause 7.4.2). Short X-PAD
//! uses a single CI byte with a fixed subfield length of 3 bytes; variable
//! size X-PAD uses up to four CI bytes `(length class << 5) | app type`.

use std::fmt::Display;

/// Longest possible X-PAD field in bytes.
pub const XPAD_MAX_LEN: usize = 196;

/// Maximum number of contents indicators in a variable size X-PAD.
pub const XPAD_MAX_CIS: usize = 4;

/// Subfield length of short X-PAD.
pub const XPAD_SHORT_LEN: usize = 3;

/// Subfield length per 3-bit length class.
pub const XPAD_CI_LEN_LOOKUP: [usize; 8] = [4, 6, 8, 12, 16, 24, 32, 48];

/// X-PAD application type (5 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppType {
    EndMarker,
    DataGroupLengthIndicator,
    DynamicLabelStart,
    DynamicLabelContinuation,
    MotStart,
    MotContinuation,
    MotCaStart,
    MotCaContinuation,
    UserDefined(u8),
    Unused,
}

impl From<u8> for AppType {
    fn from(value: u8) -> Self {
        match value & 0x1F {
            0 => Self::EndMarker,
            1 => Self::DataGroupLengthIndicator,
            2 => Self::DynamicLabelStart,
            3 => Self::DynamicLabelContinuation,
            12 => Self::MotStart,
            13 => Self::MotContinuation,
            14 => Self::MotCaStart,
            15 => Self::MotCaContinuation,
            31 => Self::Unused,
            other => Self::UserDefined(other),
        }
    }
}

impl From<AppType> for u8 {
    fn from(value: AppType) -> Self {
        match value {
            AppType::EndMarker => 0,
            AppType::DataGroupLengthIndicator => 1,
            AppType::DynamicLabelStart => 2,
            AppType::DynamicLabelContinuation => 3,
            AppType::MotStart => 12,
            AppType::MotContinuation => 13,
            AppType::MotCaStart => 14,
            AppType::MotCaContinuation => 15,
            AppType::UserDefined(other) => other,
            AppType::Unused => 31,
        }
    }
}

impl Display for AppType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EndMarker => write!(f, "end marker"),
            Self::DataGroupLengthIndicator => write!(f, "DGLI"),
            Self::DynamicLabelStart => write!(f, "DL start"),
            Self::DynamicLabelContinuation => write!(f, "DL continuation"),
            Self::MotStart => write!(f, "MOT start"),
            Self::MotContinuation => write!(f, "MOT continuation"),
            Self::MotCaStart => write!(f, "MOT CA start"),
            Self::MotCaContinuation => write!(f, "MOT CA continuation"),
            Self::UserDefined(value) => write!(f, "user defined ({value})"),
            Self::Unused => write!(f, "not used"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentsIndicator {
    pub len: usize,
    pub app_type: u8,
}

impl ContentsIndicator {
    /// Decodes a variable size X-PAD CI byte.
    pub fn from_byte(byte: u8) -> Self {
        Self {
            len: XPAD_CI_LEN_LOOKUP[(byte >> 5) as usize],
            app_type: byte & 0x1F,
        }
    }

    /// Short X-PAD CI: type only, fixed length.
    pub fn short(app_type: u8) -> Self {
        Self {
            len: XPAD_SHORT_LEN,
            app_type: app_type & 0x1F,
        }
    }

    pub fn kind(&self) -> AppType {
        AppType::from(self.app_type)
    }
}

#[test]
fn ci_byte_layout() {
    let ci = ContentsIndicator::from_byte(0b011_00010);
    assert_eq!(ci.len, 12);
    assert_eq!(ci.kind(), AppType::DynamicLabelStart);

    let ci = ContentsIndicator::from_byte(0b111_01100);
    assert_eq!(ci.len, 48);
    assert_eq!(ci.kind(), AppType::MotStart);

    assert_eq!(ContentsIndicator::short(0x21).app_type, 1);
    assert_eq!(AppType::from(7), AppType::UserDefined(7));
    assert_eq!(u8::from(AppType::MotCaContinuation), 15);
}
