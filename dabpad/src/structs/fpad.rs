//! Fixed PAD (F-PAD) fields.
//!
//! Every DAB audio frame ends with two F-PAD bytes (EN 300 401 clause 7.4.1):
//!
//! ```text
//! byte L-1: | F-PAD type (2) | X-PAD ind (2) | byte L ind (4) |
//! byte L:   | ............ | CI flag (bit 1) | .. |
//! ```

use std::fmt::Display;

/// Length of the F-PAD field in bytes.
pub const FPAD_LEN: usize = 2;

/// Presence and kind of the X-PAD field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XPadIndicator {
    NoData,
    Short,
    VariableSize,
    Reserved,
}

impl From<u8> for XPadIndicator {
    fn from(value: u8) -> Self {
        match value & 0b11 {
            0b00 => Self::NoData,
            0b01 => Self::Short,
            0b10 => Self::VariableSize,
            _ => Self::Reserved,
        }
    }
}

impl Display for XPadIndicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NoData => "no X-PAD",
            Self::Short => "short X-PAD",
            Self::VariableSize => "variable size X-PAD",
            Self::Reserved => "reserved",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FPad {
    /// Only type 0 is defined; other types carry no usable X-PAD framing.
    pub fpad_type: u8,
    pub xpad_indicator: XPadIndicator,
    pub byte_l_indicator: u8,
    /// Set when the X-PAD of this frame starts with contents indicators.
    pub ci_flag: bool,
}

impl FPad {
    pub fn is_type0(&self) -> bool {
        self.fpad_type == 0
    }
}

impl From<[u8; FPAD_LEN]> for FPad {
    fn from(value: [u8; FPAD_LEN]) -> Self {
        Self {
            fpad_type: value[0] >> 6,
            xpad_indicator: XPadIndicator::from(value[0] >> 4),
            byte_l_indicator: value[0] & 0x0F,
            ci_flag: value[1] & 0x02 != 0,
        }
    }
}

#[test]
fn fpad_fields() {
    let fpad = FPad::from([0b0010_0001, 0b0000_0010]);
    assert!(fpad.is_type0());
    assert_eq!(fpad.xpad_indicator, XPadIndicator::VariableSize);
    assert_eq!(fpad.byte_l_indicator, 1);
    assert!(fpad.ci_flag);

    let fpad = FPad::from([0b1101_0000, 0]);
    assert!(!fpad.is_type0());
    assert_eq!(fpad.xpad_indicator, XPadIndicator::Short);
    assert!(!fpad.ci_flag);
}
