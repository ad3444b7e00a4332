//! Character set conversion for DAB text fields.
//!
//! DAB labels and MOT content names carry a 4-bit character set indicator
//! (ETSI TS 101 756 table 1). Only three sets occur in practice:
//!
//! - **0b0000**: Complete EBU Latin based repertoire (TS 101 756 Annex C)
//! - **0b0110**: ISO/IEC 10646 using UCS-2 (big-endian)
//! - **0b1111**: ISO/IEC 10646 using UTF-8

use std::fmt::Display;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Charset {
    #[default]
    EbuLatin,
    Ucs2,
    Utf8,
    Other(u8),
}

impl From<u8> for Charset {
    fn from(value: u8) -> Self {
        match value & 0x0F {
            0x0 => Self::EbuLatin,
            0x6 => Self::Ucs2,
            0xF => Self::Utf8,
            other => Self::Other(other),
        }
    }
}

impl From<Charset> for u8 {
    fn from(value: Charset) -> Self {
        match value {
            Charset::EbuLatin => 0x0,
            Charset::Ucs2 => 0x6,
            Charset::Utf8 => 0xF,
            Charset::Other(other) => other,
        }
    }
}

impl Display for Charset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EbuLatin => write!(f, "EBU Latin"),
            Self::Ucs2 => write!(f, "UCS-2"),
            Self::Utf8 => write!(f, "UTF-8"),
            Self::Other(value) => write!(f, "unknown ({value:#X})"),
        }
    }
}

// 0x00..=0x1F
const EBU_LATIN_LOW: [u16; 32] = [
    0x0000, 0x0118, 0x012E, 0x0172, 0x0102, 0x0116, 0x010E, 0x0218, //
    0x021A, 0x010A, 0x000A, 0x000B, 0x0120, 0x0139, 0x017B, 0x0143, //
    0x0105, 0x0119, 0x012F, 0x0173, 0x0103, 0x0117, 0x010F, 0x0219, //
    0x021B, 0x010B, 0x0147, 0x011A, 0x0121, 0x013A, 0x017C, 0x0082, //
];

// 0x80..=0xFF
const EBU_LATIN_HIGH: [u16; 128] = [
    0x00E1, 0x00E0, 0x00E9, 0x00E8, 0x00ED, 0x00EC, 0x00F3, 0x00F2, //
    0x00FA, 0x00F9, 0x00D1, 0x00C7, 0x015E, 0x00DF, 0x00A1, 0x0178, //
    0x00E2, 0x00E4, 0x00EA, 0x00EB, 0x00EE, 0x00EF, 0x00F4, 0x00F6, //
    0x00FB, 0x00FC, 0x00F1, 0x00E7, 0x015F, 0x011F, 0x0131, 0x01FF, //
    0x00AA, 0x03B1, 0x00A9, 0x2030, 0x011E, 0x011B, 0x0148, 0x0151, //
    0x03C0, 0x20AC, 0x00A3, 0x0024, 0x2190, 0x2191, 0x2192, 0x2193, //
    0x00BA, 0x00B9, 0x00B2, 0x00B3, 0x00B1, 0x0130, 0x0144, 0x0171, //
    0x00B5, 0x00BF, 0x00F7, 0x00B0, 0x00BC, 0x00BD, 0x00BE, 0x00A7, //
    0x00C1, 0x00C0, 0x00C9, 0x00C8, 0x00CD, 0x00CC, 0x00D3, 0x00D2, //
    0x00DA, 0x00D9, 0x0158, 0x010C, 0x0160, 0x017D, 0x00D0, 0x013F, //
    0x00C2, 0x00C4, 0x00CA, 0x00CB, 0x00CE, 0x00CF, 0x00D4, 0x00D6, //
    0x00DB, 0x00DC, 0x0159, 0x010D, 0x0161, 0x017E, 0x0111, 0x0140, //
    0x00C3, 0x00C5, 0x00C6, 0x0152, 0x0177, 0x00DD, 0x00D5, 0x00D8, //
    0x00DE, 0x014A, 0x0154, 0x0106, 0x015A, 0x0179, 0x0166, 0x00F0, //
    0x00E3, 0x00E5, 0x00E6, 0x0153, 0x0175, 0x00FD, 0x00F5, 0x00F8, //
    0x00FE, 0x014B, 0x0155, 0x0107, 0x015B, 0x017A, 0x0167, 0x00FF, //
];

fn ebu_latin_code_point(byte: u8) -> u16 {
    match byte {
        0x00..=0x1F => EBU_LATIN_LOW[byte as usize],
        0x24 => 0x0142,
        0x5C => 0x016E,
        0x5E => 0x0141,
        0x60 => 0x0104,
        0x7B => 0x00AB,
        0x7C => 0x016F,
        0x7D => 0x00BB,
        0x7E => 0x013D,
        0x7F => 0x0126,
        0x20..=0x7F => byte as u16,
        0x80..=0xFF => EBU_LATIN_HIGH[(byte - 0x80) as usize],
    }
}

fn ebu_latin_to_utf8(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            char::from_u32(ebu_latin_code_point(b) as u32).unwrap_or(char::REPLACEMENT_CHARACTER)
        })
        .collect()
}

fn ucs2_to_utf8(bytes: &[u8]) -> String {
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));

    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Converts raw DAB text in the given character set to a UTF-8 string.
///
/// Unknown character sets are decoded as EBU Latin, the DAB default.
pub fn to_utf8(bytes: &[u8], charset: Charset) -> String {
    match charset {
        Charset::EbuLatin => ebu_latin_to_utf8(bytes),
        Charset::Ucs2 => ucs2_to_utf8(bytes),
        Charset::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        Charset::Other(value) => {
            log::debug!("Unsupported charset {value:#X}, decoding as EBU Latin");
            ebu_latin_to_utf8(bytes)
        }
    }
}
