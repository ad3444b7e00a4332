//! Data Group Length Indicator (EN 300 401 clause 7.4.5.1.2).
//!
//! Announces the length of the next MOT data group so that its start can be
//! recognized before the whole group has arrived.
//!
//! ```text
//! | rfa (2) | length (14) | CRC (16) |
//! ```

use log::debug;

use crate::process::data_group::{DataGroup, DataGroupKind, Decoded};

pub const DGLI_LEN: usize = 2;

#[derive(Debug, Default)]
pub struct DgliKind {
    length: usize,
}

impl DgliKind {
    /// Returns the last decoded length and clears it.
    pub fn take_length(&mut self) -> usize {
        std::mem::take(&mut self.length)
    }
}

impl DataGroupKind for DgliKind {
    type Output = usize;
    const MAX_SIZE: usize = DGLI_LEN + 2;

    fn initial_needed_size(&self) -> usize {
        DGLI_LEN + 2
    }

    fn decode(&mut self, dg: &mut DataGroup) -> Decoded<usize> {
        if !dg.check_crc(DGLI_LEN) {
            debug!("DGLI: CRC mismatch, discarding");
            return Decoded::Done(None);
        }

        let raw = dg.data();
        self.length = (((raw[0] & 0x3F) as usize) << 8) | raw[1] as usize;

        Decoded::Done(Some(self.length))
    }

    fn reset(&mut self) {
        self.length = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::data_group::DataGroupDecoder;
    use crate::utils::crc::CRC_CCITT;

    fn dgli(length: u16) -> Vec<u8> {
        let mut raw = length.to_be_bytes().to_vec();
        raw.extend(CRC_CCITT.checksum(&raw).to_be_bytes());
        raw
    }

    #[test]
    fn length_is_taken_once() {
        let mut decoder = DataGroupDecoder::new(DgliKind::default());
        let raw = dgli(0xC000 | 1234);

        assert_eq!(decoder.feed(true, &raw[..3]), None);
        assert_eq!(decoder.feed(false, &raw[3..]), Some(1234));

        assert_eq!(decoder.kind_mut().take_length(), 1234);
        assert_eq!(decoder.kind_mut().take_length(), 0);
    }

    #[test]
    fn bad_crc_leaves_length_unset() {
        let mut decoder = DataGroupDecoder::new(DgliKind::default());
        let mut raw = dgli(42);
        raw[3] ^= 0x80;

        assert_eq!(decoder.feed(true, &raw), None);
        assert_eq!(decoder.kind_mut().take_length(), 0);
    }
}
