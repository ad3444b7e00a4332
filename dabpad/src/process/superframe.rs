//! DAB+ superframe filter (TS 102 563).
//!
//! Collects five audio frames of a DAB+ sub-channel into a superframe,
//! corrects it with the interleaved RS(120, 110) code, synchronizes on the
//! fire code and splits it into access units. Access units starting with a
//! data stream element carry the PAD of the programme.

use log::{debug, trace};

use crate::log_or_err;
use crate::process::fec::{DAB_PLUS_CODEWORD_LEN, ReedSolomon};
use crate::structs::audio_format::{AudioServiceFormat, SuperframeFormat};
use crate::structs::fpad::FPAD_LEN;
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::crc::{CRC_CCITT, CRC_FIRE_CODE};
use crate::utils::errors::SuperframeError;

/// Audio frames per superframe.
pub const FRAMES_PER_SUPERFRAME: usize = 5;

const FIRE_CODE_LEN: usize = 2;
/// Bytes covered by the fire code, following it.
const FIRE_CODE_COVERAGE: usize = 9;
const AU_CRC_LEN: usize = 2;
/// `id_syn_ele` of a data stream element.
const SYN_ELE_DSE: u8 = 4;
const RS_DATA_LEN: usize = 110;

/// Results of processing one superframe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuperframeEvent {
    FormatChanged(AudioServiceFormat),
    /// RS codewords corrected and left uncorrectable in one superframe.
    FecInfo { corrected: usize, uncorrectable: usize },
    /// Audio is unusable for a while (sync loss or a failing access unit).
    AudioError(String),
    /// PAD of one access unit: X-PAD in transmission order and the F-PAD.
    Pad { xpad: Vec<u8>, fpad: [u8; FPAD_LEN] },
}

/// Turns a DAB+ sub-channel byte stream, frame by frame, into events.
#[derive(Debug)]
pub struct SuperframeFilter {
    pub fail_level: log::Level,

    bitrate_kbps: usize,
    frame_len: usize,
    rs: ReedSolomon,

    buffer: Vec<u8>,
    synced: bool,
    format: Option<SuperframeFormat>,
}

impl SuperframeFilter {
    pub fn new(bitrate_kbps: usize) -> Result<Self, SuperframeError> {
        if bitrate_kbps == 0 || bitrate_kbps % 8 != 0 {
            return Err(SuperframeError::InvalidBitrate(bitrate_kbps));
        }

        let rs = ReedSolomon::dab_plus().map_err(|err| SuperframeError::CodecSetup(err.to_string()))?;

        Ok(Self {
            fail_level: log::Level::Error,
            bitrate_kbps,
            frame_len: bitrate_kbps * 3,
            rs,
            buffer: Vec::with_capacity(bitrate_kbps * 3 * FRAMES_PER_SUPERFRAME),
            synced: false,
            format: None,
        })
    }

    /// Sets the failure level for validation errors.
    ///
    /// - `log::Level::Error`: Only fail on Error level messages (default)
    /// - `log::Level::Warn`: Fail on Warning level and above (strict mode)
    pub fn set_fail_level(&mut self, level: log::Level) {
        self.fail_level = level;
    }

    pub fn bitrate_kbps(&self) -> usize {
        self.bitrate_kbps
    }

    /// Length of one audio frame (24 ms) in bytes.
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    pub fn superframe_len(&self) -> usize {
        self.frame_len * FRAMES_PER_SUPERFRAME
    }

    /// Number of interleaved RS codewords per superframe.
    pub fn rs_count(&self) -> usize {
        self.superframe_len() / DAB_PLUS_CODEWORD_LEN
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn format(&self) -> Option<AudioServiceFormat> {
        self.format
            .as_ref()
            .map(|format| AudioServiceFormat::new(format, self.bitrate_kbps))
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.synced = false;
        self.format = None;
    }

    /// Feeds one audio frame of `frame_len()` bytes.
    pub fn feed(&mut self, frame: &[u8]) -> Result<Vec<SuperframeEvent>, SuperframeError> {
        let mut events = Vec::new();

        if frame.len() != self.frame_len {
            log_or_err!(
                self,
                log::Level::Error,
                SuperframeError::FrameLength {
                    found: frame.len(),
                    expected: self.frame_len,
                }
            );
            return Ok(events);
        }

        self.buffer.extend_from_slice(frame);
        if self.buffer.len() < self.superframe_len() {
            return Ok(events);
        }

        let mut sf = self.buffer.clone();
        let (corrected, uncorrectable) = self.correct(&mut sf);

        if !Self::check_fire_code(&sf) {
            trace!("Superframe: no sync, shifting by one frame");
            self.buffer.drain(..self.frame_len);

            if self.synced {
                debug!("Superframe: sync lost");
                self.synced = false;
                events.push(SuperframeEvent::AudioError("superframe sync lost".to_string()));
            }
            return Ok(events);
        }

        self.buffer.clear();
        if !self.synced {
            debug!("Superframe: synced");
            self.synced = true;
        }

        events.push(SuperframeEvent::FecInfo {
            corrected,
            uncorrectable,
        });
        if uncorrectable > 0 {
            log_or_err!(self, log::Level::Debug, SuperframeError::Uncorrectable);
        }

        let format = SuperframeFormat::from(sf[FIRE_CODE_LEN]);
        if self.format != Some(format) {
            self.format = Some(format);
            let service = AudioServiceFormat::new(&format, self.bitrate_kbps);
            debug!("Superframe: format {service}");
            events.push(SuperframeEvent::FormatChanged(service));
        }

        let starts = match Self::au_starts(&sf, &format, self.rs_count() * RS_DATA_LEN) {
            Ok(starts) => starts,
            Err(err) => {
                log_or_err!(self, log::Level::Warn, err);
                events.push(SuperframeEvent::AudioError("invalid AU start table".to_string()));
                return Ok(events);
            }
        };

        for (index, bounds) in starts.windows(2).enumerate() {
            let au = &sf[bounds[0]..bounds[1]];

            if au.len() <= AU_CRC_LEN {
                log_or_err!(
                    self,
                    log::Level::Warn,
                    SuperframeError::AuTooShort {
                        index,
                        len: au.len()
                    }
                );
                events.push(SuperframeEvent::AudioError(format!("AU #{index} too short")));
                continue;
            }

            let (payload, crc) = au.split_at(au.len() - AU_CRC_LEN);
            if !CRC_CCITT.verify(payload, [crc[0], crc[1]]) {
                log_or_err!(self, log::Level::Warn, SuperframeError::AuCrc { index });
                events.push(SuperframeEvent::AudioError(format!("AU #{index} CRC mismatch")));
                continue;
            }

            events.extend(Self::extract_pad(payload));
        }

        Ok(events)
    }

    /// De-interleaves and corrects every RS codeword of `sf` in place.
    fn correct(&mut self, sf: &mut [u8]) -> (usize, usize) {
        let rs_count = self.rs_count();
        let mut codeword = [0u8; DAB_PLUS_CODEWORD_LEN];
        let mut corrected = 0;
        let mut uncorrectable = 0;

        for i in 0..rs_count {
            for (j, symbol) in codeword.iter_mut().enumerate() {
                *symbol = sf[j * rs_count + i];
            }

            match self.rs.decode(&mut codeword, &[]) {
                Ok(0) => continue,
                Ok(count) => corrected += count,
                Err(err) => {
                    trace!("Superframe: RS codeword #{i}: {err}");
                    uncorrectable += 1;
                    continue;
                }
            }

            for (j, symbol) in codeword.iter().enumerate() {
                sf[j * rs_count + i] = *symbol;
            }
        }

        (corrected, uncorrectable)
    }

    fn check_fire_code(sf: &[u8]) -> bool {
        // all-zero input passes the CRC
        if sf[3] == 0x00 && sf[4] == 0x00 {
            return false;
        }

        let covered = &sf[FIRE_CODE_LEN..FIRE_CODE_LEN + FIRE_CODE_COVERAGE];
        CRC_FIRE_CODE.verify(covered, [sf[0], sf[1]])
    }

    /// Reads the AU start table and appends the end of the audio data.
    fn au_starts(
        sf: &[u8],
        format: &SuperframeFormat,
        data_len: usize,
    ) -> Result<Vec<usize>, SuperframeError> {
        let num_aus = format.num_aus();
        let mut starts = Vec::with_capacity(num_aus + 1);
        starts.push(format.first_au_start());

        let reader = &mut BsIoSliceReader::from_slice(&sf[FIRE_CODE_LEN + 1..]);
        for _ in 1..num_aus {
            let start = reader
                .get_n::<u16>(12)
                .map_err(|_| SuperframeError::InvalidAuStart(starts.clone()))?;
            starts.push(start as usize);
        }
        starts.push(data_len);

        if starts.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(SuperframeError::InvalidAuStart(starts));
        }

        Ok(starts)
    }

    /// PAD carried in a leading data stream element.
    fn extract_pad(au: &[u8]) -> Option<SuperframeEvent> {
        if au[0] >> 5 != SYN_ELE_DSE {
            return None;
        }

        let mut pad_start = 2;
        let mut pad_len = *au.get(1)? as usize;
        if pad_len == 255 {
            pad_len += *au.get(2)? as usize;
            pad_start += 1;
        }

        if pad_len < FPAD_LEN {
            return None;
        }

        let pad = au.get(pad_start..pad_start + pad_len)?;
        let (xpad, fpad) = pad.split_at(pad_len - FPAD_LEN);

        Some(SuperframeEvent::Pad {
            xpad: xpad.to_vec(),
            fpad: [fpad[0], fpad[1]],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::dynamic_label::tests::segment;
    use crate::process::pad::{PadDecoder, PadEvent};

    const BITRATE: usize = 8;
    /// Second AU start in the test superframes.
    const SPLIT: usize = 40;

    fn au(mut payload: Vec<u8>, len: usize) -> Vec<u8> {
        payload.resize(len - AU_CRC_LEN, 0);
        payload.extend(CRC_CCITT.checksum(&payload).to_be_bytes());
        payload
    }

    /// Reversed X-PAD carrying the label "Hello" with a variable size F-PAD.
    fn hello_pad() -> (Vec<u8>, [u8; 2]) {
        let mut logical = vec![0x62, 0x00];
        logical.extend(segment(false, 0, true, 0, b"Hello"));
        logical.resize(14, 0);
        (logical.into_iter().rev().collect(), [0x20, 0x02])
    }

    /// HE-AAC superframe at 8 kbit/s: two AUs, the first with a DSE.
    fn superframe(bad_au_crc: bool) -> anyhow::Result<Vec<u8>> {
        let (xpad, fpad) = hello_pad();

        let mut dse = vec![SYN_ELE_DSE << 5, (xpad.len() + FPAD_LEN) as u8];
        dse.extend(&xpad);
        dse.extend(fpad);

        let mut sf = vec![0; RS_DATA_LEN];
        sf[2] = 0x20;
        sf[3] = (SPLIT >> 4) as u8;
        sf[4] = ((SPLIT & 0x0F) << 4) as u8;
        sf[5..SPLIT].copy_from_slice(&au(dse, SPLIT - 5));
        sf[SPLIT..].copy_from_slice(&au(vec![0x21, 0x10, 0x05], RS_DATA_LEN - SPLIT));
        if bad_au_crc {
            sf[RS_DATA_LEN - 1] ^= 0xFF;
        }

        let fire_code = CRC_FIRE_CODE.checksum(&sf[2..11]);
        sf[..2].copy_from_slice(&fire_code.to_be_bytes());

        let parity = ReedSolomon::dab_plus()?.encode(&sf)?;
        sf.extend(parity);
        Ok(sf)
    }

    fn feed_all(filter: &mut SuperframeFilter, bytes: &[u8]) -> anyhow::Result<Vec<SuperframeEvent>> {
        let mut events = Vec::new();
        for frame in bytes.chunks(filter.frame_len()) {
            events.extend(filter.feed(frame)?);
        }
        Ok(events)
    }

    #[test]
    fn rejects_invalid_bitrates() {
        assert_eq!(
            SuperframeFilter::new(0).err(),
            Some(SuperframeError::InvalidBitrate(0))
        );
        assert_eq!(
            SuperframeFilter::new(12).err(),
            Some(SuperframeError::InvalidBitrate(12))
        );
    }

    #[test]
    fn geometry() -> anyhow::Result<()> {
        let filter = SuperframeFilter::new(72)?;
        assert_eq!(filter.frame_len(), 216);
        assert_eq!(filter.superframe_len(), 1080);
        assert_eq!(filter.rs_count(), 9);

        Ok(())
    }

    #[test]
    fn synthetic_superframe() -> anyhow::Result<()> {
        let mut filter = SuperframeFilter::new(BITRATE)?;
        let events = feed_all(&mut filter, &superframe(false)?)?;

        let (xpad, fpad) = hello_pad();
        assert_eq!(
            events,
            [
                SuperframeEvent::FecInfo {
                    corrected: 0,
                    uncorrectable: 0
                },
                SuperframeEvent::FormatChanged(AudioServiceFormat {
                    codec: "HE-AAC",
                    sample_rate_khz: 32,
                    mode: "Mono",
                    bitrate_kbps: 8,
                }),
                SuperframeEvent::Pad { xpad, fpad },
            ]
        );
        assert!(filter.is_synced());

        // the same format is not announced twice
        let events = feed_all(&mut filter, &superframe(false)?)?;
        assert_eq!(events.len(), 2);

        Ok(())
    }

    #[test]
    fn pad_reaches_the_label_decoder() -> anyhow::Result<()> {
        let mut filter = SuperframeFilter::new(BITRATE)?;
        let mut pad = PadDecoder::default();

        let mut labels = Vec::new();
        for event in feed_all(&mut filter, &superframe(false)?)? {
            if let SuperframeEvent::Pad { xpad, fpad } = event {
                labels.extend(pad.process(&xpad, true, fpad));
            }
        }

        assert!(matches!(&labels[..], [PadEvent::LabelChanged(label)] if label.text == "Hello"));

        Ok(())
    }

    #[test]
    fn byte_errors_are_repaired() -> anyhow::Result<()> {
        let mut filter = SuperframeFilter::new(BITRATE)?;
        let mut sf = superframe(false)?;
        for pos in [0, 7, 58, 115] {
            sf[pos] ^= 0x5A;
        }

        let events = feed_all(&mut filter, &sf)?;
        assert_eq!(
            events[0],
            SuperframeEvent::FecInfo {
                corrected: 4,
                uncorrectable: 0
            }
        );
        assert!(matches!(events.last(), Some(SuperframeEvent::Pad { .. })));

        Ok(())
    }

    #[test]
    fn sync_is_searched_frame_by_frame() -> anyhow::Result<()> {
        let mut filter = SuperframeFilter::new(BITRATE)?;

        let mut stream = vec![0; filter.frame_len()];
        stream.extend(superframe(false)?);
        let events = feed_all(&mut filter, &stream)?;

        assert!(filter.is_synced());
        assert!(!events.iter().any(|e| matches!(e, SuperframeEvent::AudioError(_))));
        assert!(matches!(events.last(), Some(SuperframeEvent::Pad { .. })));

        Ok(())
    }

    #[test]
    fn sync_loss_is_reported() -> anyhow::Result<()> {
        let mut filter = SuperframeFilter::new(BITRATE)?;
        feed_all(&mut filter, &superframe(false)?)?;

        // all zeros is a valid codeword with a matching fire code
        let silence = vec![0; filter.superframe_len()];
        let events = feed_all(&mut filter, &silence)?;

        assert_eq!(
            events,
            [SuperframeEvent::AudioError("superframe sync lost".to_string())]
        );
        assert!(!filter.is_synced());

        Ok(())
    }

    #[test]
    fn au_crc_failure() -> anyhow::Result<()> {
        let sf = superframe(true)?;

        let mut filter = SuperframeFilter::new(BITRATE)?;
        let events = feed_all(&mut filter, &sf)?;
        assert!(events.contains(&SuperframeEvent::AudioError("AU #1 CRC mismatch".to_string())));
        assert!(events.iter().any(|e| matches!(e, SuperframeEvent::Pad { .. })));

        let mut strict = SuperframeFilter::new(BITRATE)?;
        strict.set_fail_level(log::Level::Warn);
        let err = feed_all(&mut strict, &sf).unwrap_err();
        assert_eq!(
            err.downcast::<SuperframeError>()?,
            SuperframeError::AuCrc { index: 1 }
        );

        Ok(())
    }

    #[test]
    fn wrong_frame_length_is_an_error() -> anyhow::Result<()> {
        let mut filter = SuperframeFilter::new(BITRATE)?;
        assert_eq!(
            filter.feed(&[0; 23]),
            Err(SuperframeError::FrameLength {
                found: 23,
                expected: 24
            })
        );

        Ok(())
    }

    #[test]
    fn au_start_table() {
        let format = SuperframeFormat::from(0x00);
        let mut sf = vec![0; 120];
        // AAC-LC 32 kHz: four AUs, three 12-bit starts from byte 3
        sf[3..8].copy_from_slice(&[0x01, 0x40, 0x1E, 0x02, 0x80]);

        assert_eq!(
            SuperframeFilter::au_starts(&sf, &format, 110),
            Ok(vec![8, 20, 30, 40, 110])
        );

        sf[3] = 0x10;
        assert!(matches!(
            SuperframeFilter::au_starts(&sf, &format, 110),
            Err(SuperframeError::InvalidAuStart(_))
        ));
    }

    #[test]
    fn dse_with_escaped_length() {
        let mut au = vec![SYN_ELE_DSE << 5, 255, 3];
        au.extend(vec![0xAA; 256]);
        au.extend([0x20, 0x02]);

        let Some(SuperframeEvent::Pad { xpad, fpad }) = SuperframeFilter::extract_pad(&au) else {
            panic!("expected PAD");
        };
        assert_eq!(xpad.len(), 256);
        assert_eq!(fpad, [0x20, 0x02]);

        // other syntax elements carry no PAD
        assert_eq!(SuperframeFilter::extract_pad(&[0x21, 0x00, 0x00]), None);
    }
}
