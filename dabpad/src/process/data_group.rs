//! Data group accumulation.
//!
//! X-PAD applications deliver their data groups in subfields spread over
//! several audio frames. A [`DataGroupDecoder`] collects those subfields into
//! a bounded [`DataGroup`] buffer until a "needed size" threshold is met, then
//! hands the buffer to its [`DataGroupKind`] for decoding. The kind may raise
//! the threshold once it has read a length field, in which case accumulation
//! simply continues.

use log::trace;

use crate::utils::crc::CRC_CCITT;

/// Result of a decode attempt on a data group that met its threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<T> {
    /// The threshold was raised; keep accumulating.
    NeedMore,
    /// The group is finished (successfully or not) and the buffer is reset.
    Done(Option<T>),
}

/// Bounded accumulation buffer for one data group.
#[derive(Debug, Clone)]
pub struct DataGroup {
    raw: Vec<u8>,
    capacity: usize,
    needed: usize,
}

impl DataGroup {
    pub fn new(capacity: usize, needed: usize) -> Self {
        Self {
            raw: Vec::with_capacity(capacity),
            capacity,
            needed,
        }
    }

    pub fn reset(&mut self, needed: usize) {
        self.raw.clear();
        self.needed = needed;
    }

    pub fn data(&self) -> &[u8] {
        &self.raw
    }

    pub fn size(&self) -> usize {
        self.raw.len()
    }

    pub fn needed(&self) -> usize {
        self.needed
    }

    pub fn is_full(&self) -> bool {
        self.raw.len() >= self.capacity
    }

    /// Revises the threshold and reports whether it is already met.
    pub fn ensure_size(&mut self, needed: usize) -> bool {
        self.needed = needed;
        self.raw.len() >= needed
    }

    /// Checks the big-endian CRC-16-CCITT stored right after `raw[..len]`.
    pub fn check_crc(&self, len: usize) -> bool {
        let Some(stored) = self.raw.get(len..len + 2) else {
            return false;
        };

        CRC_CCITT.verify(&self.raw[..len], [stored[0], stored[1]])
    }

    /// Appends as much of `bytes` as fits and returns the number of bytes taken.
    pub fn append(&mut self, bytes: &[u8]) -> usize {
        let take = bytes.len().min(self.capacity - self.raw.len());
        self.raw.extend_from_slice(&bytes[..take]);
        take
    }
}

/// An X-PAD application that decodes accumulated data groups.
pub trait DataGroupKind {
    type Output;

    /// Buffer capacity in bytes.
    const MAX_SIZE: usize;

    /// Threshold restored on every reset.
    fn initial_needed_size(&self) -> usize;

    /// Called once each time the accumulated size meets the threshold.
    fn decode(&mut self, dg: &mut DataGroup) -> Decoded<Self::Output>;

    /// Clears kind-specific state beyond the buffer.
    fn reset(&mut self) {}
}

/// Accumulates X-PAD subfields for one application and decodes them.
#[derive(Debug)]
pub struct DataGroupDecoder<K: DataGroupKind> {
    dg: DataGroup,
    kind: K,
}

impl<K: DataGroupKind> DataGroupDecoder<K> {
    pub fn new(kind: K) -> Self {
        let needed = kind.initial_needed_size();

        Self {
            dg: DataGroup::new(K::MAX_SIZE, needed),
            kind,
        }
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut K {
        &mut self.kind
    }

    #[cfg(test)]
    pub fn data_group(&self) -> &DataGroup {
        &self.dg
    }

    /// Discards the buffer and the kind's own state.
    pub fn reset(&mut self) {
        self.kind.reset();
        self.reset_buffer();
    }

    fn reset_buffer(&mut self) {
        let needed = self.kind.initial_needed_size();
        self.dg.reset(needed);
    }

    /// Feeds one X-PAD subfield.
    ///
    /// `start` marks the first subfield of a new data group. Returns the
    /// kind's output when a data group completes.
    pub fn feed(&mut self, start: bool, bytes: &[u8]) -> Option<K::Output> {
        if start {
            self.reset_buffer();
        } else if self.dg.size() == 0 {
            return None;
        }

        if self.dg.size() >= self.dg.needed() || self.dg.is_full() {
            return None;
        }

        let taken = self.dg.append(bytes);
        if taken < bytes.len() {
            trace!(
                "Data group full at {} bytes, dropping {} bytes",
                self.dg.size(),
                bytes.len() - taken
            );
        }

        if self.dg.size() < self.dg.needed() {
            return None;
        }

        match self.kind.decode(&mut self.dg) {
            Decoded::NeedMore => None,
            Decoded::Done(output) => {
                self.reset_buffer();
                output
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Length-prefixed group: byte 0 is the payload length, CRC follows.
    #[derive(Debug, Default)]
    struct Prefixed {
        decodes: usize,
    }

    impl DataGroupKind for Prefixed {
        type Output = Vec<u8>;
        const MAX_SIZE: usize = 16;

        fn initial_needed_size(&self) -> usize {
            1
        }

        fn decode(&mut self, dg: &mut DataGroup) -> Decoded<Vec<u8>> {
            self.decodes += 1;

            let len = 1 + dg.data()[0] as usize;
            if !dg.ensure_size(len + 2) {
                return Decoded::NeedMore;
            }

            if !dg.check_crc(len) {
                return Decoded::Done(None);
            }

            Decoded::Done(Some(dg.data()[1..len].to_vec()))
        }
    }

    fn group(payload: &[u8]) -> Vec<u8> {
        let mut raw = vec![payload.len() as u8];
        raw.extend_from_slice(payload);
        raw.extend(CRC_CCITT.checksum(&raw).to_be_bytes());
        raw
    }

    #[test]
    fn threshold_is_revised_by_kind() {
        let mut decoder = DataGroupDecoder::new(Prefixed::default());
        let raw = group(b"abcd");

        assert_eq!(decoder.feed(true, &raw[..3]), None);
        assert_eq!(decoder.kind().decodes, 1);
        assert_eq!(decoder.data_group().needed(), 7);

        assert_eq!(decoder.feed(false, &raw[3..6]), None);
        assert_eq!(decoder.kind().decodes, 1);

        assert_eq!(decoder.feed(false, &raw[6..]), Some(b"abcd".to_vec()));
        assert_eq!(decoder.kind().decodes, 2);
        assert_eq!(decoder.data_group().size(), 0);
    }

    #[test]
    fn continuation_without_start_is_ignored() {
        let mut decoder = DataGroupDecoder::new(Prefixed::default());

        assert_eq!(decoder.feed(false, &group(b"x")), None);
        assert_eq!(decoder.kind().decodes, 0);
        assert_eq!(decoder.data_group().size(), 0);
    }

    #[test]
    fn overflow_is_dropped() {
        let mut decoder = DataGroupDecoder::new(Prefixed::default());
        let mut raw = vec![30];
        raw.extend([0u8; 20]);

        assert_eq!(decoder.feed(true, &raw), None);
        assert_eq!(decoder.data_group().size(), Prefixed::MAX_SIZE);

        // full and below threshold: further input is a no-op
        assert_eq!(decoder.feed(false, &[1, 2, 3]), None);
        assert_eq!(decoder.data_group().size(), Prefixed::MAX_SIZE);
        assert_eq!(decoder.kind().decodes, 1);
    }

    #[test]
    fn bad_crc_resets_group() {
        let mut decoder = DataGroupDecoder::new(Prefixed::default());
        let mut raw = group(b"abc");
        raw[2] ^= 0x01;

        assert_eq!(decoder.feed(true, &raw), None);
        assert_eq!(decoder.data_group().size(), 0);
        assert_eq!(decoder.data_group().needed(), 1);
    }

    #[test]
    fn check_crc_requires_stored_bytes() {
        let mut dg = DataGroup::new(8, 4);
        dg.append(b"DAB");
        assert!(!dg.check_crc(3));

        dg.append(&CRC_CCITT.checksum(b"DAB").to_be_bytes());
        assert!(dg.check_crc(3));
        assert!(!dg.check_crc(2));
    }
}
