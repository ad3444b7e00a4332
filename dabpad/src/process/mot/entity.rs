use std::collections::BTreeMap;

/// Segments of one MOT header or body, keyed by segment number.
#[derive(Debug, Clone, Default)]
pub struct MotEntity {
    segments: BTreeMap<u16, Vec<u8>>,
    last: Option<u16>,
    size: usize,
}

impl MotEntity {
    /// Stores a segment unless one with the same number is already present.
    ///
    /// The last segment number is recorded even for a duplicate.
    pub fn add_segment(&mut self, index: u16, last: bool, bytes: &[u8]) {
        if last {
            self.last = Some(index);
        }

        if self.segments.contains_key(&index) {
            return;
        }

        self.segments.insert(index, bytes.to_vec());
        self.size += bytes.len();
    }

    pub fn is_finished(&self) -> bool {
        self.last
            .is_some_and(|last| (0..=last).all(|i| self.segments.contains_key(&i)))
    }

    /// Concatenation of segments `0..=last`.
    pub fn data(&self) -> Vec<u8> {
        let Some(last) = self.last else {
            return Vec::new();
        };

        let mut data = Vec::with_capacity(self.size);
        for segment in self.segments.range(..=last).map(|(_, s)| s) {
            data.extend_from_slice(segment);
        }

        data
    }

    /// Total bytes of all stored segments.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
