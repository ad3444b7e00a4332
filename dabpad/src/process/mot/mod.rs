//! MOT slideshow reassembly over X-PAD.
//!
//! MOT data groups arrive in X-PAD subfields; their length is announced by
//! the preceding DGLI. Complete, CRC-checked data groups are handed to the
//! [`MotManager`](manager::MotManager), which reassembles header and body
//! segments into [`MotFile`]s.

pub mod entity;
pub mod manager;
pub mod object;

use log::debug;

use crate::process::data_group::{DataGroup, DataGroupKind, Decoded};
use crate::process::mot::manager::MotManager;
use crate::structs::mot::MotFile;

/// Largest MOT data group accepted over X-PAD (2^14 bytes).
pub const MOT_DG_MAX_SIZE: usize = 16384;

/// MOT application over X-PAD: accumulates one data group of the length
/// announced by the DGLI.
#[derive(Debug, Default)]
pub struct MotKind {
    length: usize,
    manager: MotManager,
}

impl MotKind {
    /// Sets the length of the next data group (including CRC).
    pub fn set_len(&mut self, length: usize) {
        self.length = length;
    }

    #[cfg(test)]
    pub fn manager(&self) -> &MotManager {
        &self.manager
    }
}

impl DataGroupKind for MotKind {
    type Output = MotFile;
    const MAX_SIZE: usize = MOT_DG_MAX_SIZE;

    fn initial_needed_size(&self) -> usize {
        self.length
    }

    fn decode(&mut self, dg: &mut DataGroup) -> Decoded<MotFile> {
        if self.length < 2 {
            return Decoded::Done(None);
        }

        if !dg.check_crc(self.length - 2) {
            debug!("MOT: data group CRC mismatch, discarding");
            return Decoded::Done(None);
        }

        let file = self.manager.handle_data_group(&dg.data()[..self.length]);
        Decoded::Done(file)
    }

    fn reset(&mut self) {
        self.length = 0;
        self.manager.reset();
    }
}
