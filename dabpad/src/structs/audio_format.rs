//! DAB+ superframe header and audio service format.
//!
//! The byte following the fire code in every DAB+ superframe (TS 102 563
//! clause 5.2) describes the HE-AAC configuration:
//!
//! ```text
//! | rfa (1) | dac_rate (1) | sbr_flag (1) | aac_channel_mode (1) | ps_flag (1) | mpeg_surround_config (3) |
//! ```

use std::fmt::Display;

/// Superframe format byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuperframeFormat {
    /// 48 kHz core sampling rate when set, 32 kHz otherwise.
    pub dac_rate: bool,
    pub sbr_flag: bool,
    /// Stereo when set.
    pub aac_channel_mode: bool,
    pub ps_flag: bool,
    pub mpeg_surround_config: u8,
}

impl From<u8> for SuperframeFormat {
    fn from(value: u8) -> Self {
        Self {
            dac_rate: value & 0x40 != 0,
            sbr_flag: value & 0x20 != 0,
            aac_channel_mode: value & 0x10 != 0,
            ps_flag: value & 0x08 != 0,
            mpeg_surround_config: value & 0x07,
        }
    }
}

impl SuperframeFormat {
    /// Number of access units per superframe.
    pub fn num_aus(&self) -> usize {
        match (self.dac_rate, self.sbr_flag) {
            (false, true) => 2,
            (true, true) => 3,
            (false, false) => 4,
            (true, false) => 6,
        }
    }

    /// Byte offset of the first access unit, right after the AU start table.
    pub fn first_au_start(&self) -> usize {
        match (self.dac_rate, self.sbr_flag) {
            (false, true) => 5,
            (true, true) => 6,
            (false, false) => 8,
            (true, false) => 11,
        }
    }

    pub fn codec(&self) -> &'static str {
        if self.ps_flag {
            "HE-AAC v2"
        } else if self.sbr_flag {
            "HE-AAC"
        } else {
            "AAC-LC"
        }
    }

    /// Core sampling rate in kHz (the output rate doubles with SBR).
    pub fn sample_rate_khz(&self) -> u32 {
        if self.dac_rate { 48 } else { 32 }
    }

    pub fn mode(&self) -> &'static str {
        if self.ps_flag {
            "PS"
        } else if self.aac_channel_mode {
            "Stereo"
        } else {
            "Mono"
        }
    }
}

/// Human-readable summary of an audio service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioServiceFormat {
    pub codec: &'static str,
    pub sample_rate_khz: u32,
    pub mode: &'static str,
    pub bitrate_kbps: usize,
}

impl AudioServiceFormat {
    pub fn new(format: &SuperframeFormat, bitrate_kbps: usize) -> Self {
        Self {
            codec: format.codec(),
            sample_rate_khz: format.sample_rate_khz(),
            mode: format.mode(),
            bitrate_kbps,
        }
    }
}

impl Display for AudioServiceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, {} kHz {} @ {} kbit/s",
            self.codec, self.sample_rate_khz, self.mode, self.bitrate_kbps
        )
    }
}

#[test]
fn format_byte_layout() {
    let format = SuperframeFormat::from(0b0111_1000);
    assert!(format.dac_rate && format.sbr_flag && format.aac_channel_mode && format.ps_flag);
    assert_eq!(format.num_aus(), 3);
    assert_eq!(format.first_au_start(), 6);

    let format = SuperframeFormat::from(0b0000_0000);
    assert_eq!((format.num_aus(), format.first_au_start()), (4, 8));

    let format = SuperframeFormat::from(0b0100_0000);
    assert_eq!((format.num_aus(), format.first_au_start()), (6, 11));
}

#[test]
fn service_summary() {
    let he_aac_v2 = AudioServiceFormat::new(&SuperframeFormat::from(0x38), 72);
    assert_eq!(he_aac_v2.to_string(), "HE-AAC v2, 32 kHz PS @ 72 kbit/s");

    let aac_lc = AudioServiceFormat::new(&SuperframeFormat::from(0x50), 128);
    assert_eq!(aac_lc.to_string(), "AAC-LC, 48 kHz Stereo @ 128 kbit/s");

    let he_aac = AudioServiceFormat::new(&SuperframeFormat::from(0x20), 48);
    assert_eq!(he_aac.to_string(), "HE-AAC, 32 kHz Mono @ 48 kbit/s");
}
