//! Data structures representing PAD and DAB+ wire elements.
//!
//! Contains structured representations of the F-PAD field, X-PAD contents
//! indicators, dynamic labels with DL Plus tags, MOT objects and the DAB+
//! superframe format.

pub mod audio_format;
pub mod dynamic_label;
pub mod fpad;
pub mod mot;
pub mod xpad;
