//! Utility functions and supporting infrastructure.
//!
//! Provides bit-level reading, CRC validation, character set conversion and
//! error types shared by the PAD and superframe processors.

pub mod bitstream_io;
pub mod charset;
pub mod crc;
pub mod errors;
