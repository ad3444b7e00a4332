#![doc = include_str!("../README.md")]
//!
//! ## Technical Overview
//!
//! Decoder for Programme Associated Data (PAD) of DAB and DAB+ audio services
//! according to EN 300 401, EN 301 234, TS 102 563 and TS 102 980.
//!
//! ### PAD Organization
//!
//! **F-PAD**: Two bytes at the end of every audio frame announcing the X-PAD
//! kind and whether contents indicators are present.
//! **X-PAD**: Subfields of up to four applications per frame, continued over
//! following frames without contents indicators.
//!
//! ### Applications
//!
//! - Dynamic label, up to 128 characters in eight segments
//! - DL Plus content type tags
//! - MOT slideshow (JPEG/PNG images)
//!
//! ### DAB+ Transport
//!
//! Superframes of five audio frames protected by interleaved RS(120, 110)
//! codewords. PAD travels in a data stream element at the start of each
//! access unit.
//!
//! ## Quick Start
//!
//! Steps for processing a DAB+ sub-channel:
//!
//! 1. Split the sub-channel into access units using [`process::superframe::SuperframeFilter`]
//! 2. Feed the PAD of each access unit to [`process::pad::PadDecoder`]
//! 3. React to labels and slides
//!
//! ```rust,no_run
//! use dabpad::process::pad::{PadDecoder, PadEvent};
//! use dabpad::process::superframe::{SuperframeEvent, SuperframeFilter};
//!
//! // Initialize processing components
//! let mut filter = SuperframeFilter::new(72)?;
//! let mut pad = PadDecoder::default();
//! pad.mot_app_type().set(Some(12));
//!
//! let subchannel = vec![0u8; filter.frame_len() * 5]; // Example data
//!
//! for frame in subchannel.chunks(filter.frame_len()) {
//!     for event in filter.feed(frame)? {
//!         if let SuperframeEvent::Pad { xpad, fpad } = event {
//!             for pad_event in pad.process(&xpad, true, fpad) {
//!                 match pad_event {
//!                     PadEvent::LabelChanged(label) => println!("Label: {label}"),
//!                     PadEvent::SlideChanged(slide) => println!("Slide: {slide}"),
//!                     PadEvent::LengthError { announced, available } => {
//!                         eprintln!("X-PAD length {announced} != {available}");
//!                     }
//!                 }
//!             }
//!         }
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Stateful processors for PAD and DAB+ sub-channels.
///
/// 1. **Superframes** ([`process::superframe`]): Sync, RS correction and
///    access unit splitting.
///
/// 2. **PAD dispatch** ([`process::pad`]): Contents indicators and subfield
///    routing.
///
/// 3. **Applications** ([`process::dynamic_label`], [`process::mot`]):
///    Data group reassembly and decoding.
pub mod process;

/// Data structures representing PAD and DAB+ components.
///
/// - **F-PAD** ([`structs::fpad`]): X-PAD indicator and CI flag
/// - **X-PAD** ([`structs::xpad`]): Contents indicators and application types
/// - **Dynamic Label** ([`structs::dynamic_label`]): Label text and DL Plus tags
/// - **MOT** ([`structs::mot`]): Header core, parameters and finished files
/// - **Audio Format** ([`structs::audio_format`]): DAB+ superframe format
pub mod structs;

/// Utility functions and supporting infrastructure.
///
/// - **Bitstream I/O** ([`utils::bitstream_io`]): Bit-level reading
/// - **CRC Validation** ([`utils::crc`]): CRC-16-CCITT and fire code
/// - **Character Sets** ([`utils::charset`]): EBU Latin, UCS-2 and UTF-8
/// - **Error Handling** ([`utils::errors`]): Error types
pub mod utils;
