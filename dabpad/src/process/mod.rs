/// Reed-Solomon codec over GF(2^m), parameterized for DAB+ RS(120, 110).
///
/// Provides [`ReedSolomon`](fec::ReedSolomon) with encoding and
/// errors-and-erasures decoding.
pub mod fec;

/// Data group accumulation shared by every X-PAD application.
pub mod data_group;

/// Data group length indicator preceding MOT data groups.
pub mod dgli;

/// Dynamic label segments, commands and DL Plus tags.
pub mod dynamic_label;

/// MOT slideshow objects carried over X-PAD.
///
/// Provides [`MotKind`](mot::MotKind) together with the segment, object and
/// transport level reassembly below it.
pub mod mot;

/// PAD dispatch from F-PAD/X-PAD to the applications.
///
/// Provides the [`PadDecoder`](pad::PadDecoder) consuming the PAD of one
/// audio frame at a time and emitting [`PadEvent`](pad::PadEvent)s.
pub mod pad;

/// DAB+ superframe synchronization, FEC and access unit splitting.
///
/// Provides the [`SuperframeFilter`](superframe::SuperframeFilter) that
/// turns sub-channel frames into audio format, FEC and PAD events.
pub mod superframe;
