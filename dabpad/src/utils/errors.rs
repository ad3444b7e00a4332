#[macro_export]
macro_rules! log_or_err {
    ($state:expr, $level:expr, $err:expr $(,)?) => {{
        if $level <= $state.fail_level {
            return Err($err);
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum FecError {
    #[error("Symbol size must be between 1 and 8 bits, got {0}")]
    InvalidSymbolSize(u32),

    #[error("First consecutive root {fcr} exceeds field size {nn}")]
    InvalidFirstRoot { fcr: usize, nn: usize },

    #[error("Primitive element {prim} outside 1..={nn}")]
    InvalidPrimitive { prim: usize, nn: usize },

    #[error("Number of roots {nroots} outside 1..={nn}")]
    InvalidRootCount { nroots: usize, nn: usize },

    #[error("Padding {pad} leaves no data symbols (limit {limit})")]
    InvalidPadding { pad: usize, limit: usize },

    #[error("Generator polynomial {0:#X} is not primitive")]
    NonPrimitivePolynomial(u32),

    #[error("Codeword length {found} does not match expected {expected}")]
    CodewordLength { found: usize, expected: usize },

    #[error("{count} erasures exceed the {max} parity symbols")]
    TooManyErasures { count: usize, max: usize },

    #[error("Erasure position {position} outside codeword of {len} symbols")]
    ErasureOutOfRange { position: usize, len: usize },

    #[error("Codeword is uncorrectable")]
    Uncorrectable,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum MotError {
    #[error("Data group of {0} bytes is too short for its headers")]
    Truncated(usize),

    #[error("Data group flags incomplete (CRC: {crc}, segment: {segment}, user access: {user_access})")]
    MissingFlags {
        crc: bool,
        segment: bool,
        user_access: bool,
    },

    #[error("Unsupported data group type {0}")]
    UnsupportedDataGroupType(u8),

    #[error("Session header carries no transport id")]
    MissingTransportId,

    #[error("Session header length indicator {0} is below 2")]
    ShortLengthIndicator(u8),

    #[error("Segment size {declared} does not match {available} available bytes")]
    SegmentSizeMismatch { declared: usize, available: usize },

    #[error("Header core needs 7 bytes, got {0}")]
    HeaderTooShort(usize),

    #[error("Header size {declared} does not match {received} received bytes")]
    HeaderSizeMismatch { declared: usize, received: usize },

    #[error("Header update received before any header")]
    UpdateWithoutHeader,

    #[error("Repeated header for an object that already has one")]
    DuplicateHeader,

    #[error("Header parameter {id:#04X} overruns the header ({needed} > {available})")]
    ParameterOverrun {
        id: u8,
        needed: usize,
        available: usize,
    },

    #[error("Header parameter {id:#04X} has invalid length {len}")]
    ParameterLength { id: u8, len: usize },

    #[error("Header update changes content name from {old:?} to {new:?}")]
    ContentNameMismatch { old: String, new: String },
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SuperframeError {
    #[error("Bitrate {0} kbit/s is not a positive multiple of 8")]
    InvalidBitrate(usize),

    #[error("Frame length {found} does not match expected {expected}")]
    FrameLength { found: usize, expected: usize },

    #[error("Superframe fire code check failed")]
    FireCode,

    #[error("Invalid access unit start table: {0:?}")]
    InvalidAuStart(Vec<usize>),

    #[error("Access unit #{index} failed CRC check")]
    AuCrc { index: usize },

    #[error("Access unit #{index} is too short ({len} bytes)")]
    AuTooShort { index: usize, len: usize },

    #[error("RS codec setup failed: {0}")]
    CodecSetup(String),

    #[error("Superframe contains uncorrectable RS codewords")]
    Uncorrectable,
}
