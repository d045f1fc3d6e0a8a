use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("No carrier detected in recording")]
    NoCarrierDetected,

    #[error("Run sequence too short for calibration preamble ({0} runs)")]
    InsufficientPreamble(usize),

    #[error("Bitstream ends inside a chunk payload")]
    TruncatedChunk,

    #[error("Trailing bits after the final chunk")]
    TrailingBits,

    #[error("Chunk payload exceeds the 32-bit length field")]
    PayloadTooLarge,

    #[error("Float payload must be 32 or 64 bits, got {0}")]
    UnsupportedBitLength(usize),

    #[error("Unknown chunk tag {0}")]
    UnknownTag(u8),

    #[error("No destination configured for {0} chunk")]
    MissingSink(&'static str),

    #[error("Synchronization pattern missing or corrupt")]
    SyncPatternMismatch,

    #[error("No bit data found")]
    EmptyBitstream,

    #[error("Bit count {0} is not a whole number of {1}-bit units")]
    InvalidBitCount(usize, usize),

    #[error("Image payload is {got} bytes but configured dimensions need {expected}")]
    ImageSizeMismatch { got: usize, expected: usize },

    #[error("Text payload is not valid UTF-8")]
    InvalidText(#[from] std::string::FromUtf8Error),

    #[error("Sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, LinkError>;
