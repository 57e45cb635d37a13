use thiserror::Error;

/// Why a pixel buffer could not be read as an image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("image has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error("unsupported channel count: {0}")]
    Channels(u8),
    #[error("expected {expected} samples for the declared layout, found {found}")]
    SampleCount { expected: usize, found: usize },
    #[error("unrecognized image data: {0}")]
    Format(String),
}

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode image: {0}")]
    Decode(#[from] DecodeError),
}

#[derive(Error, Debug)]
#[error("invalid JSON in {source_id}: {source}")]
pub struct ParseError {
    pub source_id: String,
    #[source]
    pub source: serde_json::Error,
}
