//! Error types for wavpcm

use thiserror::Error;

/// Result type alias for WAVE operations
pub type WavResult<T> = Result<T, WavError>;

/// Errors that can occur while reading or writing a WAVE file
#[derive(Debug, Error)]
pub enum WavError {
    /// File does not start with a RIFF chunk
    #[error("file does not start with RIFF id")]
    NotRiff,

    /// RIFF container does not carry the WAVE form type
    #[error("not a WAVE file")]
    NotWave,

    /// Format tag other than PCM
    #[error("unsupported format tag {0:#06x}: only PCM is supported")]
    UnsupportedFormatTag(u16),

    /// Truncated or inconsistent chunk header
    #[error("malformed chunk header")]
    MalformedHeader,

    /// data chunk encountered before the fmt chunk
    #[error("data chunk before fmt chunk")]
    DataBeforeFmt,

    /// fmt chunk and/or data chunk absent from the file
    #[error("fmt chunk and/or data chunk missing")]
    MissingChunk,

    /// Read past the declared extent of a chunk
    #[error("read past declared chunk extent")]
    TruncatedChunk,

    /// Writer parameter outside its documented domain
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// Writer used before a required parameter was set
    #[error("parameter not specified: {0}")]
    MissingParameter(&'static str),

    /// Writer parameter changed after the header was written
    #[error("cannot change parameters after starting to write")]
    ParameterLocked,

    /// I/O error on the backing stream
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
