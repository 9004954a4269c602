use thiserror::Error;

use crate::codestream::CodestreamError;

/// Message used when a failure carries no usable description.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error during HTJ2K encoding";

/// Failure of a single encode call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Raw data size is smaller than expected ({actual} < {expected} bytes)")]
    RawDataTooSmall { expected: usize, actual: usize },
    /// Failure reported by the codec or its sink, message kept verbatim.
    #[error("{0}")]
    Codec(String),
    #[error("Codec produced an empty codestream")]
    EmptyOutput,
    #[error("{}", UNKNOWN_ERROR_MESSAGE)]
    Unknown,
}

impl From<CodestreamError> for EncodeError {
    fn from(err: CodestreamError) -> Self {
        EncodeError::Codec(err.to_string())
    }
}

/// Failure at the caller-runtime boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("rawPixelData must not be null")]
    MissingInput,
    #[error("Failed to access raw pixel data")]
    InputAccess,
    #[error("Failed to allocate result byte array")]
    OutputAllocation,
    #[error("HTJ2K encoding failed: {0}")]
    Encode(#[from] EncodeError),
}

pub type Result<T, E = EncodeError> = std::result::Result<T, E>;
