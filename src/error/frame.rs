use thiserror::Error;

/// Errors of the slice based frame head codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("Not enough data to parse")]
    NotEnoughData,

    #[error("Not enough space to write to")]
    NotEnoughCapacity,
}
