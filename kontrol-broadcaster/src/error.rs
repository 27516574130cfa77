use thiserror::Error;

/// Failure to fit an event into its wire frames
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Frame overflow: need {needed} bytes but frame holds {capacity}")]
    FrameOverflow { needed: usize, capacity: usize },

    #[error("Batch overflow: event needs {needed} frames but batch holds {capacity}")]
    BatchOverflow { needed: usize, capacity: usize },

    #[error("Invalid OSC string (contains NUL): {0:?}")]
    InvalidString(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Packet truncated at offset {0}")]
    Truncated(usize),

    #[error("Malformed packet: {0}")]
    Malformed(String),

    #[error("Unsupported OSC type tag: {0:?}")]
    UnsupportedTag(char),
}

#[derive(Error, Debug)]
pub enum BroadcasterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Broadcaster stopped")]
    Stopped,
}

pub type Result<T> = std::result::Result<T, BroadcasterError>;
