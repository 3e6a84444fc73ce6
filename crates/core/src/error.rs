//! Error types for the runtime core.
//!
//! [`Trap`] covers guest trust violations. These are never recovered from:
//! once a host function reports one, the frame is abandoned and the driver is
//! expected to stop the run. [`StateError`] covers save-state I/O, which is an
//! operator-level failure and leaves the runtime untouched.

use thiserror::Error;

/// A fatal guest error raised by a host function.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Trap {
    #[error("out of bounds memory access: {len} bytes at {offset:#x}")]
    OutOfBounds { offset: u32, len: u32 },

    #[error("unterminated string at {offset:#x}")]
    UnterminatedString { offset: u32 },

    #[error("integer overflow in size computation")]
    Overflow,

    #[error("format string requests argument {index} but none was supplied")]
    MissingArgument { index: usize },
}

/// Failure while encoding, decoding, or restoring runtime state.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("state blob is {actual} bytes, expected {expected}")]
    Size { expected: usize, actual: usize },

    #[error("disk size {0} exceeds capacity")]
    DiskSize(u16),

    #[error("invalid save state file (bad magic)")]
    BadMagic,

    #[error("unsupported save state version {0}")]
    Version(u32),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("decompress error: {0}")]
    Decompress(String),
}
