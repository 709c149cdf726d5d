//! Host-side errors.
//!
//! Nothing the bus can do produces an [`Error`]: overruns are status bits and
//! unmapped addresses read zero. These variants only cover configuration,
//! save states and the bench driver.

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
    #[error("save state I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("save state too small ({0} bytes)")]
    Truncated(usize),
    #[error("invalid save state (bad magic)")]
    BadMagic,
    #[error("unsupported save state version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("save state was taken with a different configuration")]
    ConfigMismatch,
    #[error("decompress error: {0}")]
    Decompress(String),
    #[error("serialize error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("timed out after {ticks} ticks waiting for {what}")]
    Timeout { what: &'static str, ticks: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;
