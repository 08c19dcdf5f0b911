//! Error types for the acoustic analysis core

use std::fmt;
use thiserror::Error;

/// What a rejected block length was checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedLength {
    /// A power of two inside the supported range
    PowerOfTwo { min: usize, max: usize },

    /// The block length the session was started with
    Exactly(usize),
}

impl fmt::Display for ExpectedLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedLength::PowerOfTwo { min, max } => {
                write!(f, "a power of two in {}..={}", min, max)
            }
            ExpectedLength::Exactly(n) => write!(f, "exactly {} samples", n),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Invalid block length {actual}: expected {expected}")]
    InvalidBlockLength {
        actual: usize,
        expected: ExpectedLength,
    },

    #[error("Invalid sample rate: {0} Hz")]
    InvalidSampleRate(f64),

    #[error("Session is already listening")]
    AlreadyListening,

    #[error("Session is not listening")]
    NotListening,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("FFT processing failed: {0}")]
    Transform(String),

    #[error("Failed to spawn analysis thread: {0}")]
    Spawn(String),

    #[cfg(feature = "capture")]
    #[error("Audio capture failed: {0}")]
    Capture(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
