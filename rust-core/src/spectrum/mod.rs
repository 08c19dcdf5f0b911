//! Spectral analysis with FFT

pub mod fft;
pub mod windowing;
pub mod analysis;

pub use fft::{transform, FftEngine, SpectrumFrame, DB_FLOOR};
pub use windowing::{apply_window, WindowType};
pub use analysis::{AnalyzerConfig, SpectrumAnalyzer};

use crate::error::{AnalysisError, ExpectedLength, Result};

/// Smallest block length the pipeline accepts
pub const MIN_BLOCK_LENGTH: usize = 32;

/// Largest block length the pipeline accepts
pub const MAX_BLOCK_LENGTH: usize = 32768;

/// Check that `length` is a supported power of two
pub fn validate_block_length(length: usize) -> Result<()> {
    if length.is_power_of_two() && (MIN_BLOCK_LENGTH..=MAX_BLOCK_LENGTH).contains(&length) {
        Ok(())
    } else {
        Err(AnalysisError::InvalidBlockLength {
            actual: length,
            expected: ExpectedLength::PowerOfTwo {
                min: MIN_BLOCK_LENGTH,
                max: MAX_BLOCK_LENGTH,
            },
        })
    }
}

/// Check that `sample_rate` is positive and finite
pub fn validate_sample_rate(sample_rate: f64) -> Result<()> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::InvalidSampleRate(sample_rate))
    }
}

/// Iterator over every supported block length
pub fn supported_block_lengths() -> impl Iterator<Item = usize> {
    (MIN_BLOCK_LENGTH.trailing_zeros()..=MAX_BLOCK_LENGTH.trailing_zeros()).map(|exp| 1usize << exp)
}
