//! High-level spectrum analyzer
//!
//! Binds windowing and the FFT engine to one block length and sample rate.

use super::fft::{FftEngine, SpectrumFrame};
use super::validate_sample_rate;
use super::windowing::{apply_coefficients, window_coefficients, WindowCoefficients, WindowType};
use crate::error::{AnalysisError, ExpectedLength, Result};

/// Spectrum analyzer configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Block length / FFT size (power of two)
    pub block_length: usize,

    /// Window type for spectral analysis
    pub window_type: WindowType,

    /// Sample rate in Hz
    pub sample_rate: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            block_length: 1024,
            window_type: WindowType::Hann,
            sample_rate: 44100.0,
        }
    }
}

/// Block-by-block spectrum analyzer
pub struct SpectrumAnalyzer {
    config: AnalyzerConfig,
    window: WindowCoefficients,
    fft_engine: FftEngine,
}

impl SpectrumAnalyzer {
    /// Create new spectrum analyzer
    ///
    /// Fails if the block length is not a supported power of two or the
    /// sample rate is not positive.
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        validate_sample_rate(config.sample_rate)?;
        let window = window_coefficients(config.window_type, config.block_length)?;
        let fft_engine = FftEngine::new(config.block_length)?;

        Ok(Self {
            config,
            window,
            fft_engine,
        })
    }

    /// Window and transform one block
    ///
    /// # Arguments
    /// * `samples` - Exactly `block_length` raw samples
    pub fn analyze(&mut self, samples: &[f64]) -> Result<SpectrumFrame> {
        if samples.len() != self.config.block_length {
            return Err(AnalysisError::InvalidBlockLength {
                actual: samples.len(),
                expected: ExpectedLength::Exactly(self.config.block_length),
            });
        }

        let windowed = apply_coefficients(samples, &self.window);
        self.fft_engine.transform(&windowed, self.config.sample_rate)
    }

    /// Get current configuration
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Get number of frequency bins
    pub fn num_bins(&self) -> usize {
        self.fft_engine.num_bins()
    }
}
