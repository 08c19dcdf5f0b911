//! FFT engine using realfft for real-valued blocks
//!
//! Produces N/2 power bins per block, normalized as `|X[k]|² / N²`, plus the
//! same bins in dB clamped to [`DB_FLOOR`].

use super::{validate_block_length, validate_sample_rate};
use crate::error::{AnalysisError, ExpectedLength, Result};
use num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::sync::Arc;

/// Lowest dB value a bin can report; zero power clamps here
pub const DB_FLOOR: f64 = -120.0;

/// Convert a normalized power value to dB, clamped to [`DB_FLOOR`]
pub fn power_to_db(power: f64) -> f64 {
    if power.is_finite() && power > 0.0 {
        (10.0 * power.log10()).max(DB_FLOOR)
    } else {
        DB_FLOOR
    }
}

/// Power spectrum of one processed block
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumFrame {
    /// Normalized power per bin, `|X[k]|² / N²`, k = 0..N/2
    pub power: Vec<f64>,

    /// `power` in dB, clamped to [`DB_FLOOR`]
    pub power_db: Vec<f64>,

    /// Sample rate of the source block in Hz
    pub sample_rate: f64,

    /// FFT size N (twice the bin count)
    pub fft_size: usize,
}

impl SpectrumFrame {
    /// Number of bins (N/2)
    pub fn bin_count(&self) -> usize {
        self.power.len()
    }

    /// Width of one bin in Hz
    pub fn bin_width_hz(&self) -> f64 {
        self.sample_rate / self.fft_size as f64
    }

    /// Center frequency of bin `k` in Hz
    pub fn bin_to_hz(&self, bin: usize) -> f64 {
        bin as f64 * self.sample_rate / self.fft_size as f64
    }
}

/// FFT engine for real-valued blocks
pub struct FftEngine {
    /// FFT size (number of samples)
    fft_size: usize,

    /// Real FFT processor
    r2c: Arc<dyn RealToComplex<f64>>,

    /// Reusable input buffer (realfft scrambles it)
    input_buffer: Vec<f64>,

    /// Reusable output buffer (complex spectrum, N/2 + 1 bins)
    output_buffer: Vec<Complex<f64>>,

    scratch: Vec<Complex<f64>>,
}

impl FftEngine {
    /// Create new FFT engine
    ///
    /// # Arguments
    /// * `fft_size` - FFT size, a supported power of two
    pub fn new(fft_size: usize) -> Result<Self> {
        validate_block_length(fft_size)?;

        let mut planner = RealFftPlanner::<f64>::new();
        let r2c = planner.plan_fft_forward(fft_size);

        let input_buffer = r2c.make_input_vec();
        let output_buffer = r2c.make_output_vec();
        let scratch = r2c.make_scratch_vec();

        Ok(Self {
            fft_size,
            r2c,
            input_buffer,
            output_buffer,
            scratch,
        })
    }

    /// Transform a windowed block into a [`SpectrumFrame`]
    ///
    /// # Arguments
    /// * `windowed` - Exactly `fft_size` windowed samples
    /// * `sample_rate` - Sample rate of the block in Hz
    pub fn transform(&mut self, windowed: &[f64], sample_rate: f64) -> Result<SpectrumFrame> {
        if windowed.len() != self.fft_size {
            return Err(AnalysisError::InvalidBlockLength {
                actual: windowed.len(),
                expected: ExpectedLength::Exactly(self.fft_size),
            });
        }
        validate_sample_rate(sample_rate)?;

        self.input_buffer.copy_from_slice(windowed);

        self.r2c
            .process_with_scratch(
                &mut self.input_buffer,
                &mut self.output_buffer,
                &mut self.scratch,
            )
            .map_err(|e| AnalysisError::Transform(e.to_string()))?;

        // Drop the Nyquist bin: N/2 bins, k = 0..N/2-1
        let n_sq = (self.fft_size as f64).powi(2);
        let power: Vec<f64> = self.output_buffer[..self.num_bins()]
            .iter()
            .map(|c| {
                let p = c.norm_sqr() / n_sq;
                if p.is_finite() { p } else { 0.0 }
            })
            .collect();

        let power_db = power.iter().map(|&p| power_to_db(p)).collect();

        Ok(SpectrumFrame {
            power,
            power_db,
            sample_rate,
            fft_size: self.fft_size,
        })
    }

    /// Get FFT size
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of power bins produced per block (fft_size / 2)
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2
    }
}

/// One-shot transform of a windowed block
///
/// Plans a fresh engine; use [`FftEngine`] when processing a stream.
pub fn transform(windowed: &[f64], sample_rate: f64) -> Result<SpectrumFrame> {
    FftEngine::new(windowed.len())?.transform(windowed, sample_rate)
}
