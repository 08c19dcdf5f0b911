//! Windowing stage
//!
//! Tapers a block before the FFT to reduce spectral leakage. Coefficients are
//! generated once per (window type, block length) and shared afterwards.

use super::validate_block_length;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

/// Window function types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    /// Hann window: w[n] = 0.5 * (1 - cos(2πn/(N-1)))
    #[default]
    Hann,

    /// Hamming window: w[n] = 0.54 - 0.46*cos(2πn/(N-1))
    Hamming,

    /// Blackman window: w[n] = 0.42 - 0.5*cos(2πn/(N-1)) + 0.08*cos(4πn/(N-1))
    Blackman,

    /// Rectangular window (no windowing)
    Rectangular,
}

/// Precomputed window multipliers for one block length
pub type WindowCoefficients = Arc<[f64]>;

thread_local! {
    static WINDOW_CACHE: RefCell<HashMap<(WindowType, usize), WindowCoefficients>> =
        RefCell::new(HashMap::new());
}

/// Generate window coefficients
///
/// # Arguments
/// * `window_type` - Type of window function
/// * `length` - Number of samples (N)
///
/// # Returns
/// Vector of window coefficients w[n] for n = 0..N-1
pub fn generate_window(window_type: WindowType, length: usize) -> Vec<f64> {
    if length < 2 {
        return vec![1.0; length];
    }

    let denom = (length - 1) as f64;

    match window_type {
        WindowType::Hann => (0..length)
            .map(|n| 0.5 * (1.0 - (2.0 * PI * n as f64 / denom).cos()))
            .collect(),

        WindowType::Hamming => (0..length)
            .map(|n| 0.54 - 0.46 * (2.0 * PI * n as f64 / denom).cos())
            .collect(),

        WindowType::Blackman => (0..length)
            .map(|n| {
                let angle = 2.0 * PI * n as f64 / denom;
                0.42 - 0.5 * angle.cos() + 0.08 * (2.0 * angle).cos()
            })
            .collect(),

        WindowType::Rectangular => vec![1.0; length],
    }
}

/// Cached coefficients for a supported block length
pub fn window_coefficients(window_type: WindowType, length: usize) -> Result<WindowCoefficients> {
    validate_block_length(length)?;

    Ok(WINDOW_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .entry((window_type, length))
            .or_insert_with(|| generate_window(window_type, length).into())
            .clone()
    }))
}

/// Apply a Hann window to a block
///
/// Fails with `InvalidBlockLength` unless the block length is a supported
/// power of two.
pub fn apply_window(samples: &[f64]) -> Result<Vec<f64>> {
    apply_window_type(samples, WindowType::Hann)
}

/// Apply the given window type to a block
pub fn apply_window_type(samples: &[f64], window_type: WindowType) -> Result<Vec<f64>> {
    let window = window_coefficients(window_type, samples.len())?;
    Ok(apply_coefficients(samples, &window))
}

/// Term-wise product of samples and precomputed coefficients
pub(crate) fn apply_coefficients(samples: &[f64], window: &[f64]) -> Vec<f64> {
    samples
        .iter()
        .zip(window.iter())
        .map(|(&s, &w)| s * w)
        .collect()
}
