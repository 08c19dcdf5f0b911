//! Values exchanged across the session boundary

use crate::classify::Status;
use crate::features::BandEnergies;
use std::sync::Arc;

/// One block of mono samples as delivered by the capture side
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBlock {
    pub samples: Vec<f64>,

    /// Sample rate in Hz
    pub sample_rate: f64,
}

impl SampleBlock {
    pub fn new(samples: Vec<f64>, sample_rate: f64) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Analysis result of one block, published as a whole
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSnapshot {
    /// Frequency of the strongest bin in Hz
    pub dominant_frequency_hz: f64,

    /// Average dB per band; unresolvable bands are absent
    pub band_energies_db: BandEnergies,

    pub status: Status,

    /// Explanatory annotation, independent of `status`
    pub problem: Option<String>,

    /// Position of the block within the listening session, from 0
    pub block_index: u64,
}

/// Point-in-time copy of the controller state
#[derive(Debug, Clone)]
pub struct SessionState {
    pub is_listening: bool,

    /// Sample rate of the current or most recent session
    pub sample_rate: f64,

    /// Block length of the current or most recent session
    pub block_length: usize,

    pub latest_snapshot: Option<Arc<AnalysisSnapshot>>,
}
