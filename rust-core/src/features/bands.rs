//! Named frequency bands and their average energy

use crate::error::{AnalysisError, Result};
use crate::spectrum::SpectrumFrame;
use serde::{Deserialize, Serialize};

/// A named closed frequency interval [low_hz, high_hz]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandDefinition {
    pub name: String,
    pub low_hz: f64,
    pub high_hz: f64,
}

impl BandDefinition {
    pub fn new(name: impl Into<String>, low_hz: f64, high_hz: f64) -> Self {
        Self {
            name: name.into(),
            low_hz,
            high_hz,
        }
    }

    /// Name must be non-empty and the interval finite, non-negative and non-empty
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AnalysisError::InvalidConfig("band with empty name".into()));
        }
        if !(self.low_hz.is_finite() && self.high_hz.is_finite())
            || self.low_hz < 0.0
            || self.low_hz >= self.high_hz
        {
            return Err(AnalysisError::InvalidConfig(format!(
                "band '{}' has invalid interval [{}, {}]",
                self.name, self.low_hz, self.high_hz
            )));
        }
        Ok(())
    }

    /// Inclusive bin range covered by this band, or `None` when the band
    /// degenerates at the frame's resolution
    ///
    /// `low = floor(low_hz / sr * N)`, `high = min(ceil(high_hz / sr * N), bins - 1)`;
    /// the band is usable only when `low < high`.
    pub fn bin_range(&self, sample_rate: f64, fft_size: usize, bin_count: usize) -> Option<(usize, usize)> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) || bin_count == 0 {
            return None;
        }

        let n = fft_size as f64;
        // float -> usize casts saturate, so out-of-range bands land past the last bin
        let low = (self.low_hz / sample_rate * n).floor() as usize;
        let high = ((self.high_hz / sample_rate * n).ceil() as usize).min(bin_count - 1);

        if low < high && high < bin_count {
            Some((low, high))
        } else {
            None
        }
    }
}

/// Average dB of one band
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandEnergy {
    pub name: String,
    pub db: f64,
}

/// Per-band average energy in dB, in configured band order
///
/// A band missing from this map could not be resolved at the current sample
/// rate and block length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BandEnergies {
    entries: Vec<BandEnergy>,
}

impl BandEnergies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the energy for `name`
    pub fn insert(&mut self, name: impl Into<String>, db: f64) {
        let name = name.into();
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.db = db,
            None => self.entries.push(BandEnergy { name, db }),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.db)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|e| (e.name.as_str(), e.db))
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for BandEnergies {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut energies = BandEnergies::new();
        for (name, db) in iter {
            energies.insert(name, db);
        }
        energies
    }
}

/// Average dB over one band, `None` if the band degenerates
pub fn band_energy_db(frame: &SpectrumFrame, band: &BandDefinition) -> Option<f64> {
    let (low, high) = band.bin_range(frame.sample_rate, frame.fft_size, frame.power_db.len())?;
    let slice = &frame.power_db[low..=high];
    Some(slice.iter().sum::<f64>() / slice.len() as f64)
}

/// Energy for every resolvable band
pub fn band_energies(frame: &SpectrumFrame, bands: &[BandDefinition]) -> BandEnergies {
    bands
        .iter()
        .filter_map(|band| band_energy_db(frame, band).map(|db| (band.name.clone(), db)))
        .collect()
}
