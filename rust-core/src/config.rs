//! Analysis configuration and the canonical default tables

use crate::classify::{BandHeuristic, Classifier, FrequencyProblemRule, Status, StatusRange};
use crate::error::{AnalysisError, Result};
use crate::features::BandDefinition;
use crate::spectrum::{validate_block_length, validate_sample_rate, WindowType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Four bands spanning 150-500 Hz
pub fn default_bands() -> Vec<BandDefinition> {
    vec![
        BandDefinition::new("low_hum", 150.0, 250.0),
        BandDefinition::new("worker_activity", 250.0, 350.0),
        BandDefinition::new("agitation", 350.0, 450.0),
        BandDefinition::new("piping", 450.0, 500.0),
    ]
}

/// `[0,500) Normal`, `[500,700) Warning`, `[700,3600] Critical`
pub fn default_status_ranges() -> Vec<StatusRange> {
    vec![
        StatusRange::half_open(0.0, 500.0, Status::Normal),
        StatusRange::half_open(500.0, 700.0, Status::Warning),
        StatusRange::closed(700.0, 3600.0, Status::Critical),
    ]
}

pub fn default_problem_rules() -> Vec<FrequencyProblemRule> {
    vec![
        FrequencyProblemRule::new(500.0, 700.0, "Possible swarming"),
        FrequencyProblemRule::new(700.0, 1000.0, "Colony agitation"),
        FrequencyProblemRule::new(1000.0, 3600.0, "Predator presence"),
        FrequencyProblemRule::new(20.0, 150.0, "Weak colony"),
    ]
}

pub fn default_band_heuristics() -> Vec<BandHeuristic> {
    vec![
        BandHeuristic {
            label: "Queen piping".into(),
            loud_band: "piping".into(),
            loud_above_db: -45.0,
            quiet_band: "low_hum".into(),
            quiet_below_db: -70.0,
        },
        BandHeuristic {
            label: "Colony agitation".into(),
            loud_band: "agitation".into(),
            loud_above_db: -40.0,
            quiet_band: "worker_activity".into(),
            quiet_below_db: -60.0,
        },
    ]
}

/// Complete configuration of an analysis session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Sample rate in Hz
    pub sample_rate: f64,

    /// Samples per block, a supported power of two
    pub block_length: usize,

    /// Analysis window
    pub window: WindowType,

    /// Ordered band table
    pub bands: Vec<BandDefinition>,

    /// Ordered status-threshold table
    pub status_ranges: Vec<StatusRange>,

    /// Ordered frequency problem rules, first match wins
    pub problem_rules: Vec<FrequencyProblemRule>,

    /// Band heuristics consulted when no frequency rule matches
    pub band_heuristics: Vec<BandHeuristic>,

    /// Capacity of the capture queue, in blocks
    pub queue_capacity_blocks: usize,

    /// Automatic stop after this many seconds of listening
    pub max_listen_secs: Option<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            block_length: 1024,
            window: WindowType::Hann,
            bands: default_bands(),
            status_ranges: default_status_ranges(),
            problem_rules: default_problem_rules(),
            band_heuristics: default_band_heuristics(),
            queue_capacity_blocks: 16,
            max_listen_secs: Some(5.0),
        }
    }
}

impl AnalysisConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: AnalysisConfig =
            toml::from_str(source).map_err(|e| AnalysisError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_sample_rate(self.sample_rate)?;
        validate_block_length(self.block_length)?;

        let mut names = HashSet::new();
        for band in &self.bands {
            band.validate()?;
            if !names.insert(band.name.as_str()) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "duplicate band name '{}'",
                    band.name
                )));
            }
        }

        for range in &self.status_ranges {
            range.validate()?;
        }
        for rule in &self.problem_rules {
            rule.validate()?;
        }
        for heuristic in &self.band_heuristics {
            heuristic.validate()?;
            for band in [&heuristic.loud_band, &heuristic.quiet_band] {
                if !names.contains(band.as_str()) {
                    return Err(AnalysisError::InvalidConfig(format!(
                        "band heuristic '{}' refers to unknown band '{}'",
                        heuristic.label, band
                    )));
                }
            }
        }

        if self.queue_capacity_blocks == 0 {
            return Err(AnalysisError::InvalidConfig(
                "queue_capacity_blocks must be at least 1".into(),
            ));
        }
        if let Some(secs) = self.max_listen_secs {
            let representable = Duration::try_from_secs_f64(secs).is_ok();
            if !(representable && secs > 0.0) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "max_listen_secs must be a positive duration, got {}",
                    secs
                )));
            }
        }

        Ok(())
    }

    /// Classifier built from this configuration's tables
    pub fn classifier(&self) -> Classifier {
        Classifier::new(
            self.status_ranges.clone(),
            self.problem_rules.clone(),
            self.band_heuristics.clone(),
        )
    }

    /// Listening limit; `None` when unset or not representable
    pub fn max_listen_duration(&self) -> Option<Duration> {
        self.max_listen_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// Bands that lie partly above Nyquist at `sample_rate`
    pub fn bands_above_nyquist(&self, sample_rate: f64) -> impl Iterator<Item = &BandDefinition> {
        let nyquist = sample_rate / 2.0;
        self.bands.iter().filter(move |band| band.high_hz > nyquist)
    }
}
