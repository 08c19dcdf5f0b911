//! Rule table entries for status and problem classification

use super::Status;
use crate::error::{AnalysisError, Result};
use crate::features::BandEnergies;
use serde::{Deserialize, Serialize};

fn check_interval(what: &str, low_hz: f64, high_hz: f64) -> Result<()> {
    if low_hz.is_finite() && high_hz.is_finite() && low_hz >= 0.0 && low_hz < high_hz {
        Ok(())
    } else {
        Err(AnalysisError::InvalidConfig(format!(
            "{} has invalid interval [{}, {}]",
            what, low_hz, high_hz
        )))
    }
}

/// Maps a frequency interval to a status
///
/// The interval is `[low_hz, high_hz)`, or `[low_hz, high_hz]` when
/// `include_high` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRange {
    pub low_hz: f64,
    pub high_hz: f64,
    pub status: Status,
    #[serde(default)]
    pub include_high: bool,
}

impl StatusRange {
    pub fn half_open(low_hz: f64, high_hz: f64, status: Status) -> Self {
        Self {
            low_hz,
            high_hz,
            status,
            include_high: false,
        }
    }

    pub fn closed(low_hz: f64, high_hz: f64, status: Status) -> Self {
        Self {
            low_hz,
            high_hz,
            status,
            include_high: true,
        }
    }

    pub fn contains(&self, freq_hz: f64) -> bool {
        freq_hz >= self.low_hz
            && (freq_hz < self.high_hz || (self.include_high && freq_hz == self.high_hz))
    }

    pub fn validate(&self) -> Result<()> {
        check_interval("status range", self.low_hz, self.high_hz)
    }
}

/// A closed frequency interval mapped to a problem label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyProblemRule {
    pub low_hz: f64,
    pub high_hz: f64,
    pub label: String,
}

impl FrequencyProblemRule {
    pub fn new(low_hz: f64, high_hz: f64, label: impl Into<String>) -> Self {
        Self {
            low_hz,
            high_hz,
            label: label.into(),
        }
    }

    pub fn contains(&self, freq_hz: f64) -> bool {
        freq_hz >= self.low_hz && freq_hz <= self.high_hz
    }

    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(AnalysisError::InvalidConfig("problem rule with empty label".into()));
        }
        check_interval(&format!("problem rule '{}'", self.label), self.low_hz, self.high_hz)
    }
}

/// Flags a problem when one band is loud while another stays quiet
///
/// Fires only when both bands are present in the energy map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandHeuristic {
    pub label: String,
    pub loud_band: String,
    pub loud_above_db: f64,
    pub quiet_band: String,
    pub quiet_below_db: f64,
}

impl BandHeuristic {
    pub fn matches(&self, energies: &BandEnergies) -> bool {
        match (energies.get(&self.loud_band), energies.get(&self.quiet_band)) {
            (Some(loud), Some(quiet)) => loud > self.loud_above_db && quiet < self.quiet_below_db,
            _ => false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(AnalysisError::InvalidConfig("band heuristic with empty label".into()));
        }
        if !(self.loud_above_db.is_finite() && self.quiet_below_db.is_finite()) {
            return Err(AnalysisError::InvalidConfig(format!(
                "band heuristic '{}' has non-finite thresholds",
                self.label
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_range_bounds() {
        let half = StatusRange::half_open(500.0, 700.0, Status::Warning);
        assert!(half.contains(500.0));
        assert!(half.contains(699.999));
        assert!(!half.contains(700.0));
        assert!(!half.contains(499.999));

        let closed = StatusRange::closed(700.0, 3600.0, Status::Critical);
        assert!(closed.contains(3600.0));
        assert!(!closed.contains(3600.001));
        assert!(!closed.contains(f64::NAN));
    }

    #[test]
    fn test_problem_rule_is_closed() {
        let rule = FrequencyProblemRule::new(500.0, 700.0, "Possible swarming");
        assert!(rule.contains(500.0));
        assert!(rule.contains(700.0));
        assert!(!rule.contains(700.5));
    }

    #[test]
    fn test_heuristic_requires_both_bands() {
        let heuristic = BandHeuristic {
            label: "Queen piping".into(),
            loud_band: "piping".into(),
            loud_above_db: -45.0,
            quiet_band: "low_hum".into(),
            quiet_below_db: -70.0,
        };

        let both: BandEnergies = [("piping", -30.0), ("low_hum", -80.0)].into_iter().collect();
        assert!(heuristic.matches(&both));

        let quiet_too_loud: BandEnergies =
            [("piping", -30.0), ("low_hum", -60.0)].into_iter().collect();
        assert!(!heuristic.matches(&quiet_too_loud));

        let missing: BandEnergies = [("piping", -30.0)].into_iter().collect();
        assert!(!heuristic.matches(&missing));
    }

    #[test]
    fn test_rule_validation() {
        assert!(StatusRange::half_open(0.0, 500.0, Status::Normal).validate().is_ok());
        assert!(StatusRange::half_open(500.0, 500.0, Status::Normal).validate().is_err());
        assert!(FrequencyProblemRule::new(10.0, 5.0, "x").validate().is_err());
        assert!(FrequencyProblemRule::new(5.0, 10.0, " ").validate().is_err());
        assert!(FrequencyProblemRule::new(5.0, f64::INFINITY, "x").validate().is_err());
    }
}
