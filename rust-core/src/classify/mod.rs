//! Rule-based hive status classifier
//!
//! Status comes from the first matching frequency range (falling back to
//! `Normal`). The problem label is a separate, explanatory pass: first
//! matching frequency rule, then band heuristics, in configured order.

pub mod rules;

pub use rules::{BandHeuristic, FrequencyProblemRule, StatusRange};

use crate::config::{default_band_heuristics, default_problem_rules, default_status_ranges};
use crate::features::BandEnergies;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hive health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Normal,
    Warning,
    Critical,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Normal => "normal",
            Status::Warning => "warning",
            Status::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// Result of classifying one block
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub status: Status,
    pub problem: Option<String>,
}

/// Ordered, first-match-wins rule tables
#[derive(Debug, Clone, PartialEq)]
pub struct Classifier {
    status_ranges: Vec<StatusRange>,
    problem_rules: Vec<FrequencyProblemRule>,
    band_heuristics: Vec<BandHeuristic>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(
            default_status_ranges(),
            default_problem_rules(),
            default_band_heuristics(),
        )
    }
}

impl Classifier {
    pub fn new(
        status_ranges: Vec<StatusRange>,
        problem_rules: Vec<FrequencyProblemRule>,
        band_heuristics: Vec<BandHeuristic>,
    ) -> Self {
        Self {
            status_ranges,
            problem_rules,
            band_heuristics,
        }
    }

    /// Status for a dominant frequency; anything outside every range is `Normal`
    pub fn status_for(&self, dominant_frequency_hz: f64) -> Status {
        self.status_ranges
            .iter()
            .find(|range| range.contains(dominant_frequency_hz))
            .map_or(Status::Normal, |range| range.status)
    }

    /// Explanatory problem label, independent of the status
    pub fn problem_for(&self, dominant_frequency_hz: f64, energies: &BandEnergies) -> Option<&str> {
        self.problem_rules
            .iter()
            .find(|rule| rule.contains(dominant_frequency_hz))
            .map(|rule| rule.label.as_str())
            .or_else(|| {
                self.band_heuristics
                    .iter()
                    .find(|heuristic| heuristic.matches(energies))
                    .map(|heuristic| heuristic.label.as_str())
            })
    }

    pub fn classify(&self, dominant_frequency_hz: f64, energies: &BandEnergies) -> Classification {
        Classification {
            status: self.status_for(dominant_frequency_hz),
            problem: self
                .problem_for(dominant_frequency_hz, energies)
                .map(str::to_owned),
        }
    }

    pub fn status_ranges(&self) -> &[StatusRange] {
        &self.status_ranges
    }

    pub fn problem_rules(&self) -> &[FrequencyProblemRule] {
        &self.problem_rules
    }

    pub fn band_heuristics(&self) -> &[BandHeuristic] {
        &self.band_heuristics
    }
}
