// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Per-metric aggregation of test-case scores and reasons

use crate::catalogue::ThresholdSemantics;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How per-test-case scores collapse into the metric's score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreAggregation {
    #[default]
    Mean,
    Min,
    Max,
    Median,
}

impl ScoreAggregation {
    /// `None` for an empty slice
    pub fn apply(&self, scores: &[f64]) -> Option<f64> {
        if scores.is_empty() {
            return None;
        }
        let value = match self {
            ScoreAggregation::Mean => scores.iter().sum::<f64>() / scores.len() as f64,
            ScoreAggregation::Min => scores.iter().copied().fold(f64::INFINITY, f64::min),
            ScoreAggregation::Max => scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            ScoreAggregation::Median => {
                let mut sorted = scores.to_vec();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
        };
        Some(value)
    }
}

impl FromStr for ScoreAggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mean" => Ok(ScoreAggregation::Mean),
            "min" => Ok(ScoreAggregation::Min),
            "max" => Ok(ScoreAggregation::Max),
            "median" => Ok(ScoreAggregation::Median),
            other => Err(format!("unknown score aggregation '{}'", other)),
        }
    }
}

impl fmt::Display for ScoreAggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScoreAggregation::Mean => "mean",
            ScoreAggregation::Min => "min",
            ScoreAggregation::Max => "max",
            ScoreAggregation::Median => "median",
        };
        f.write_str(name)
    }
}

/// Which test case's reason represents the metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonSelection {
    #[default]
    FirstNonEmpty,
    /// Reason of the case furthest on the failing side of the threshold polarity
    WorstCase,
}

impl ReasonSelection {
    /// Pick a representative reason from `(score, reason)` pairs in test-case order
    pub fn select(
        &self,
        outcomes: &[(f64, Option<String>)],
        semantics: ThresholdSemantics,
    ) -> Option<String> {
        let non_empty = outcomes
            .iter()
            .filter_map(|(score, reason)| {
                reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(|r| (*score, r))
            });

        match self {
            ReasonSelection::FirstNonEmpty => non_empty.map(|(_, r)| r.to_string()).next(),
            ReasonSelection::WorstCase => {
                let mut worst: Option<(f64, &str)> = None;
                for (score, reason) in non_empty {
                    let replace = match worst {
                        None => true,
                        Some((best, _)) => match semantics {
                            ThresholdSemantics::MinimumIsPassing => score < best,
                            ThresholdSemantics::MaximumIsPassing => score > best,
                        },
                    };
                    if replace {
                        worst = Some((score, reason));
                    }
                }
                worst.map(|(_, r)| r.to_string())
            }
        }
    }
}

impl FromStr for ReasonSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first_non_empty" => Ok(ReasonSelection::FirstNonEmpty),
            "worst_case" => Ok(ReasonSelection::WorstCase),
            other => Err(format!("unknown reason selection '{}'", other)),
        }
    }
}

/// Aggregation policy applied by the runner to every metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregationPolicy {
    #[serde(default)]
    pub score: ScoreAggregation,
    #[serde(default)]
    pub reason: ReasonSelection,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_aggregation() {
        let scores = [0.2, 0.9, 0.4, 0.5];
        assert!((ScoreAggregation::Mean.apply(&scores).unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(ScoreAggregation::Min.apply(&scores), Some(0.2));
        assert_eq!(ScoreAggregation::Max.apply(&scores), Some(0.9));
        assert!((ScoreAggregation::Median.apply(&scores).unwrap() - 0.45).abs() < 1e-9);
        assert_eq!(ScoreAggregation::Median.apply(&[0.3, 0.1, 0.2]), Some(0.2));
        assert_eq!(ScoreAggregation::Mean.apply(&[]), None);
    }

    #[test]
    fn test_first_non_empty_skips_blank_reasons() {
        let outcomes = vec![
            (0.9, None),
            (0.1, Some("   ".to_string())),
            (0.5, Some(" relevant ".to_string())),
            (0.2, Some("later".to_string())),
        ];
        let reason = ReasonSelection::FirstNonEmpty
            .select(&outcomes, ThresholdSemantics::MinimumIsPassing);
        assert_eq!(reason.as_deref(), Some("relevant"));
    }

    #[test]
    fn test_worst_case_follows_polarity() {
        let outcomes = vec![
            (0.9, Some("high".to_string())),
            (0.1, Some("low".to_string())),
            (0.5, Some("mid".to_string())),
        ];
        assert_eq!(
            ReasonSelection::WorstCase
                .select(&outcomes, ThresholdSemantics::MinimumIsPassing)
                .as_deref(),
            Some("low")
        );
        assert_eq!(
            ReasonSelection::WorstCase
                .select(&outcomes, ThresholdSemantics::MaximumIsPassing)
                .as_deref(),
            Some("high")
        );
        assert_eq!(
            ReasonSelection::WorstCase.select(&[(0.3, None)], ThresholdSemantics::MinimumIsPassing),
            None
        );
    }

    #[test]
    fn test_parse_policy_names() {
        assert_eq!("Median".parse::<ScoreAggregation>(), Ok(ScoreAggregation::Median));
        assert!("mode".parse::<ScoreAggregation>().is_err());
        assert_eq!(
            "worst_case".parse::<ReasonSelection>(),
            Ok(ReasonSelection::WorstCase)
        );
    }
}
