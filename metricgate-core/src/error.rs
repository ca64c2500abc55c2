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

//! Error taxonomy shared across metricgate crates
//!
//! Only [`CatalogueError`] is fatal at startup and only [`PersistenceError`] is fatal for
//! a request. Every [`MetricError`] is reported inside the metric's result entry.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Maximum number of validation violations rendered into a result's error string
pub const MAX_REPORTED_VIOLATIONS: usize = 5;

/// Errors raised while loading the metric catalogue
#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("failed to read catalogue {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed catalogue document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("catalogue entry {category}[{index}] is missing required field '{field}'")]
    MissingField {
        category: String,
        index: usize,
        field: &'static str,
    },

    #[error("catalogue entry {category}[{index}] has invalid {field}: '{value}'")]
    InvalidValue {
        category: String,
        index: usize,
        field: &'static str,
        value: String,
    },

    #[error("duplicate metric_id '{0}' in catalogue")]
    DuplicateMetric(String),
}

/// Collected validation violations for one metric selection
///
/// Renders the first [`MAX_REPORTED_VIOLATIONS`] entries joined by `"; "`, followed by a
/// `" ..."` marker when more were collected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(Vec<String>);

impl Violations {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, violation: impl Into<String>) {
        self.0.push(violation.into());
    }

    pub fn extend(&mut self, other: Violations) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// True when more violations exist than are rendered
    pub fn is_truncated(&self) -> bool {
        self.0.len() > MAX_REPORTED_VIOLATIONS
    }
}

impl From<Vec<String>> for Violations {
    fn from(v: Vec<String>) -> Self {
        Self(v)
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown: Vec<&str> = self
            .0
            .iter()
            .take(MAX_REPORTED_VIOLATIONS)
            .map(String::as_str)
            .collect();
        write!(f, "{}", shown.join("; "))?;
        if self.is_truncated() {
            write!(f, " ...")?;
        }
        Ok(())
    }
}

/// Terminal failure of a single metric selection
///
/// None of these abort the run; the runner turns each into `MetricResult.error`.
#[derive(Debug, Clone, Error)]
pub enum MetricError {
    #[error("Unknown metric_id '{0}' (not found in catalogue).")]
    UnknownMetric(String),

    #[error("{0}")]
    Validation(Violations),

    #[error("Scorer resolution failed: {0}")]
    Resolution(String),

    #[error("{kind} test cases are not supported in this version (metric {metric_id})")]
    UnsupportedTestCaseKind { metric_id: String, kind: String },

    #[error("Execution failed: {kind}: {message}")]
    Execution { kind: String, message: String },
}

impl MetricError {
    pub fn execution(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Short machine-readable category, used in logs
    pub fn category(&self) -> &'static str {
        match self {
            MetricError::UnknownMetric(_) => "unknown_metric",
            MetricError::Validation(_) => "validation",
            MetricError::Resolution(_) => "resolution",
            MetricError::UnsupportedTestCaseKind { .. } => "unsupported_test_case_kind",
            MetricError::Execution { .. } => "execution",
        }
    }
}

/// Evidence write failures; these abort the request because the run has no audit trail
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("evidence I/O failed at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize evidence: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("evidence for run '{0}' already exists")]
    AlreadyExists(String),

    #[error("invalid run id '{0}'")]
    InvalidRunId(String),

    #[error("no evidence stored for run '{0}'")]
    NotFound(String),
}
