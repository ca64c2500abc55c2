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

//! Metric schema registry
//!
//! Loads the declarative metric catalogue (YAML) once at startup and indexes it by
//! `metric_id`. Loading is all-or-nothing: a malformed document or an entry missing a
//! required field fails the whole load and no partial index is published. After load
//! the catalogue is immutable and is shared read-only (usually behind an `Arc`).

use crate::constraint::Constraint;
use crate::error::CatalogueError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Shape of test case a scorer consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestCaseKind {
    SingleTurn,
    Conversational,
    Arena,
}

impl TestCaseKind {
    /// Accepts both the snake_case names and the scorer-library class names
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "single_turn" | "LLMTestCase" => Some(TestCaseKind::SingleTurn),
            "conversational" | "ConversationalTestCase" => Some(TestCaseKind::Conversational),
            "arena" | "ArenaTestCase" => Some(TestCaseKind::Arena),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestCaseKind::SingleTurn => "single_turn",
            TestCaseKind::Conversational => "conversational",
            TestCaseKind::Arena => "arena",
        }
    }
}

impl fmt::Display for TestCaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pass/fail polarity of a metric's threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdSemantics {
    /// score >= threshold passes
    #[default]
    MinimumIsPassing,
    /// score <= threshold passes
    MaximumIsPassing,
}

impl ThresholdSemantics {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "minimum_is_passing" => Some(ThresholdSemantics::MinimumIsPassing),
            "maximum_is_passing" => Some(ThresholdSemantics::MaximumIsPassing),
            _ => None,
        }
    }

    /// Boundary inclusive in both directions
    pub fn passes(&self, score: f64, threshold: f64) -> bool {
        match self {
            ThresholdSemantics::MinimumIsPassing => score >= threshold,
            ThresholdSemantics::MaximumIsPassing => score <= threshold,
        }
    }
}

/// Immutable capability descriptor for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub metric_id: String,
    pub metric_name: String,
    pub category: String,
    pub scorer_class: String,
    pub test_case_kind: TestCaseKind,
    pub required_test_case_fields: Vec<String>,
    pub required_init_params: Vec<String>,
    pub optional_init_params: Vec<String>,
    pub threshold_semantics: ThresholdSemantics,
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub conditional_fields: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl MetricDefinition {
    /// True when the scorer constructor accepts `name` (required or optional)
    pub fn accepts_param(&self, name: &str) -> bool {
        self.required_init_params.iter().any(|p| p == name)
            || self.optional_init_params.iter().any(|p| p == name)
    }
}

#[derive(Debug, Deserialize)]
struct RawCatalogue {
    #[serde(default)]
    eval_types: Option<BTreeMap<String, RawCategory>>,
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    #[serde(default)]
    metrics: Option<Vec<RawMetricEntry>>,
}

#[derive(Debug, Deserialize)]
struct RawMetricEntry {
    metric_id: Option<String>,
    metric_name: Option<String>,
    #[serde(alias = "scorer_class")]
    metric_class: Option<String>,
    #[serde(alias = "test_case_kind")]
    test_case_type: Option<String>,
    required_test_case_fields: Option<Vec<String>>,
    #[serde(alias = "required_init_params")]
    required_metric_init_params: Option<Vec<String>>,
    #[serde(alias = "optional_init_params")]
    optional_metric_init_params: Option<Vec<String>>,
    threshold_semantics: Option<String>,
    constraints: Option<Vec<String>>,
    conditional_fields: Option<Vec<String>>,
    notes: Option<Vec<String>>,
    aliases: Option<Vec<String>>,
}

fn required(
    value: Option<String>,
    category: &str,
    index: usize,
    field: &'static str,
) -> Result<String, CatalogueError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(CatalogueError::MissingField {
            category: category.to_string(),
            index,
            field,
        }),
    }
}

impl RawMetricEntry {
    fn into_definition(
        self,
        category: &str,
        index: usize,
    ) -> Result<MetricDefinition, CatalogueError> {
        let metric_id = required(self.metric_id, category, index, "metric_id")?;
        let scorer_class = required(self.metric_class, category, index, "metric_class")?;
        let kind_raw = required(self.test_case_type, category, index, "test_case_type")?;

        let test_case_kind =
            TestCaseKind::parse(&kind_raw).ok_or_else(|| CatalogueError::InvalidValue {
                category: category.to_string(),
                index,
                field: "test_case_type",
                value: kind_raw.clone(),
            })?;

        let threshold_semantics = match self.threshold_semantics {
            None => ThresholdSemantics::default(),
            Some(raw) => {
                ThresholdSemantics::parse(&raw).ok_or_else(|| CatalogueError::InvalidValue {
                    category: category.to_string(),
                    index,
                    field: "threshold_semantics",
                    value: raw.clone(),
                })?
            }
        };

        let constraints: Vec<Constraint> = self
            .constraints
            .unwrap_or_default()
            .iter()
            .map(|text| Constraint::parse(text))
            .collect();
        for c in constraints.iter().filter(|c| !c.is_recognized()) {
            warn!(
                metric_id = %metric_id,
                constraint = c.text(),
                "Unrecognized constraint will always be treated as satisfied"
            );
        }

        Ok(MetricDefinition {
            metric_name: self
                .metric_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| metric_id.clone()),
            metric_id,
            category: category.to_string(),
            scorer_class,
            test_case_kind,
            required_test_case_fields: self.required_test_case_fields.unwrap_or_default(),
            required_init_params: self.required_metric_init_params.unwrap_or_default(),
            optional_init_params: self.optional_metric_init_params.unwrap_or_default(),
            threshold_semantics,
            constraints,
            conditional_fields: self.conditional_fields.unwrap_or_default(),
            notes: self.notes.unwrap_or_default(),
            aliases: self.aliases.unwrap_or_default(),
        })
    }
}

/// Read-only index of metric definitions keyed by `metric_id`
#[derive(Debug, Clone, Default)]
pub struct MetricCatalogue {
    metrics: BTreeMap<String, MetricDefinition>,
    /// Normalized label -> metric_id
    names: BTreeMap<String, String>,
}

impl MetricCatalogue {
    /// Load and index a catalogue file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogueError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CatalogueError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalogue = Self::from_yaml_str(&content)?;
        info!(
            path = %path.display(),
            metrics = catalogue.len(),
            "Loaded metric catalogue"
        );
        Ok(catalogue)
    }

    /// Parse and index a catalogue document
    pub fn from_yaml_str(content: &str) -> Result<Self, CatalogueError> {
        let raw: RawCatalogue = serde_yaml::from_str(content)?;

        let mut definitions = Vec::new();
        for (category, body) in raw.eval_types.unwrap_or_default() {
            for (index, entry) in body.metrics.unwrap_or_default().into_iter().enumerate() {
                definitions.push(entry.into_definition(&category, index)?);
            }
        }

        Self::from_definitions(definitions)
    }

    /// Index already-built definitions, rejecting duplicate ids
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = MetricDefinition>,
    ) -> Result<Self, CatalogueError> {
        let mut metrics = BTreeMap::new();
        for def in definitions {
            if metrics.contains_key(&def.metric_id) {
                return Err(CatalogueError::DuplicateMetric(def.metric_id));
            }
            metrics.insert(def.metric_id.clone(), def);
        }

        let mut names = BTreeMap::new();
        for def in metrics.values() {
            let labels = std::iter::once(&def.metric_name)
                .chain(std::iter::once(&def.metric_id))
                .chain(def.aliases.iter());
            for label in labels {
                let normalized = label.trim().to_lowercase();
                names
                    .entry(normalized.replace(' ', "_"))
                    .or_insert_with(|| def.metric_id.clone());
                names
                    .entry(normalized)
                    .or_insert_with(|| def.metric_id.clone());
            }
        }

        Ok(Self { metrics, names })
    }

    pub fn get(&self, metric_id: &str) -> Option<&MetricDefinition> {
        self.metrics.get(metric_id)
    }

    pub fn contains(&self, metric_id: &str) -> bool {
        self.metrics.contains_key(metric_id)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Definitions in `metric_id` order
    pub fn iter(&self) -> impl Iterator<Item = &MetricDefinition> {
        self.metrics.values()
    }

    /// Map a human-readable label to a `metric_id`
    ///
    /// Tries an exact (case-insensitive) match, then the underscore form, then a
    /// containment match in lexical key order.
    pub fn resolve_name(&self, name: &str) -> Option<&str> {
        let normalized = name.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }

        if let Some(id) = self.names.get(&normalized) {
            return Some(id);
        }
        if let Some(id) = self.names.get(&normalized.replace(' ', "_")) {
            return Some(id);
        }

        self.names
            .iter()
            .find(|(label, _)| label.contains(&normalized) || normalized.contains(label.as_str()))
            .map(|(_, id)| id.as_str())
    }
}
