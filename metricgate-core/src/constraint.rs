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

//! Structured constraint grammar
//!
//! Catalogue constraints are free text. They are parsed once, at catalogue load, into
//! a closed set of variants. Currently recognised:
//!
//! ```text
//! <subject> must contain exactly <N> image|images
//! ```
//!
//! `input` maps to `image_inputs`, `actual_output` maps to `image_outputs`, and any
//! subject that already names a test-case field is used directly. Text outside the
//! grammar becomes [`Constraint::Unrecognized`], which never blocks a run.

use crate::test_case::{TestCase, TEST_CASE_FIELDS};
use serde::{Deserialize, Serialize};

/// A schema-declared precondition on a test case's shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    /// `field` must hold exactly `count` image references
    ImageCount {
        field: String,
        count: usize,
        text: String,
    },
    /// Outside the grammar; always satisfied
    Unrecognized { text: String },
}

/// A failed constraint check against one test case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintViolation {
    pub text: String,
    pub field: String,
    pub expected: usize,
    pub actual: usize,
}

impl Constraint {
    /// Parse constraint text into its structured form
    pub fn parse(text: &str) -> Self {
        match parse_image_count(text) {
            Some((field, count)) => Constraint::ImageCount {
                field,
                count,
                text: text.trim().to_string(),
            },
            None => Constraint::Unrecognized {
                text: text.trim().to_string(),
            },
        }
    }

    /// The original constraint text from the catalogue
    pub fn text(&self) -> &str {
        match self {
            Constraint::ImageCount { text, .. } => text,
            Constraint::Unrecognized { text } => text,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Constraint::Unrecognized { .. })
    }

    /// Evaluate against a test case; `None` means satisfied
    pub fn check(&self, case: &TestCase) -> Option<ConstraintViolation> {
        match self {
            Constraint::ImageCount { field, count, text } => {
                let actual = case.item_count(field);
                (actual != *count).then(|| ConstraintViolation {
                    text: text.clone(),
                    field: field.clone(),
                    expected: *count,
                    actual,
                })
            }
            Constraint::Unrecognized { .. } => None,
        }
    }
}

fn parse_image_count(text: &str) -> Option<(String, usize)> {
    let lower = text.trim().to_lowercase();
    let (head, tail) = lower.split_once("exactly")?;

    let subject = head.trim_end().strip_suffix("must contain")?.trim();
    let field = subject_field(subject)?;

    let mut tokens = tail.split_whitespace();
    let count: usize = tokens.next()?.parse().ok()?;
    let unit = tokens
        .next()?
        .trim_end_matches(|c: char| c.is_ascii_punctuation());
    if unit != "image" && unit != "images" {
        return None;
    }
    // Anything after the unit token puts the sentence outside the grammar.
    if tokens.next().is_some() {
        return None;
    }

    Some((field, count))
}

fn subject_field(subject: &str) -> Option<String> {
    match subject {
        "input" => Some("image_inputs".to_string()),
        "actual_output" | "output" => Some("image_outputs".to_string()),
        other if TEST_CASE_FIELDS.contains(&other) => Some(other.to_string()),
        _ => None,
    }
}
