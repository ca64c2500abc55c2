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

//! Built-in scorer classes

pub mod deterministic;
pub mod judged;

pub use deterministic::{
    ExactMatchMetric, JsonCorrectnessMetric, PatternMatchMetric, ToolCorrectnessMetric,
};
pub use judged::{Rubric, RubricScorer, RUBRICS};

use crate::resolver::ScorerLibrary;
use crate::scorer::Scorer;
use tracing::warn;

/// Register every built-in class; an already-registered name is kept
pub fn register_builtin(library: &mut ScorerLibrary) {
    let mut results = vec![
        library.register("ExactMatchMetric", |p, _| {
            Ok(Box::new(ExactMatchMetric::from_params(p)?) as Box<dyn Scorer>)
        }),
        library.register("PatternMatchMetric", |p, _| {
            Ok(Box::new(PatternMatchMetric::from_params(p)?) as Box<dyn Scorer>)
        }),
        library.register("JsonCorrectnessMetric", |p, _| {
            Ok(Box::new(JsonCorrectnessMetric::from_params(p)?) as Box<dyn Scorer>)
        }),
        library.register("ToolCorrectnessMetric", |p, _| {
            Ok(Box::new(ToolCorrectnessMetric::from_params(p)?) as Box<dyn Scorer>)
        }),
    ];

    for rubric in RUBRICS {
        results.push(library.register(rubric.class, move |p, c| {
            Ok(Box::new(RubricScorer::from_params(rubric, p, c)?) as Box<dyn Scorer>)
        }));
    }

    for err in results.into_iter().filter_map(Result::err) {
        warn!(error = %err, "Skipping built-in scorer");
    }
}
