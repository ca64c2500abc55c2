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

// The catalogue shipped with the server must load and resolve against the built-in scorers

use metricgate_core::{MetricCatalogue, TestCaseKind, ThresholdSemantics};
use metricgate_evals::{JudgeModelConfig, OpenAICompatibleConnector, ScorerLibrary};
use std::path::PathBuf;
use std::sync::Arc;

fn shipped_catalogue() -> MetricCatalogue {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("catalogue")
        .join("metrics.schema.yaml");
    MetricCatalogue::load(path).unwrap()
}

#[test]
fn test_every_shipped_metric_has_a_scorer() {
    let catalogue = shipped_catalogue();
    let library = ScorerLibrary::with_builtin(Arc::new(OpenAICompatibleConnector::new(
        JudgeModelConfig::default(),
    )));

    let missing: Vec<&str> = catalogue
        .iter()
        .filter(|def| !library.contains(&def.scorer_class))
        .map(|def| def.metric_id.as_str())
        .collect();
    assert!(missing.is_empty(), "unresolvable metrics: {:?}", missing);
}

#[test]
fn test_shipped_catalogue_shape() {
    let catalogue = shipped_catalogue();

    let relevancy = catalogue.get("rag.answer_relevancy").unwrap();
    assert_eq!(relevancy.category, "rag");
    assert_eq!(relevancy.test_case_kind, TestCaseKind::SingleTurn);
    assert!(relevancy.optional_init_params.iter().any(|p| p == "model"));

    let toxicity = catalogue.get("safety.toxicity").unwrap();
    assert_eq!(toxicity.threshold_semantics, ThresholdSemantics::MaximumIsPassing);

    let retention = catalogue.get("multiturn.knowledge_retention").unwrap();
    assert_eq!(retention.test_case_kind, TestCaseKind::Conversational);

    let text_to_image = catalogue.get("multimodal.text_to_image").unwrap();
    assert!(text_to_image.constraints.iter().all(|c| c.is_recognized()));

    assert_eq!(catalogue.resolve_name("Faithfulness"), Some("rag.faithfulness"));
    assert_eq!(catalogue.resolve_name("pii"), Some("safety.pii_leakage"));
}
