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

// End-to-end evaluation runs: service + runner + built-in scorers + file evidence store

use async_trait::async_trait;
use metricgate_core::{
    DeploymentStage, EvaluateRequest, EvaluationContext, MetricCatalogue, MetricSelection,
    OverallStatus, RiskClass, RunConfig, RunEnvironment, RunMode, TestCase, TestCaseKind,
    UserImpact,
};
use metricgate_evals::{
    EvaluationRunner, EvaluationService, FixedClientConnector, LLMClient, LLMError,
    LLMResponse, ScorerLibrary, ServiceError, TokenUsage,
};
use metricgate_storage::FileEvidenceStore;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

const CATALOGUE: &str = r#"
eval_types:
  rag:
    metrics:
      - metric_id: rag.answer_relevancy
        metric_name: Answer Relevancy
        metric_class: AnswerRelevancyMetric
        test_case_type: LLMTestCase
        required_test_case_fields: [input, actual_output]
        optional_metric_init_params: [threshold, model, include_reason]
      - metric_id: rag.faithfulness
        metric_name: Faithfulness
        metric_class: FaithfulnessMetric
        test_case_type: LLMTestCase
        required_test_case_fields: [input, actual_output, retrieval_context]
        optional_metric_init_params: [threshold, model, include_reason]
  non_llm:
    metrics:
      - metric_id: non_llm.exact_match
        metric_name: Exact Match
        metric_class: ExactMatchMetric
        test_case_type: LLMTestCase
        required_test_case_fields: [actual_output, expected_output]
        optional_metric_init_params: [threshold]
      - metric_id: non_llm.pattern_match
        metric_name: Pattern Match
        metric_class: PatternMatchMetric
        test_case_type: LLMTestCase
        required_test_case_fields: [actual_output]
        required_metric_init_params: [pattern]
        optional_metric_init_params: [threshold, ignore_case]
      - metric_id: non_llm.mismatch_rate
        metric_name: Mismatch Rate
        metric_class: PatternMatchMetric
        test_case_type: LLMTestCase
        required_test_case_fields: [actual_output]
        required_metric_init_params: [pattern]
        optional_metric_init_params: [threshold]
        threshold_semantics: maximum_is_passing
  multiturn:
    metrics:
      - metric_id: multiturn.knowledge_retention
        metric_name: Knowledge Retention
        metric_class: KnowledgeRetentionMetric
        test_case_type: ConversationalTestCase
        optional_metric_init_params: [threshold, model, include_reason]
  multimodal:
    metrics:
      - metric_id: multimodal.image_editing
        metric_name: Image Editing
        metric_class: ImageCoherenceMetric
        test_case_type: LLMTestCase
        required_test_case_fields: [input, actual_output]
        optional_metric_init_params: [threshold, model]
        constraints:
          - input must contain exactly 1 image
"#;

/// Judge that always answers with the same verdict
struct MockLLMClient {
    score: f64,
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn evaluate(&self, _prompt: String) -> Result<LLMResponse, LLMError> {
        Ok(LLMResponse {
            content: json!({"score": self.score, "reason": "The answer addresses the question."})
                .to_string(),
            usage: TokenUsage {
                prompt_tokens: 200,
                completion_tokens: 20,
                total_tokens: 220,
            },
            model: "mock-judge".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "mock-judge"
    }

    fn cost_per_token(&self) -> (f64, f64) {
        (0.0, 0.0)
    }
}

struct Harness {
    service: EvaluationService,
    store: FileEvidenceStore,
    _dir: TempDir,
}

fn harness(judge_score: f64) -> Harness {
    let dir = TempDir::new().unwrap();
    let store = FileEvidenceStore::new(dir.path().join("artifacts"));
    let catalogue = Arc::new(MetricCatalogue::from_yaml_str(CATALOGUE).unwrap());
    let connector = Arc::new(FixedClientConnector::new(Arc::new(MockLLMClient {
        score: judge_score,
    })));
    let runner = EvaluationRunner::new(catalogue, Arc::new(ScorerLibrary::with_builtin(connector)));
    Harness {
        service: EvaluationService::new(runner, Arc::new(store.clone())),
        store,
        _dir: dir,
    }
}

fn request(metrics: Vec<MetricSelection>, test_cases: Vec<TestCase>) -> EvaluateRequest {
    EvaluateRequest {
        evaluation_object: "support-bot".into(),
        use_case: "refund-policy".into(),
        context: EvaluationContext {
            deployment_stage: DeploymentStage::Staging,
            risk_class: RiskClass::Medium,
            user_impact: UserImpact::CustomerFacing,
            domain: None,
        },
        run: RunConfig {
            mode: RunMode::OneOff,
            environment: RunEnvironment::Ci,
            baseline_run_id: None,
            budget: None,
        },
        metrics,
        test_cases,
    }
}

fn answered(input: &str, output: &str, expected: &str) -> TestCase {
    let mut case = TestCase::new(input, output);
    case.expected_output = Some(json!(expected));
    case
}

#[tokio::test]
async fn test_empty_selection_writes_no_evidence() {
    let h = harness(0.9);
    let err = h
        .service
        .evaluate(request(vec![], vec![TestCase::new("q", "a")]))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::NoMetricsSelected));
    assert!(h.store.list_run_ids().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_metric_gets_single_error_entry() {
    let h = harness(0.9);
    let response = h
        .service
        .evaluate(request(
            vec![
                MetricSelection::new("rag.does_not_exist"),
                MetricSelection::new("non_llm.exact_match").with_threshold(1.0),
            ],
            vec![answered("q", "Paris", "Paris")],
        ))
        .await
        .unwrap();

    assert_eq!(response.metric_results.len(), 2);
    let unknown: Vec<_> = response
        .metric_results
        .iter()
        .filter(|r| r.metric_id == "rag.does_not_exist")
        .collect();
    assert_eq!(unknown.len(), 1);
    assert!(unknown[0].score.is_none());
    assert!(unknown[0].error.as_deref().unwrap().contains("rag.does_not_exist"));

    assert_eq!(response.metric_results[1].passed, Some(true));
    assert_eq!(response.overall_status, OverallStatus::Warning);
}

#[tokio::test]
async fn test_threshold_boundaries_are_inclusive() {
    let h = harness(0.9);
    let cases = vec![
        TestCase::new("q", "yes"),
        TestCase::new("q", "no"),
    ];
    let response = h
        .service
        .evaluate(request(
            vec![
                MetricSelection::new("non_llm.pattern_match")
                    .with_threshold(0.5)
                    .with_param("pattern", json!("yes")),
                MetricSelection::new("non_llm.mismatch_rate")
                    .with_threshold(0.5)
                    .with_param("pattern", json!("no")),
            ],
            cases,
        ))
        .await
        .unwrap();

    for result in &response.metric_results {
        assert_eq!(result.score, Some(0.5), "{}", result.metric_id);
        assert_eq!(result.passed, Some(true), "{}", result.metric_id);
    }
    assert_eq!(response.overall_status, OverallStatus::Pass);
}

#[tokio::test]
async fn test_maximum_is_passing_fails_above_threshold() {
    let h = harness(0.9);
    let response = h
        .service
        .evaluate(request(
            vec![MetricSelection::new("non_llm.mismatch_rate")
                .with_threshold(0.2)
                .with_param("pattern", json!("no"))],
            vec![TestCase::new("q", "no")],
        ))
        .await
        .unwrap();

    assert_eq!(response.metric_results[0].passed, Some(false));
    assert_eq!(response.overall_status, OverallStatus::Fail);
}

#[tokio::test]
async fn test_repeated_request_is_idempotent() {
    let h = harness(0.9);
    let make = || {
        request(
            vec![MetricSelection::new("non_llm.exact_match").with_threshold(1.0)],
            vec![answered("q", "Paris", "Paris"), answered("q", "Lyon", "Paris")],
        )
    };

    let first = h.service.evaluate(make()).await.unwrap();
    let second = h.service.evaluate(make()).await.unwrap();

    assert_ne!(first.run_id, second.run_id);
    assert_ne!(first.evidence_pointer, second.evidence_pointer);
    assert_eq!(first.metric_results, second.metric_results);
    assert_eq!(h.store.list_run_ids().unwrap().len(), 2);

    let stored = h.store.load(&first.run_id).unwrap();
    assert_eq!(stored.metric_results, first.metric_results);
    assert_eq!(stored.metric_evidence[0].scores, vec![1.0, 0.0]);
}

#[tokio::test]
async fn test_missing_init_param_is_isolated() {
    let h = harness(0.9);
    let response = h
        .service
        .evaluate(request(
            vec![
                MetricSelection::new("non_llm.pattern_match").with_threshold(0.5),
                MetricSelection::new("non_llm.exact_match").with_threshold(1.0),
            ],
            vec![answered("q", "Paris", "Paris")],
        ))
        .await
        .unwrap();

    let broken = &response.metric_results[0];
    assert!(broken.score.is_none());
    assert!(broken.error.as_deref().unwrap().contains("[pattern]"));

    let healthy = &response.metric_results[1];
    assert_eq!(healthy.score, Some(1.0));
    assert_eq!(healthy.passed, Some(true));
    assert!(healthy.error.is_none());
}

#[tokio::test]
async fn test_answer_relevancy_passes() {
    let h = harness(0.85);
    let response = h
        .service
        .evaluate(request(
            vec![MetricSelection::new("rag.answer_relevancy").with_threshold(0.7)],
            vec![TestCase::new(
                "How long do refunds take?",
                "Refunds are processed within 5 business days.",
            )],
        ))
        .await
        .unwrap();

    let result = &response.metric_results[0];
    assert_eq!(result.metric_name, "Answer Relevancy");
    assert_eq!(result.score, Some(0.85));
    assert_eq!(result.threshold, Some(0.7));
    assert_eq!(result.passed, Some(true));
    assert_eq!(response.overall_status, OverallStatus::Pass);

    let stored = h.store.load(&response.run_id).unwrap();
    assert_eq!(stored.metric_evidence[0].scorer_class, "AnswerRelevancyMetric");
    assert_eq!(
        stored.metric_evidence[0].reasons,
        vec!["The answer addresses the question."]
    );
}

#[tokio::test]
async fn test_missing_retrieval_context_gives_warning() {
    let h = harness(0.85);
    let response = h
        .service
        .evaluate(request(
            vec![
                MetricSelection::new("rag.faithfulness").with_threshold(0.7),
                MetricSelection::new("rag.answer_relevancy").with_threshold(0.7),
            ],
            vec![TestCase::new("q", "a")],
        ))
        .await
        .unwrap();

    assert_eq!(response.overall_status, OverallStatus::Warning);

    let failing = &response.metric_results[0];
    assert!(failing.score.is_none());
    assert!(failing.error.as_deref().unwrap().contains("retrieval_context"));

    let passing = &response.metric_results[1];
    assert_eq!(passing.score, Some(0.85));
    assert_eq!(passing.passed, Some(true));
}

#[tokio::test]
async fn test_conversational_metric_recorded_as_gap() {
    let h = harness(0.9);
    let response = h
        .service
        .evaluate(request(
            vec![MetricSelection::new("multiturn.knowledge_retention")],
            vec![TestCase::new("q", "a")],
        ))
        .await
        .unwrap();

    let result = &response.metric_results[0];
    assert!(result.score.is_none());
    assert!(result.error.as_deref().unwrap().contains("not supported"));
    assert_eq!(response.overall_status, OverallStatus::Warning);

    let stored = h.store.load(&response.run_id).unwrap();
    assert_eq!(stored.gaps.len(), 1);
    assert_eq!(stored.gaps[0].metric_id, "multiturn.knowledge_retention");
    assert_eq!(stored.gaps[0].test_case_kind, TestCaseKind::Conversational);
    assert!(stored.metric_evidence.is_empty());
}

#[tokio::test]
async fn test_image_constraint_blocks_execution() {
    let h = harness(0.9);
    let mut case = TestCase::new("Remove the background", "Done");
    case.image_inputs = Some(json!([]));

    let response = h
        .service
        .evaluate(request(
            vec![MetricSelection::new("multimodal.image_editing")],
            vec![case],
        ))
        .await
        .unwrap();

    let error = response.metric_results[0].error.as_deref().unwrap();
    assert!(error.contains("multimodal.image_editing"));
    assert!(error.contains("expected 1, got 0"));

    let stored = h.store.load(&response.run_id).unwrap();
    assert!(stored.metric_evidence.is_empty());
    assert!(stored.gaps.is_empty());
}
