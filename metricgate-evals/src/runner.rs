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

//! Execution engine
//!
//! Runs each metric selection through
//! `Pending -> Validating -> Resolving -> Executing -> Scored`, branching to a failed
//! terminal state at any step. Every selection ends in exactly one terminal state and
//! produces exactly one [`MetricResult`]; no failure aborts the remaining selections.
//!
//! Selections run strictly in order, and within a selection test cases run strictly in
//! order.

use crate::adapter::{adapt, AdapterError};
use crate::init_params::InitParams;
use crate::judge::JudgeModelConfig;
use crate::resolver::ScorerLibrary;
use crate::scorer::Scorer;
use crate::validation::{
    merge_init_params, undeclared_params, validate_init_params, validate_test_cases,
};
use futures::FutureExt;
use metricgate_core::{
    AggregationPolicy, CostSignal, Gap, MetricCatalogue, MetricDefinition, MetricError,
    MetricEvidence, MetricResult, MetricSelection, TestCase,
};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Init param that receives the judge model
pub const MODEL_PARAM: &str = "model";

/// Lifecycle of one metric selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricState {
    Pending,
    Validating,
    ValidationFailed,
    Resolving,
    ResolutionFailed,
    Executing,
    ExecutionFailed,
    Scored,
}

impl MetricState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MetricState::ValidationFailed
                | MetricState::ResolutionFailed
                | MetricState::ExecutionFailed
                | MetricState::Scored
        )
    }
}

impl fmt::Display for MetricState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricState::Pending => "PENDING",
            MetricState::Validating => "VALIDATING",
            MetricState::ValidationFailed => "VALIDATION_FAILED",
            MetricState::Resolving => "RESOLVING",
            MetricState::ResolutionFailed => "RESOLUTION_FAILED",
            MetricState::Executing => "EXECUTING",
            MetricState::ExecutionFailed => "EXECUTION_FAILED",
            MetricState::Scored => "SCORED",
        };
        f.write_str(name)
    }
}

struct Progress<'a> {
    metric_id: &'a str,
    state: MetricState,
}

impl<'a> Progress<'a> {
    fn new(metric_id: &'a str) -> Self {
        Self {
            metric_id,
            state: MetricState::Pending,
        }
    }

    fn advance(&mut self, next: MetricState) {
        debug!(metric_id = self.metric_id, from = %self.state, to = %next, "Metric state transition");
        self.state = next;
    }
}

/// Everything the runner produced for one request
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    /// One entry per selection, in selection order
    pub metric_results: Vec<MetricResult>,
    pub metric_evidence: Vec<MetricEvidence>,
    pub gaps: Vec<Gap>,
}

struct Scored {
    result: MetricResult,
    evidence: MetricEvidence,
}

/// Orchestrates validation, resolution, adaptation and scoring
pub struct EvaluationRunner {
    catalogue: Arc<MetricCatalogue>,
    library: Arc<ScorerLibrary>,
    judge_defaults: JudgeModelConfig,
    policy: AggregationPolicy,
}

impl EvaluationRunner {
    pub fn new(catalogue: Arc<MetricCatalogue>, library: Arc<ScorerLibrary>) -> Self {
        Self {
            catalogue,
            library,
            judge_defaults: JudgeModelConfig::default(),
            policy: AggregationPolicy::default(),
        }
    }

    pub fn with_judge_defaults(mut self, judge: JudgeModelConfig) -> Self {
        self.judge_defaults = judge;
        self
    }

    pub fn with_policy(mut self, policy: AggregationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn catalogue(&self) -> &Arc<MetricCatalogue> {
        &self.catalogue
    }

    /// Run every selection against every test case
    pub async fn run(&self, selections: &[MetricSelection], test_cases: &[TestCase]) -> RunOutcome {
        info!(
            metrics = selections.len(),
            test_cases = test_cases.len(),
            "Starting evaluation run"
        );

        let mut outcome = RunOutcome::default();
        for selection in selections {
            match self.run_metric(selection, test_cases, &mut outcome.gaps).await {
                Ok(scored) => {
                    outcome.metric_results.push(scored.result);
                    outcome.metric_evidence.push(scored.evidence);
                }
                Err(result) => outcome.metric_results.push(result),
            }
        }
        outcome
    }

    async fn run_metric(
        &self,
        selection: &MetricSelection,
        test_cases: &[TestCase],
        gaps: &mut Vec<Gap>,
    ) -> Result<Scored, MetricResult> {
        let metric_id = selection.metric_id.as_str();
        let mut progress = Progress::new(metric_id);

        let Some(definition) = self.catalogue.get(metric_id) else {
            let err = MetricError::UnknownMetric(metric_id.to_string());
            warn!(metric_id, category = err.category(), "Metric selection failed");
            return Err(MetricResult::failed(metric_id, metric_id, err.to_string()));
        };

        let mut params = merge_init_params(selection);
        if definition.optional_init_params.iter().any(|p| p == MODEL_PARAM)
            && params.get(MODEL_PARAM).map_or(true, |v| v.is_null())
        {
            params.insert(MODEL_PARAM.to_string(), self.judge_defaults.to_param());
        }

        progress.advance(MetricState::Validating);
        {
            let undeclared = undeclared_params(definition, &params);
            if !undeclared.is_empty() {
                warn!(metric_id, params = ?undeclared, "Init params not declared by the catalogue");
            }
        }
        if let Err(violations) = validate_init_params(definition, &params) {
            return Err(fail(
                &mut progress,
                definition,
                MetricState::ValidationFailed,
                MetricError::Validation(violations),
            ));
        }
        if let Err(violations) = validate_test_cases(definition, test_cases) {
            return Err(fail(
                &mut progress,
                definition,
                MetricState::ValidationFailed,
                MetricError::Validation(violations),
            ));
        }

        progress.advance(MetricState::Resolving);
        let cost_signal = if params.contains_key(MODEL_PARAM) {
            CostSignal::LlmBased
        } else {
            CostSignal::DeterministicOrUnknown
        };
        let params = InitParams::new(params);
        let resolved = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.library.instantiate(&definition.scorer_class, &params)
        }));
        let scorer = match resolved {
            Ok(Ok(scorer)) => scorer,
            Ok(Err(e)) => {
                return Err(fail(
                    &mut progress,
                    definition,
                    MetricState::ResolutionFailed,
                    MetricError::Resolution(e.to_string()),
                ));
            }
            Err(panic) => {
                let err = MetricError::Resolution(format!(
                    "{} init panicked: {}",
                    definition.scorer_class,
                    panic_message(panic.as_ref())
                ));
                return Err(fail(
                    &mut progress,
                    definition,
                    MetricState::ResolutionFailed,
                    err,
                ));
            }
        };

        progress.advance(MetricState::Executing);
        let executed = AssertUnwindSafe(self.execute(definition, scorer.as_ref(), test_cases, gaps))
            .catch_unwind()
            .await;

        match executed {
            Ok(Ok(mut scored)) => {
                scored.result.cost_signal = Some(cost_signal);
                progress.advance(MetricState::Scored);
                info!(
                    metric_id,
                    score = ?scored.result.score,
                    passed = ?scored.result.passed,
                    "Metric scored"
                );
                Ok(scored)
            }
            Ok(Err(err)) => Err(fail(&mut progress, definition, MetricState::ExecutionFailed, err)),
            Err(panic) => {
                let err = MetricError::execution("Panic", panic_message(panic.as_ref()));
                Err(fail(&mut progress, definition, MetricState::ExecutionFailed, err))
            }
        }
    }

    async fn execute(
        &self,
        definition: &MetricDefinition,
        scorer: &dyn Scorer,
        test_cases: &[TestCase],
        gaps: &mut Vec<Gap>,
    ) -> Result<Scored, MetricError> {
        if test_cases.is_empty() {
            return Err(MetricError::execution(
                "NoTestCases",
                "no test cases were submitted for this metric",
            ));
        }

        let mut outcomes: Vec<(f64, Option<String>)> = Vec::with_capacity(test_cases.len());
        let mut judge_cost: Option<f64> = None;

        for (index, case) in test_cases.iter().enumerate() {
            let adapted = match adapt(definition.test_case_kind, case) {
                Ok(adapted) => adapted,
                Err(AdapterError::UnsupportedKind(kind)) => {
                    let message = AdapterError::UnsupportedKind(kind).to_string();
                    gaps.push(Gap {
                        metric_id: definition.metric_id.clone(),
                        test_case_kind: kind,
                        gap: message,
                    });
                    return Err(MetricError::UnsupportedTestCaseKind {
                        metric_id: definition.metric_id.clone(),
                        kind: kind.to_string(),
                    });
                }
                Err(e) => return Err(MetricError::execution("AdapterError", e.to_string())),
            };

            let measurement = scorer
                .measure(&adapted)
                .await
                .map_err(|e| MetricError::execution(e.kind(), e.to_string()))?;

            let score = match measurement.score {
                Some(s) if s.is_finite() => s,
                Some(s) => {
                    return Err(MetricError::execution(
                        "InvalidScore",
                        format!("Metric returned a non-finite score ({}) for test case {}", s, index),
                    ))
                }
                None => {
                    return Err(MetricError::execution(
                        "MissingScore",
                        format!("Metric returned no score for test case {}", index),
                    ))
                }
            };

            if let Some(cost) = measurement.cost_usd {
                *judge_cost.get_or_insert(0.0) += cost;
            }
            outcomes.push((score, measurement.reason));
        }

        let scores: Vec<f64> = outcomes.iter().map(|(s, _)| *s).collect();
        let score = self.policy.score.apply(&scores).ok_or_else(|| {
            MetricError::execution("NoTestCases", "no scores to aggregate")
        })?;
        let threshold = scorer.threshold();
        let passed = threshold.map(|t| definition.threshold_semantics.passes(score, t));
        let reason = self
            .policy
            .reason
            .select(&outcomes, definition.threshold_semantics);

        let reasons: Vec<String> = outcomes
            .iter()
            .filter_map(|(_, r)| r.as_deref().map(str::trim).filter(|r| !r.is_empty()))
            .map(String::from)
            .collect();

        Ok(Scored {
            result: MetricResult {
                metric_id: definition.metric_id.clone(),
                metric_name: definition.metric_name.clone(),
                score: Some(score),
                threshold,
                passed,
                reason,
                error: None,
                cost_signal: None,
            },
            evidence: MetricEvidence::new(
                definition.metric_id.clone(),
                definition.scorer_class.clone(),
                scores,
                &reasons,
                judge_cost,
            ),
        })
    }
}

fn fail(
    progress: &mut Progress<'_>,
    definition: &MetricDefinition,
    state: MetricState,
    err: MetricError,
) -> MetricResult {
    progress.advance(state);
    warn!(
        metric_id = progress.metric_id,
        category = err.category(),
        error = %err,
        "Metric selection failed"
    );
    MetricResult::failed(&definition.metric_id, &definition.metric_name, err.to_string())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
