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

//! Metric resolver
//!
//! Maps a catalogue `scorer_class` to a registered constructor. The library is
//! populated once at startup and is read-only afterwards.

use crate::init_params::InitParams;
use crate::judge::JudgeConnector;
use crate::scorer::{Scorer, ScorerError};
use crate::scorers;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Constructor for one scorer class
pub type ScorerFactory =
    Arc<dyn Fn(&InitParams, &dyn JudgeConnector) -> Result<Box<dyn Scorer>, ScorerError> + Send + Sync>;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no scorer registered for class '{0}'")]
    UnknownClass(String),

    #[error("{class} init failed: {kind}: {source}")]
    Init {
        class: String,
        kind: &'static str,
        #[source]
        source: ScorerError,
    },
}

#[derive(Debug, Error)]
#[error("scorer class '{0}' is already registered")]
pub struct DuplicateClass(pub String);

/// Registered-factory table of scorer classes
pub struct ScorerLibrary {
    factories: HashMap<String, ScorerFactory>,
    connector: Arc<dyn JudgeConnector>,
}

impl ScorerLibrary {
    /// Empty library; judged scorers obtain clients from `connector`
    pub fn new(connector: Arc<dyn JudgeConnector>) -> Self {
        Self {
            factories: HashMap::new(),
            connector,
        }
    }

    /// Library with every built-in scorer class registered
    pub fn with_builtin(connector: Arc<dyn JudgeConnector>) -> Self {
        let mut library = Self::new(connector);
        scorers::register_builtin(&mut library);
        library
    }

    pub fn register<F>(&mut self, class: impl Into<String>, factory: F) -> Result<(), DuplicateClass>
    where
        F: Fn(&InitParams, &dyn JudgeConnector) -> Result<Box<dyn Scorer>, ScorerError>
            + Send
            + Sync
            + 'static,
    {
        let class = class.into();
        if self.factories.contains_key(&class) {
            return Err(DuplicateClass(class));
        }
        debug!(class = %class, "Registering scorer class");
        self.factories.insert(class, Arc::new(factory));
        Ok(())
    }

    pub fn contains(&self, class: &str) -> bool {
        self.factories.contains_key(class)
    }

    /// Registered class names, sorted
    pub fn classes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn resolve(&self, class: &str) -> Result<ScorerFactory, ResolveError> {
        self.factories
            .get(class)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownClass(class.to_string()))
    }

    /// Resolve and construct in one step
    pub fn instantiate(
        &self,
        class: &str,
        params: &InitParams,
    ) -> Result<Box<dyn Scorer>, ResolveError> {
        let factory = self.resolve(class)?;
        factory(params, self.connector.as_ref()).map_err(|source| ResolveError::Init {
            class: class.to_string(),
            kind: source.kind(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::LlmTestCase;
    use crate::judge::OpenAICompatibleConnector;
    use crate::scorer::Measurement;
    use async_trait::async_trait;
    use serde_json::{json, Map};

    struct Constant(f64);

    #[async_trait]
    impl Scorer for Constant {
        fn class_name(&self) -> &str {
            "ConstantMetric"
        }
        fn threshold(&self) -> Option<f64> {
            None
        }
        async fn measure(&self, _case: &LlmTestCase) -> Result<Measurement, ScorerError> {
            Ok(Measurement::scored(self.0, "constant"))
        }
    }

    fn empty_library() -> ScorerLibrary {
        ScorerLibrary::new(Arc::new(OpenAICompatibleConnector::new(Default::default())))
    }

    #[test]
    fn test_register_and_resolve() {
        let mut lib = empty_library();
        lib.register("ConstantMetric", |_, _| Ok(Box::new(Constant(1.0)) as Box<dyn Scorer>))
            .unwrap();

        assert!(lib.contains("ConstantMetric"));
        assert!(lib.resolve("ConstantMetric").is_ok());
        assert!(matches!(
            lib.resolve("MissingMetric"),
            Err(ResolveError::UnknownClass(c)) if c == "MissingMetric"
        ));

        let dup = lib.register("ConstantMetric", |_, _| {
            Ok(Box::new(Constant(0.0)) as Box<dyn Scorer>)
        });
        assert!(dup.is_err());
    }

    #[test]
    fn test_instantiate_reports_init_failure_type() {
        let lib = ScorerLibrary::with_builtin(Arc::new(OpenAICompatibleConnector::new(
            Default::default(),
        )));
        let err = match lib.instantiate("PatternMatchMetric", &InitParams::new(Map::new())) {
            Err(e) => e,
            Ok(_) => panic!("expected init failure"),
        };
        assert_eq!(
            err.to_string(),
            "PatternMatchMetric init failed: MissingParam: missing required init param 'pattern'"
        );

        let mut params = Map::new();
        params.insert("pattern".into(), json!("^ok$"));
        assert!(lib
            .instantiate("PatternMatchMetric", &InitParams::new(params))
            .is_ok());
    }

    #[test]
    fn test_builtin_classes_registered() {
        let lib = ScorerLibrary::with_builtin(Arc::new(OpenAICompatibleConnector::new(
            Default::default(),
        )));
        for class in [
            "ExactMatchMetric",
            "JsonCorrectnessMetric",
            "ToolCorrectnessMetric",
            "AnswerRelevancyMetric",
            "GEval",
            "KnowledgeRetentionMetric",
            "ArenaGEval",
        ] {
            assert!(lib.contains(class), "{class} should be registered");
        }
    }
}
