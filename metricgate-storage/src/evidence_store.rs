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

//! Flat-file evidence store
//!
//! Layout: one directory per run under the artifact root, holding a single pretty
//! printed `evidence.json`. Documents are written to a temp file in the run directory
//! and moved into place with a no-clobber rename, so a reader sees either nothing or
//! the complete document.

use metricgate_core::{EvidenceSink, PersistenceError, RunRecord};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub const EVIDENCE_FILE_NAME: &str = "evidence.json";

/// Writes each [`RunRecord`] to `<artifact_dir>/<run_id>/evidence.json`
#[derive(Debug, Clone)]
pub struct FileEvidenceStore {
    artifact_dir: PathBuf,
}

fn io_error(path: &Path, source: io::Error) -> PersistenceError {
    PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn check_run_id(run_id: &str) -> Result<(), PersistenceError> {
    let valid = !run_id.is_empty()
        && run_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(PersistenceError::InvalidRunId(run_id.to_string()))
    }
}

impl FileEvidenceStore {
    pub fn new(artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
        }
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    /// Location of a run's document, whether or not it exists yet
    pub fn evidence_path(&self, run_id: &str) -> Result<PathBuf, PersistenceError> {
        check_run_id(run_id)?;
        Ok(self.artifact_dir.join(run_id).join(EVIDENCE_FILE_NAME))
    }

    /// Read back a stored run record
    pub fn load(&self, run_id: &str) -> Result<RunRecord, PersistenceError> {
        let path = self.evidence_path(run_id)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PersistenceError::NotFound(run_id.to_string()))
            }
            Err(e) => return Err(io_error(&path, e)),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Run ids with a stored document, sorted
    pub fn list_run_ids(&self) -> Result<Vec<String>, PersistenceError> {
        let entries = match fs::read_dir(&self.artifact_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.artifact_dir, e)),
        };

        let mut run_ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_error(&self.artifact_dir, e))?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if check_run_id(&name).is_ok() && entry.path().join(EVIDENCE_FILE_NAME).is_file() {
                run_ids.push(name);
            }
        }
        run_ids.sort();
        Ok(run_ids)
    }
}

impl EvidenceSink for FileEvidenceStore {
    fn persist(&self, record: &RunRecord) -> Result<String, PersistenceError> {
        let path = self.evidence_path(&record.run_id)?;
        let run_dir = self.artifact_dir.join(&record.run_id);

        if path.exists() {
            return Err(PersistenceError::AlreadyExists(record.run_id.clone()));
        }
        fs::create_dir_all(&run_dir).map_err(|e| io_error(&run_dir, e))?;

        let body = serde_json::to_vec_pretty(record)?;
        let mut tmp = NamedTempFile::new_in(&run_dir).map_err(|e| io_error(&run_dir, e))?;
        tmp.write_all(&body).map_err(|e| io_error(tmp.path(), e))?;
        tmp.as_file().sync_all().map_err(|e| io_error(tmp.path(), e))?;
        debug!(run_id = %record.run_id, bytes = body.len(), "Evidence staged");

        tmp.persist_noclobber(&path).map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                PersistenceError::AlreadyExists(record.run_id.clone())
            } else {
                io_error(&path, e.error)
            }
        })?;

        info!(run_id = %record.run_id, path = %path.display(), "Evidence persisted");
        Ok(path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use metricgate_core::{
        DeploymentStage, EvaluationContext, MetricResult, OverallStatus, RiskClass, RunConfig,
        RunEnvironment, RunMode, UserImpact,
    };
    use tempfile::TempDir;

    fn record(run_id: &str) -> RunRecord {
        let now = Utc::now();
        RunRecord {
            run_id: run_id.to_string(),
            started_at: now,
            finished_at: now,
            evaluation_object: "support-bot".into(),
            use_case: "faq".into(),
            context: EvaluationContext {
                deployment_stage: DeploymentStage::Staging,
                risk_class: RiskClass::Medium,
                user_impact: UserImpact::CustomerFacing,
                domain: None,
            },
            run: RunConfig {
                mode: RunMode::Batch,
                environment: RunEnvironment::Ci,
                baseline_run_id: None,
                budget: None,
            },
            metrics: vec![],
            test_cases: vec![],
            metric_evidence: vec![],
            gaps: vec![],
            metric_results: vec![MetricResult::failed("x", "x", "boom")],
            overall_status: OverallStatus::Warning,
        }
    }

    #[test]
    fn test_persist_then_load() {
        let dir = TempDir::new().unwrap();
        let store = FileEvidenceStore::new(dir.path());
        let rec = record("run-1");

        let pointer = store.persist(&rec).unwrap();
        let expected = dir.path().join("run-1").join(EVIDENCE_FILE_NAME);
        assert_eq!(pointer, expected.display().to_string());
        assert!(expected.is_file());

        let loaded = store.load("run-1").unwrap();
        assert_eq!(loaded, rec);

        let leftovers: Vec<_> = fs::read_dir(dir.path().join("run-1")).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = FileEvidenceStore::new(dir.path());
        store.persist(&record("run-1")).unwrap();

        let mut again = record("run-1");
        again.use_case = "changed".into();
        assert!(matches!(
            store.persist(&again),
            Err(PersistenceError::AlreadyExists(id)) if id == "run-1"
        ));
        assert_eq!(store.load("run-1").unwrap().use_case, "faq");
    }

    #[test]
    fn test_rejects_path_like_run_ids() {
        let dir = TempDir::new().unwrap();
        let store = FileEvidenceStore::new(dir.path());
        for bad in ["", "../escape", "a/b", "run 1"] {
            assert!(matches!(
                store.persist(&record(bad)),
                Err(PersistenceError::InvalidRunId(_))
            ));
        }
    }

    #[test]
    fn test_load_missing_and_list() {
        let dir = TempDir::new().unwrap();
        let store = FileEvidenceStore::new(dir.path().join("artifacts"));
        assert!(store.list_run_ids().unwrap().is_empty());
        assert!(matches!(store.load("nope"), Err(PersistenceError::NotFound(_))));

        store.persist(&record("b")).unwrap();
        store.persist(&record("a")).unwrap();
        fs::create_dir_all(dir.path().join("artifacts").join("empty")).unwrap();
        assert_eq!(store.list_run_ids().unwrap(), vec!["a", "b"]);
    }
}
