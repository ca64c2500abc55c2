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

//! Metricgate Storage Layer
//!
//! Flat-file persistence for run evidence. Each run is written once to
//! `<artifact_dir>/<run_id>/evidence.json` and never updated.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use metricgate_core::EvidenceSink;
//! use metricgate_storage::FileEvidenceStore;
//!
//! let store = FileEvidenceStore::new("./artifacts");
//! let pointer = store.persist(&record)?;
//! let stored = store.load(&record.run_id)?;
//! ```

pub mod evidence_store;

pub use evidence_store::{FileEvidenceStore, EVIDENCE_FILE_NAME};
