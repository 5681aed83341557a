//! Run every engine, pool their tables, pick one table per section.
//!
//! Selection is first structurally complete match: for each section the
//! pooled candidates are tried in engine-priority order and the first table
//! that assembles completely wins. The same rule applies to all four
//! sections, so a given pool always resolves to the same result.

use std::collections::BTreeMap;

use gmpricing_core::{CanonicalSection, RawTable, SectionKind};
use gmpricing_ocr::Capabilities;
use serde::Serialize;
use thiserror::Error;

use crate::assemble::assemble;
use crate::document::Document;
use crate::engine::{self, ExtractionEngine, DEFAULT_ORDER};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Unknown extraction engine: '{0}'")]
    UnknownEngine(String),
    #[error("No extraction engines enabled")]
    NoEngines,
}

/// Where a resolved section came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Provenance {
    Engine { engine: String, page: usize, table: usize },
    Ocr { page: usize },
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provenance::Engine { engine, page, table } => write!(f, "{engine} (page {page}, table {table})"),
            Provenance::Ocr { page } => write!(f, "ocr (page {page})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSection {
    pub section: CanonicalSection,
    pub provenance: Provenance,
}

pub type ResolvedSections = BTreeMap<SectionKind, ResolvedSection>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EngineStatus {
    Ok { tables: usize },
    Skipped,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineDiagnostic {
    pub engine: String,
    #[serde(flatten)]
    pub status: EngineStatus,
}

/// Every table every engine produced, in engine-priority order.
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    pub tables: Vec<RawTable>,
    pub diagnostics: Vec<EngineDiagnostic>,
}

pub struct Orchestrator {
    engines: Vec<Box<dyn ExtractionEngine>>,
}

impl Orchestrator {
    pub fn new(engines: Vec<Box<dyn ExtractionEngine>>) -> Self {
        Self { engines }
    }

    /// Built-in engines in default priority order.
    pub fn with_defaults(caps: &Capabilities) -> Self {
        Self::new(DEFAULT_ORDER.iter().filter_map(|n| engine::by_name(n, caps)).collect())
    }

    /// Built-in engines in the given order, minus `disabled`.
    pub fn from_names<S: AsRef<str>>(
        order: &[S],
        disabled: &[S],
        caps: &Capabilities,
    ) -> Result<Self, OrchestratorError> {
        let mut engines = Vec::new();
        for name in order.iter().map(AsRef::as_ref) {
            if disabled.iter().any(|d| d.as_ref() == name) {
                continue;
            }
            let engine = engine::by_name(name, caps)
                .ok_or_else(|| OrchestratorError::UnknownEngine(name.to_string()))?;
            engines.push(engine);
        }
        if engines.is_empty() {
            return Err(OrchestratorError::NoEngines);
        }
        Ok(Self::new(engines))
    }

    pub fn engine_names(&self) -> Vec<&'static str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    /// Run all engines. A failing engine is logged and contributes nothing;
    /// it never stops the others.
    pub fn collect(&self, doc: &Document) -> CandidatePool {
        let mut pool = CandidatePool::default();
        for engine in &self.engines {
            let name = engine.name();
            let status = if !engine.supports(doc) {
                tracing::debug!(engine = name, "skipped: document not supported");
                EngineStatus::Skipped
            } else {
                match engine.extract(doc) {
                    Ok(tables) => {
                        let tables: Vec<RawTable> = tables.into_iter().filter(|t| !t.is_empty()).collect();
                        tracing::debug!(engine = name, tables = tables.len(), "engine finished");
                        let n = tables.len();
                        pool.tables.extend(tables);
                        EngineStatus::Ok { tables: n }
                    }
                    Err(e) => {
                        tracing::warn!(engine = name, error = %e, "engine failed, continuing without it");
                        EngineStatus::Failed { error: e.to_string() }
                    }
                }
            };
            pool.diagnostics.push(EngineDiagnostic { engine: name.to_string(), status });
        }
        pool
    }

    /// Collect then resolve.
    pub fn run(&self, doc: &Document) -> (ResolvedSections, CandidatePool) {
        let pool = self.collect(doc);
        let sections = resolve(&pool.tables);
        (sections, pool)
    }
}

/// Pick, for each section, the first candidate that assembles completely.
pub fn resolve(candidates: &[RawTable]) -> ResolvedSections {
    let mut resolved = ResolvedSections::new();
    for kind in SectionKind::ALL {
        let found = candidates
            .iter()
            .find_map(|table| assemble(kind, table).map(|section| (table, section)));
        match found {
            Some((table, section)) => {
                tracing::info!(section = %kind, from = %table.origin(), "section found");
                resolved.insert(
                    kind,
                    ResolvedSection {
                        section,
                        provenance: Provenance::Engine {
                            engine: table.engine.clone(),
                            page: table.page,
                            table: table.index,
                        },
                    },
                );
            }
            None => tracing::info!(section = %kind, "section not found by any engine"),
        }
    }
    resolved
}
