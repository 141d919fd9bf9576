//! Findings report: ids resolved to lock and function names, rendered for a
//! terminal or as JSON.

pub mod json;
pub mod terminal;

pub use json::JsonWriter;
pub use terminal::TerminalWriter;

use crate::detect::{Findings, Witness};
use crate::graph::{Diagnostic, DiagnosticKind};
use crate::ids::{FunctionId, LockId};
use crate::model::{LockTable, ProgramModel};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Terminal,
    Json,
}

pub trait ReportWriter {
    fn write_report(&mut self, report: &Report) -> anyhow::Result<()>;
}

pub fn create_writer<'w>(format: OutputFormat, out: Box<dyn Write + 'w>) -> Box<dyn ReportWriter + 'w> {
    match format {
        OutputFormat::Terminal => Box::new(TerminalWriter::new(out)),
        OutputFormat::Json => Box::new(JsonWriter::new(out)),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub language: String,
    pub files: usize,
    pub skipped_files: usize,
    pub classes: usize,
    pub functions: usize,
    pub locks: usize,
    pub order_edges: usize,
    pub deadlocks: usize,
    pub reentrancies: usize,
    pub diagnostics: usize,
    /// Exit states were capped somewhere; findings may be incomplete.
    pub truncated: bool,
}

/// One observed "held before" edge with its call path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeReport {
    pub from: String,
    pub to: String,
    pub held_since: String,
    pub acquired_in: String,
    pub path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadlockReport {
    pub locks: Vec<String>,
    pub edges: Vec<EdgeReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReentrancyReport {
    pub lock: String,
    pub held_since: String,
    pub acquired_in: String,
    pub path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticReport {
    pub kind: DiagnosticKind,
    pub function: String,
    pub expression: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub summary: Summary,
    pub deadlocks: Vec<DeadlockReport>,
    pub reentrancies: Vec<ReentrancyReport>,
    pub diagnostics: Vec<DiagnosticReport>,
}

/// Run facts that do not come from the model.
#[derive(Debug, Clone, Default)]
pub struct RunInfo {
    pub language: String,
    pub files: usize,
    pub skipped_files: usize,
}

struct Names<'a> {
    model: &'a ProgramModel,
    locks: BTreeMap<LockId, String>,
}

impl Names<'_> {
    fn lock(&self, id: LockId) -> String {
        self.locks.get(&id).cloned().unwrap_or_else(|| id.to_string())
    }

    fn function(&self, id: FunctionId) -> String {
        self.model.function_label(id)
    }

    fn path(&self, witness: &Witness) -> Vec<String> {
        witness.path.iter().map(|f| self.function(*f)).collect()
    }
}

impl Report {
    pub fn new(
        model: &ProgramModel,
        locks: &LockTable,
        findings: &Findings,
        diagnostics: &[Diagnostic],
        run: RunInfo,
    ) -> Self {
        let names = Names {
            model,
            locks: locks.names(),
        };
        let deadlocks = findings
            .deadlocks
            .iter()
            .map(|finding| DeadlockReport {
                locks: finding.locks.iter().map(|l| names.lock(*l)).collect(),
                edges: finding
                    .edges
                    .iter()
                    .map(|edge| EdgeReport {
                        from: names.lock(edge.from),
                        to: names.lock(edge.to),
                        held_since: names.function(edge.witness.held_since),
                        acquired_in: names.function(edge.witness.acquired_in),
                        path: names.path(&edge.witness),
                    })
                    .collect(),
            })
            .collect::<Vec<_>>();
        let reentrancies = findings
            .reentrancies
            .iter()
            .map(|finding| ReentrancyReport {
                lock: names.lock(finding.lock),
                held_since: names.function(finding.witness.held_since),
                acquired_in: names.function(finding.witness.acquired_in),
                path: names.path(&finding.witness),
            })
            .collect::<Vec<_>>();
        let diagnostics = diagnostics
            .iter()
            .map(|diagnostic| DiagnosticReport {
                kind: diagnostic.kind,
                function: names.function(diagnostic.function),
                expression: diagnostic.expression.clone(),
            })
            .collect::<Vec<_>>();

        Self {
            summary: Summary {
                language: run.language,
                files: run.files,
                skipped_files: run.skipped_files,
                classes: model.classes().len(),
                functions: model.functions().len(),
                locks: locks.len(),
                order_edges: findings.order_edges,
                deadlocks: deadlocks.len(),
                reentrancies: reentrancies.len(),
                diagnostics: diagnostics.len(),
                truncated: findings.truncated,
            },
            deadlocks,
            reentrancies,
            diagnostics,
        }
    }

    pub fn has_findings(&self) -> bool {
        !self.deadlocks.is_empty() || !self.reentrancies.is_empty()
    }
}
