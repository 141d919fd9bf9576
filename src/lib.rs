//! lockscope: whole-program lock-order deadlock analysis for Java and C#.
//!
//! Sources are parsed by a [`frontend`] into raw compilation units, resolved
//! into a [`model::ProgramModel`], turned into a call graph whose entries are
//! call edges and lock events by [`graph::GraphBuilder`], and finally
//! traversed by the [`detect::Detector`], which reports cycles in the
//! lock-order graph.

pub mod cli;
pub mod commands;
pub mod config;
pub mod detect;
pub mod errors;
pub mod frontend;
pub mod graph;
pub mod ids;
pub mod io;
pub mod model;
pub mod observability;
pub mod pipeline;
pub mod report;
pub mod types;

pub use crate::config::{AnalysisConfig, ConfigOverrides, LockscopeConfig};
pub use crate::detect::{detect, DeadlockFinding, Detector, DetectorConfig, Findings, ReentrancyFinding};
pub use crate::errors::{Error, ModelError, Result};
pub use crate::frontend::{Language, LanguageFrontend, LockOperation};
pub use crate::graph::{CallGraph, CallGraphNode, Diagnostic, DiagnosticKind, GraphBuild, GraphBuilder, GraphEntry};
pub use crate::ids::{ClassId, FunctionId, LockId};
pub use crate::model::{CompilationUnit, ModelBuilder, ProgramModel};
pub use crate::report::{OutputFormat, Report};
pub use crate::types::{TypeId, TypeRegistry};
