//! Thread-local record of what the analysis is doing, for crash reports.
//!
//! Each thread has its own context (rayon workers included); file progress
//! is a pair of global atomic counters. Guards restore the previous context
//! when dropped.

use std::cell::RefCell;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::span::EnteredSpan;
use tracing::info_span;

static FILES_PROCESSED: AtomicUsize = AtomicUsize::new(0);
static FILES_TOTAL: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static CURRENT_CONTEXT: RefCell<AnalysisContext> = const { RefCell::new(AnalysisContext::new()) };
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisContext {
    pub phase: Option<AnalysisPhase>,
    pub current_file: Option<PathBuf>,
}

impl AnalysisContext {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: None,
            current_file: None,
        }
    }
}

/// Stages of one run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPhase {
    Discovery,
    Parsing,
    ModelResolution,
    GraphBuilding,
    Detection,
    Reporting,
}

impl AnalysisPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Parsing => "parsing",
            Self::ModelResolution => "model_resolution",
            Self::GraphBuilding => "graph_building",
            Self::Detection => "detection",
            Self::Reporting => "reporting",
        }
    }
}

impl std::fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Restores the previous context on drop.
pub struct ContextGuard {
    previous: AnalysisContext,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CURRENT_CONTEXT.with(|ctx| {
            *ctx.borrow_mut() = self.previous.clone();
        });
    }
}

/// Phase context plus an entered `phase` span; both end on drop.
pub struct PhaseGuard {
    _span: EnteredSpan,
    _context: ContextGuard,
}

#[must_use]
pub fn set_phase(phase: AnalysisPhase) -> ContextGuard {
    CURRENT_CONTEXT.with(|ctx| {
        let previous = ctx.borrow().clone();
        ctx.borrow_mut().phase = Some(phase);
        ContextGuard { previous }
    })
}

/// Enter `phase`: sets the context and opens an info span named after it.
#[must_use]
pub fn enter_phase(phase: AnalysisPhase) -> PhaseGuard {
    let context = set_phase(phase);
    let span = info_span!("phase", name = phase.as_str()).entered();
    PhaseGuard {
        _span: span,
        _context: context,
    }
}

#[must_use]
pub fn set_current_file(path: impl Into<PathBuf>) -> ContextGuard {
    CURRENT_CONTEXT.with(|ctx| {
        let previous = ctx.borrow().clone();
        ctx.borrow_mut().current_file = Some(path.into());
        ContextGuard { previous }
    })
}

pub fn set_progress(processed: usize, total: usize) {
    FILES_PROCESSED.store(processed, Ordering::Relaxed);
    FILES_TOTAL.store(total, Ordering::Relaxed);
}

pub fn increment_processed() {
    FILES_PROCESSED.fetch_add(1, Ordering::Relaxed);
}

#[must_use]
pub fn get_current_context() -> AnalysisContext {
    CURRENT_CONTEXT.with(|ctx| ctx.borrow().clone())
}

/// (processed, total) source files.
#[must_use]
pub fn get_progress() -> (usize, usize) {
    (
        FILES_PROCESSED.load(Ordering::Relaxed),
        FILES_TOTAL.load(Ordering::Relaxed),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reset_context() {
        CURRENT_CONTEXT.with(|ctx| *ctx.borrow_mut() = AnalysisContext::new());
    }

    #[test]
    fn test_phase_guard_restores_previous() {
        reset_context();
        let _outer = enter_phase(AnalysisPhase::Parsing);
        {
            let _inner = enter_phase(AnalysisPhase::GraphBuilding);
            assert_eq!(get_current_context().phase, Some(AnalysisPhase::GraphBuilding));
        }
        assert_eq!(get_current_context().phase, Some(AnalysisPhase::Parsing));
    }

    #[test]
    fn test_file_guard_nests_inside_phase() {
        reset_context();
        let _phase = set_phase(AnalysisPhase::Parsing);
        {
            let _file = set_current_file("src/Bank.java");
            let ctx = get_current_context();
            assert_eq!(ctx.phase, Some(AnalysisPhase::Parsing));
            assert_eq!(ctx.current_file, Some(PathBuf::from("src/Bank.java")));
        }
        assert!(get_current_context().current_file.is_none());
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(AnalysisPhase::ModelResolution.to_string(), "model_resolution");
        assert_eq!(AnalysisPhase::Detection.as_str(), "detection");
    }
}
