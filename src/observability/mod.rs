//! Logging setup, per-phase spans and crash reports.
//!
//! ```ignore
//! use lockscope::observability::{enter_phase, AnalysisPhase};
//!
//! let _phase = enter_phase(AnalysisPhase::Parsing);
//! // a panic here reports the parsing phase and the current file
//! ```

pub mod context;
pub mod panic_hook;

pub use context::{
    enter_phase, get_current_context, get_progress, increment_processed, set_current_file,
    set_phase, set_progress, AnalysisContext, AnalysisPhase, ContextGuard, PhaseGuard,
};
pub use panic_hook::install_panic_hook;

use tracing_subscriber::EnvFilter;

/// Default level for a `-v` count: warn, info, debug, trace.
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `verbosity`.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbosity)));

    // A second initialization (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(level_for_verbosity(0), "warn");
        assert_eq!(level_for_verbosity(2), "debug");
        assert_eq!(level_for_verbosity(9), "trace");
    }
}
