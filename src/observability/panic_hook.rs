//! Crash report printed when lockscope panics: the phase, file and progress
//! at the time, then the panic itself.

use super::context::{get_current_context, get_progress};
use std::panic::PanicHookInfo;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("{}", crash_report(info));
    }));
}

fn crash_report(info: &PanicHookInfo<'_>) -> String {
    let context = get_current_context();
    let (processed, total) = get_progress();

    let mut lines = vec![
        String::new(),
        format!("lockscope {VERSION} crashed ({})", std::env::consts::OS),
        format!("  panic: {}", panic_message(info)),
    ];
    if let Some(location) = info.location() {
        lines.push(format!(
            "  at: {}:{}:{}",
            location.file(),
            location.line(),
            location.column()
        ));
    }
    lines.push(format!(
        "  phase: {}",
        context
            .phase
            .map(|phase| phase.to_string())
            .unwrap_or_else(|| "(before analysis)".to_string())
    ));
    if let Some(file) = &context.current_file {
        lines.push(format!("  file: {}", file.display()));
    }
    if total > 0 {
        lines.push(format!("  progress: {processed} / {total} files"));
    }
    if std::env::var_os("RUST_BACKTRACE").is_none() {
        lines.push("  set RUST_BACKTRACE=1 for a backtrace".to_string());
    }
    lines.join("\n")
}

fn panic_message(info: &PanicHookInfo<'_>) -> String {
    if let Some(message) = info.payload().downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
