use crate::config::{self, ConfigOverrides};
use crate::observability::{enter_phase, AnalysisPhase};
use crate::pipeline;
use crate::report::{create_writer, OutputFormat, Report};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

pub struct AnalyzeConfig {
    pub path: Option<PathBuf>,
    pub language: Option<String>,
    pub extensions: Option<String>,
    pub config: Option<PathBuf>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub dump_graph: bool,
    pub dump_on_error: bool,
}

/// Run the analysis and write the report. Returns whether anything was found.
pub fn handle_analyze(options: AnalyzeConfig) -> Result<bool> {
    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    let (file_config, base) = config::load_config(options.config.as_deref(), &cwd)?;
    let resolved = file_config.resolve(
        ConfigOverrides {
            language: options.language,
            src_folder: options.path,
            extensions: options.extensions,
            jobs: options.jobs,
        },
        base.as_deref(),
    )?;
    info!(
        language = %resolved.language,
        src = %resolved.src_folder.display(),
        extensions = ?resolved.extensions,
        "starting analysis"
    );

    let analysis = match pipeline::run(&resolved) {
        Ok(analysis) => analysis,
        Err(failure) => {
            if options.dump_on_error {
                if let Some(model) = &failure.model {
                    eprintln!("{}", model.dump());
                }
            }
            return Err(failure.error.into());
        }
    };

    if options.dump_graph {
        eprint!("{}", analysis.build.graph.dump(&analysis.model, &analysis.build.locks));
    }

    let _phase = enter_phase(AnalysisPhase::Reporting);
    let report = Report::new(
        &analysis.model,
        &analysis.build.locks,
        &analysis.findings,
        &analysis.build.diagnostics,
        analysis.run,
    );

    let out: Box<dyn Write> = match &options.output {
        Some(path) => {
            colored::control::set_override(false);
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(std::io::stdout().lock()),
    };
    create_writer(options.format, out).write_report(&report)?;
    Ok(report.has_findings())
}
