//! One analysis run: discover, parse, resolve, build, detect.
//!
//! Each stage runs under its [`AnalysisPhase`] span. Files are parsed in
//! parallel and ingested in path order, so the model (and every id in it)
//! only depends on the source tree.

use crate::config::AnalysisConfig;
use crate::detect::{Detector, Findings};
use crate::errors::{Error, Result};
use crate::frontend::LanguageFrontend;
use crate::graph::{GraphBuild, GraphBuilder};
use crate::io::FileWalker;
use crate::model::{CompilationUnit, ModelBuilder, ProgramModel};
use crate::observability::{enter_phase, increment_processed, set_current_file, set_progress, AnalysisPhase};
use crate::report::RunInfo;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A file left out of the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Results of the parsing stage.
#[derive(Debug, Default)]
pub struct ParsedSources {
    pub units: Vec<CompilationUnit>,
    pub skipped: Vec<SkippedFile>,
}

#[derive(Debug)]
pub struct Analysis {
    pub model: ProgramModel,
    pub build: GraphBuild,
    pub findings: Findings,
    pub run: RunInfo,
    pub skipped: Vec<SkippedFile>,
}

/// Source files to analyze, sorted.
pub fn discover(config: &AnalysisConfig) -> Result<Vec<PathBuf>> {
    let _phase = enter_phase(AnalysisPhase::Discovery);
    let files = FileWalker::new(config.src_folder.clone())
        .with_extensions(config.extensions.clone())
        .with_ignore_patterns(&config.ignore_patterns)?
        .walk()?;
    info!(files = files.len(), root = %config.src_folder.display(), "discovered sources");
    Ok(files)
}

fn parse_file(frontend: &dyn LanguageFrontend, path: &Path) -> Result<CompilationUnit> {
    let _file = set_current_file(path);
    let source = std::fs::read_to_string(path).map_err(|err| Error::parse(path, err.to_string()))?;
    let unit = frontend.parse_unit(path, &source);
    increment_processed();
    unit
}

/// Parse every file; per-file parse errors skip the file, anything else is
/// fatal. No parsable file at all is fatal too.
pub fn parse_all(frontend: &dyn LanguageFrontend, files: &[PathBuf]) -> Result<ParsedSources> {
    let _phase = enter_phase(AnalysisPhase::Parsing);
    set_progress(0, files.len());

    let results: Vec<Result<CompilationUnit>> = files
        .par_iter()
        .map(|path| parse_file(frontend, path))
        .collect();

    let mut parsed = ParsedSources::default();
    for (path, result) in files.iter().zip(results) {
        match result {
            Ok(unit) => parsed.units.push(unit),
            Err(err) if !err.is_fatal() => {
                warn!(file = %path.display(), error = %err, "skipping file");
                parsed.skipped.push(SkippedFile {
                    path: path.clone(),
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }

    if parsed.units.is_empty() && !files.is_empty() {
        return Err(Error::NoParsableFiles(files.len()));
    }
    info!(parsed = parsed.units.len(), skipped = parsed.skipped.len(), "parsing finished");
    Ok(parsed)
}

pub fn resolve_model(units: Vec<CompilationUnit>) -> Result<ProgramModel> {
    let _phase = enter_phase(AnalysisPhase::ModelResolution);
    let mut builder = ModelBuilder::new();
    for unit in units {
        builder.ingest(unit);
    }
    Ok(builder.finish()?)
}

pub fn build_graph(model: &ProgramModel, frontend: &dyn LanguageFrontend) -> Result<GraphBuild> {
    let _phase = enter_phase(AnalysisPhase::GraphBuilding);
    GraphBuilder::new(model, frontend).build()
}

pub fn detect(build: &GraphBuild, config: &AnalysisConfig) -> Findings {
    let _phase = enter_phase(AnalysisPhase::Detection);
    Detector::new(&build.graph)
        .with_config(config.detector)
        .detect()
}

/// Run every stage on a rayon pool sized by `config.jobs`.
///
/// A structural failure while building the graph is returned together with
/// the model so callers can dump it.
pub fn run(config: &AnalysisConfig) -> std::result::Result<Analysis, Failure> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs)
        .build()
        .map_err(|err| Failure::from(Error::config(format!("cannot start {} workers: {err}", config.jobs))))?;
    pool.install(|| run_stages(config))
}

fn run_stages(config: &AnalysisConfig) -> std::result::Result<Analysis, Failure> {
    let frontend = config.language.frontend();
    let files = discover(config)?;
    let parsed = parse_all(frontend.as_ref(), &files)?;
    let model = resolve_model(parsed.units)?;
    let build = match build_graph(&model, frontend.as_ref()) {
        Ok(build) => build,
        Err(error) => {
            return Err(Failure {
                error,
                model: Some(Box::new(model)),
            })
        }
    };
    let findings = detect(&build, config);

    Ok(Analysis {
        run: RunInfo {
            language: config.language.to_string(),
            files: files.len(),
            skipped_files: parsed.skipped.len(),
        },
        model,
        build,
        findings,
        skipped: parsed.skipped,
    })
}

/// Fatal error of a run, with the model when it had been resolved.
#[derive(Debug)]
pub struct Failure {
    pub error: Error,
    pub model: Option<Box<ProgramModel>>,
}

impl From<Error> for Failure {
    fn from(error: Error) -> Self {
        Self { error, model: None }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
