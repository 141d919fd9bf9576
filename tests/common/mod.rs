// Shared helpers for lockscope integration tests
#![allow(dead_code)]

use lockscope::config::{ConfigOverrides, LockscopeConfig};
use lockscope::pipeline::{self, Analysis};
use lockscope::{CompilationUnit, GraphBuild, GraphBuilder, Language, ModelBuilder, ProgramModel};
use std::fs;
use tempfile::TempDir;

pub fn model(units: Vec<CompilationUnit>) -> ProgramModel {
    let mut builder = ModelBuilder::new();
    for unit in units {
        builder.ingest(unit);
    }
    builder.finish().expect("model should resolve")
}

pub fn graph(model: &ProgramModel, language: Language) -> GraphBuild {
    let frontend = language.frontend();
    GraphBuilder::new(model, frontend.as_ref())
        .build()
        .expect("graph should build")
}

/// Write `files` into a fresh directory.
pub fn source_tree(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for (name, source) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create dirs");
        }
        fs::write(path, source).expect("write source");
    }
    dir
}

/// Run the whole pipeline over `files`.
pub fn analyze(language: &str, files: &[(&str, &str)]) -> Analysis {
    let dir = source_tree(files);
    let config = LockscopeConfig {
        language: Some(language.to_string()),
        src_folder: Some(dir.path().to_path_buf()),
        jobs: Some(2),
        ..LockscopeConfig::default()
    }
    .resolve(ConfigOverrides::default(), None)
    .expect("config should resolve");
    pipeline::run(&config).expect("analysis should succeed")
}

/// Lock names of every deadlock finding.
pub fn deadlock_names(analysis: &Analysis) -> Vec<Vec<String>> {
    analysis
        .findings
        .deadlocks
        .iter()
        .map(|finding| {
            finding
                .locks
                .iter()
                .map(|lock| {
                    analysis
                        .build
                        .locks
                        .name_of(*lock)
                        .unwrap_or("?")
                        .to_string()
                })
                .collect()
        })
        .collect()
}
