//! `.lockscope.toml` configuration and its resolution against CLI flags.

pub mod loader;

pub use loader::{directory_ancestors, discover_config, load_config, parse_config, CONFIG_FILE_NAME};

use crate::detect::DetectorConfig;
use crate::errors::{Error, Result};
use crate::frontend::Language;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file as written by the user. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LockscopeConfig {
    /// `"java"` or `"c#"`.
    pub language: Option<String>,
    pub src_folder: Option<PathBuf>,
    /// Comma-separated, e.g. `".java, .jav"`. Empty accepts every file.
    pub extensions: Option<String>,
    pub ignore_patterns: Vec<String>,
    pub detector: DetectorConfig,
    /// Worker threads; 0 uses every core.
    pub jobs: Option<usize>,
}

/// Values given on the command line; they win over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub language: Option<String>,
    pub src_folder: Option<PathBuf>,
    pub extensions: Option<String>,
    pub jobs: Option<usize>,
}

/// Validated settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub language: Language,
    pub src_folder: PathBuf,
    /// Dot-prefixed; empty accepts every file.
    pub extensions: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub detector: DetectorConfig,
    pub jobs: usize,
}

impl LockscopeConfig {
    /// Apply `overrides` and validate. `base` anchors a relative
    /// `src_folder` read from the file.
    pub fn resolve(self, overrides: ConfigOverrides, base: Option<&Path>) -> Result<AnalysisConfig> {
        let language_name = overrides.language.or(self.language).ok_or_else(|| {
            Error::config("no language configured; set `language` in .lockscope.toml or pass --language")
        })?;
        let language = Language::from_name(&language_name)
            .ok_or_else(|| Error::UnsupportedLanguage(language_name.clone()))?;

        let src_folder = match (overrides.src_folder, self.src_folder) {
            (Some(cli), _) => cli,
            (None, Some(file)) if file.is_relative() => base.map(|b| b.join(&file)).unwrap_or(file),
            (None, Some(file)) => file,
            (None, None) => PathBuf::from("."),
        };
        if !src_folder.is_dir() {
            return Err(Error::MissingSourceFolder(src_folder));
        }

        let extensions = match overrides.extensions.or(self.extensions) {
            Some(list) => parse_extensions(&list),
            None => language
                .default_extensions()
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        };

        for pattern in &self.ignore_patterns {
            glob::Pattern::new(pattern)?;
        }
        if self.detector.max_exit_states == 0 {
            return Err(Error::config("detector.max_exit_states must be at least 1"));
        }

        Ok(AnalysisConfig {
            language,
            src_folder,
            extensions,
            ignore_patterns: self.ignore_patterns,
            detector: self.detector,
            jobs: overrides.jobs.or(self.jobs).unwrap_or(0),
        })
    }
}

/// Split a comma-separated extension list, trimming and dot-prefixing each.
pub fn parse_extensions(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|ext| !ext.is_empty())
        .map(|ext| {
            if ext.starts_with('.') {
                ext.to_string()
            } else {
                format!(".{ext}")
            }
        })
        .collect()
}

/// Commented default written by `lockscope init`.
pub const DEFAULT_CONFIG: &str = r#"# lockscope configuration

# "java" or "c#"
language = "java"

# Root of the sources to analyze, relative to this file
src_folder = "."

# Comma-separated file extensions; leave empty to analyze every file
extensions = ".java"

# Glob patterns of paths to skip
ignore_patterns = [
    "**/build/**",
    "**/target/**",
    "**/bin/**",
    "**/obj/**",
]

# Worker threads, 0 = all cores
jobs = 0

[detector]
# Distinct held-lock states remembered per function
max_exit_states = 64
"#;
