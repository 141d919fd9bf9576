//! Shared error types for lockscope

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for lockscope operations
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors, always raised before analysis starts
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The configured language has no front end
    #[error("Unsupported language: {0:?}")]
    UnsupportedLanguage(String),

    /// The configured source folder does not exist
    #[error("Source folder not found: {}", .0.display())]
    MissingSourceFolder(PathBuf),

    /// A single source file could not be parsed
    #[error("Parse error in {}: {message}", file.display())]
    Parse { file: PathBuf, message: String },

    /// Source files were found but none of them could be parsed
    #[error("None of the {0} source files could be parsed")]
    NoParsableFiles(usize),

    /// The program model is structurally inconsistent
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Front end setup errors (grammar loading, query compilation)
    #[error("Front end error: {0}")]
    Frontend(String),

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// TOML errors
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Pattern errors
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
}

/// Structural failures of the program model. These abort the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("class {class} is its own ancestor (cycle through {cycle})")]
    CyclicInheritance { class: String, cycle: String },

    #[error("function {function} references missing class #{class}")]
    MissingClass { function: String, class: usize },

    #[error("class {class} references missing function #{function}")]
    MissingFunction { class: String, function: usize },

    #[error("function {function} references missing enclosing function #{parent}")]
    MissingParent { function: String, parent: usize },

    #[error("call graph node for function #{0} does not exist")]
    MissingNode(usize),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a parse error for a file
    pub fn parse(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Fatal errors stop the run without a report; everything else is
    /// reported per file and skipped.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Parse { .. })
    }
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_is_not_fatal() {
        let err = Error::parse("A.java", "unexpected token");
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "Parse error in A.java: unexpected token");
    }

    #[test]
    fn test_model_error_is_fatal() {
        let err: Error = ModelError::CyclicInheritance {
            class: "A".into(),
            cycle: "A -> B -> A".into(),
        }
        .into();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("its own ancestor"));
    }
}
