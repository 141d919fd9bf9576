use crate::errors::Result;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Source files under a root, filtered by extension and ignore globs.
pub struct FileWalker {
    root: PathBuf,
    extensions: Vec<String>,
    ignore_patterns: Vec<glob::Pattern>,
}

impl FileWalker {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            extensions: vec![],
            ignore_patterns: vec![],
        }
    }

    /// Dot-prefixed extensions; empty accepts every file.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_ignore_patterns(mut self, patterns: &[String]) -> Result<Self> {
        self.ignore_patterns = patterns
            .iter()
            .map(|pattern| glob::Pattern::new(pattern))
            .collect::<std::result::Result<_, _>>()?;
        Ok(self)
    }

    /// Matching files, sorted so runs over the same tree agree on ids.
    pub fn walk(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(true)
            .build();

        for entry in walker {
            let entry = entry.map_err(|err| std::io::Error::other(err.to_string()))?;
            let path = entry.path();
            if path.is_file() && self.should_process(path) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    fn should_process(&self, path: &Path) -> bool {
        let name = path.to_string_lossy();
        if self
            .ignore_patterns
            .iter()
            .any(|pattern| pattern.matches(&name))
        {
            return false;
        }
        self.extensions.is_empty() || self.extensions.iter().any(|ext| name.ends_with(ext.as_str()))
    }
}
