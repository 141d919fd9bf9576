use super::LockscopeConfig;
use crate::errors::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = ".lockscope.toml";

const MAX_TRAVERSAL_DEPTH: usize = 10;

pub fn parse_config(contents: &str) -> Result<LockscopeConfig> {
    Ok(toml::from_str::<LockscopeConfig>(contents)?)
}

/// `start` and its parents, nearest first.
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Nearest `.lockscope.toml` in `start` or its ancestors.
pub fn discover_config(start: &Path) -> Option<PathBuf> {
    directory_ancestors(start.to_path_buf(), MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|path| path.is_file())
}

/// Load `explicit`, or the discovered file, or defaults. Returns the
/// directory of the file that was read, if any.
///
/// A file that exists but does not parse is an error: analysis never starts
/// on a half-understood configuration.
pub fn load_config(explicit: Option<&Path>, start: &Path) -> Result<(LockscopeConfig, Option<PathBuf>)> {
    let path = match explicit {
        Some(path) if !path.is_file() => {
            return Err(Error::config(format!(
                "config file {} does not exist",
                path.display()
            )))
        }
        Some(path) => path.to_path_buf(),
        None => match discover_config(start) {
            Some(path) => path,
            None => {
                debug!(
                    depth = MAX_TRAVERSAL_DEPTH,
                    "no {CONFIG_FILE_NAME} found, using defaults"
                );
                return Ok((LockscopeConfig::default(), None));
            }
        },
    };

    let contents = fs::read_to_string(&path)?;
    let config = parse_config(&contents).map_err(|err| {
        Error::config(format!("failed to parse {}: {err}", path.display()))
    })?;
    debug!(path = %path.display(), "loaded configuration");
    let base = path.parent().map(Path::to_path_buf);
    Ok((config, base))
}
