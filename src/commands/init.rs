use crate::config::{CONFIG_FILE_NAME, DEFAULT_CONFIG};
use crate::io;
use anyhow::Result;
use std::path::Path;

pub fn init_config(force: bool) -> Result<()> {
    write_default_config(Path::new("."), force)?;
    println!("Created {CONFIG_FILE_NAME} configuration file");
    Ok(())
}

pub fn write_default_config(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.exists() && !force {
        anyhow::bail!("Configuration file already exists. Use --force to overwrite.");
    }
    io::write_file(&config_path, DEFAULT_CONFIG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        write_default_config(dir.path(), false).unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "language = \"c#\"").unwrap();

        assert!(write_default_config(dir.path(), false).is_err());
        write_default_config(dir.path(), true).unwrap();
        let written = fs::read_to_string(dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(written, DEFAULT_CONFIG);
    }
}
