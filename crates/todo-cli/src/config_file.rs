//! Persistent CLI configuration file.

use std::env;
use std::path::{Path, PathBuf};

use todo_core::ClientConfig;

use crate::error::CliError;

const CONFIG_FILE_NAME: &str = "config.json";

/// Location of the config file: `TODO_CONFIG_PATH` or `<config_dir>/todo/config.json`.
pub fn config_path() -> Result<PathBuf, CliError> {
    if let Some(path) = env::var_os("TODO_CONFIG_PATH") {
        return Ok(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join("todo").join(CONFIG_FILE_NAME))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI config directory".to_string()))
}

/// File contents only, without environment overrides (what `config set-*` edits).
pub fn load_stored_config(path: &Path) -> Result<ClientConfig, CliError> {
    ClientConfig::load_from_path(path)
        .map_err(|error| CliError::Config(format!("{}: {error}", path.display())))
}

/// Effective configuration: the file overlaid with `TODO_*` variables.
pub fn load_effective_config(path: &Path) -> Result<ClientConfig, CliError> {
    load_stored_config(path)?
        .with_env_overrides()
        .map_err(|error| CliError::Config(error.to_string()))
}

pub fn save_config(config: &ClientConfig, path: &Path) -> Result<(), CliError> {
    config
        .save_to_path(path)
        .map_err(|error| CliError::Config(format!("{}: {error}", path.display())))
}
