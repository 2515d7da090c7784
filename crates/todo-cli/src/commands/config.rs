use std::path::Path;

use todo_core::ClientConfig;

use crate::cli::ConfigCommands;
use crate::config_file::{load_effective_config, load_stored_config, save_config};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, config_path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => {
            let effective = load_effective_config(config_path)?;
            println!("Config file: {}", config_path.display());
            println!("{}", serde_json::to_string_pretty(&effective)?);
            Ok(())
        }
        ConfigCommands::SetApiUrl { url } => update_config(config_path, |config| {
            config.api_base_url = Some(url);
        }),
        ConfigCommands::ClearApiUrl => update_config(config_path, |config| {
            config.api_base_url = None;
        }),
        ConfigCommands::SetSyncOnStart { enabled } => update_config(config_path, |config| {
            config.sync_on_start = enabled;
        }),
    }
}

fn update_config(path: &Path, edit: impl FnOnce(&mut ClientConfig)) -> Result<(), CliError> {
    let mut config = load_stored_config(path)?;
    edit(&mut config);
    save_config(&config, path)?;
    println!("Saved {}", path.display());
    Ok(())
}
