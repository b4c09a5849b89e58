use crate::{
    config::{config_dir, Config},
    display::{print_info, print_success, print_warning},
    ConfigCommands, Result,
};
use std::path::Path;

/// Handles the `config` command for configuration management and inspection.
///
/// `reset` and `path` never parse the existing file, so they still work
/// when it is malformed.
///
/// # Supported Operations
/// - **Show**: Print the file path and its TOML contents
/// - **Set**: Validate and store one `section.key` value
/// - **Get**: Print one `section.key` value
/// - **Reset**: Remove every setting
/// - **Path**: Print the configuration file path
///
/// # Examples
/// ```bash
/// stratus config set poll.interval_secs 5
/// stratus config set weights.gpu_count 25
/// stratus config get pricing.commitment_months
/// ```
pub async fn handle(action: ConfigCommands) -> Result<()> {
    handle_in(action, &config_dir()?)
}

/// Run a config action against `config.toml` in the given directory
pub fn handle_in(action: ConfigCommands, dir: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => handle_show(&Config::load_from(dir)?),
        ConfigCommands::Set { key, value } => handle_set(&key, &value, Config::load_from(dir)?),
        ConfigCommands::Get { key } => handle_get(&key, &Config::load_from(dir)?),
        ConfigCommands::Reset => handle_reset(Config::empty_at(dir)),
        ConfigCommands::Path => {
            println!("{}", Config::empty_at(dir).config_path.display());
            Ok(())
        }
    }
}

fn handle_show(config: &Config) -> Result<()> {
    print_info(&format!(
        "Configuration file: {}",
        config.config_path.display()
    ));

    let content = config.show_config();
    if content.trim().is_empty() {
        println!("(no settings, using defaults)");
    } else {
        println!("{}", content);
    }
    Ok(())
}

fn handle_set(key: &str, value: &str, mut config: Config) -> Result<()> {
    config.set_value(key, value)?;
    config.save()?;
    print_success(&format!("Set {} = {}", key, value));
    Ok(())
}

fn handle_get(key: &str, config: &Config) -> Result<()> {
    match config.get_value(key)? {
        Some(value) => println!("{}", value),
        None => print_warning(&format!("{} is not set (using default)", key)),
    }
    Ok(())
}

fn handle_reset(config: Config) -> Result<()> {
    config.save()?;
    print_success("Configuration reset to defaults");
    Ok(())
}
