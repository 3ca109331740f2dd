//! Config command implementation.

use crate::cli::{ConfigAction, ConfigArgs};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use std::path::Path;

/// Execute the config command.
pub fn execute_config(args: ConfigArgs, path: &Path, formatter: &Formatter) -> Result<()> {
    match args.action {
        ConfigAction::Show => show_config(path, formatter),
        ConfigAction::Init { force } => init_config(path, force, formatter),
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

/// Print the effective configuration.
fn show_config(path: &Path, formatter: &Formatter) -> Result<()> {
    if !path.exists() {
        eprintln!(
            "{}",
            formatter.info(&format!("{} not found, showing defaults", path.display()))
        );
    }
    let config = Config::load(path)?;
    print!("{}", config.to_toml()?);
    Ok(())
}

/// Write the default configuration.
fn init_config(path: &Path, force: bool, formatter: &Formatter) -> Result<()> {
    if path.exists() && !force {
        return Err(CliError::InvalidInput(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    Config::default().save(path)?;
    println!(
        "{}",
        formatter.success(&format!("Wrote {}", path.display()))
    );
    Ok(())
}
