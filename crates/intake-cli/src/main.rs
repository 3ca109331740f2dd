//! Intake CLI - classify and de-duplicate incoming service requests.

use clap::Parser;
use intake_cli::commands;
use intake_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("intake=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> intake_cli::Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };

    // `config` subcommands must work even when the file is missing or broken
    let command = match cli.command {
        Command::Config(args) => {
            let formatter = Formatter::new(
                cli.format.map(Into::into).unwrap_or_default(),
                !cli.no_color,
            );
            return commands::execute_config(args, &config_path, &formatter);
        }
        command => command,
    };

    let config = Config::load(&config_path)?;

    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match command {
        Command::Process(args) => commands::execute_process(args, config, &formatter).await,
        Command::Taxonomy => commands::execute_taxonomy(&config, &formatter),
        Command::Config(_) => Ok(()),
    }
}
