use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let env_name = std::env::var(config::ENV_VAR).ok();
    let config = config::FlatdbConfig::load(cli.config.as_deref(), env_name.as_deref())?
        .with_overrides(cli.data_dir.clone(), cli.logs_dir.clone());
    commands::run_command(cli, config)
}
