// tidgit CLI entry point.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_code;
mod messages;
mod output;
mod terminal;

use exit_code::ExitCode;
use output::OutputFormat;

/// Progress from the sync service is logged at info; everything else at warn.
const DEFAULT_LOG_FILTER: &str = "warn,tidgit_sync::service=info";

#[derive(Parser)]
#[command(name = "tidgit", about = "Back up and synchronize TiddlyWiki folders with git")]
struct Cli {
    /// Config file to use instead of ~/.tidgit/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Skip the connectivity probe and treat the host as offline.
    #[arg(long, global = true)]
    offline: bool,

    /// Force JSON output.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: commands::Command,
}

#[tokio::main]
async fn main() -> process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::detect(cli.json);
    let globals = commands::Globals { config: cli.config, offline: cli.offline, format };

    match commands::run(&globals, cli.command).await {
        Ok(code) => code.into(),
        Err(error) => {
            output::print_anyhow_error(format, &error);
            ExitCode::from_error(&error).into()
        }
    }
}
