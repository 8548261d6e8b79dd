mod app;
mod cache;
mod catalog;
mod commands;
mod config;
mod db;
mod network;
#[cfg(test)]
mod test_support;
mod worker;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "catalog-shell")]
#[command(about = "Offline-first shell and product catalog")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/catalog-shell/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Origin to serve the shell from, overriding the config file
  #[arg(long, global = true)]
  origin: Option<String>,

  /// Also log to stderr
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: commands::Command,
}

/// Log to a daily file in the data directory, and to stderr when verbose.
/// Use RUST_LOG to change the level (e.g. RUST_LOG=catalog_shell=debug).
fn init_tracing(verbose: bool) -> Result<WorkerGuard> {
  let log_dir = db::data_dir()?;
  std::fs::create_dir_all(&log_dir)?;
  let appender = tracing_appender::rolling::daily(log_dir, "catalog-shell.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let stderr = verbose.then(|| fmt::layer().with_writer(std::io::stderr));

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .with(stderr)
    .init();

  Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = init_tracing(args.verbose)?;

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override origin if specified on command line
  let config = if let Some(origin) = args.origin {
    config::Config { origin, ..config }
  } else {
    config
  };
  config.validate()?;

  let app = app::App::new(config)?;
  app.run(args.command).await
}
