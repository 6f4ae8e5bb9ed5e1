mod api;
mod app;
mod commands;
mod config;
mod event;
mod store;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "b9s")]
#[command(about = "A terminal UI for meeting briefs, inspired by k9s")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/b9s/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Backend API base URL (overrides config)
  #[arg(short, long)]
  api_url: Option<String>,
}

/// Route tracing to a file; stdout belongs to the alternate screen.
/// Filter with B9S_LOG (env-filter syntax), default "info".
fn init_tracing() -> Result<tracing_appender::non_blocking::WorkerGuard> {
  let log_dir = dirs::state_dir()
    .or_else(dirs::cache_dir)
    .map(|dir| dir.join("b9s"))
    .unwrap_or_else(|| PathBuf::from("."));
  std::fs::create_dir_all(&log_dir)?;

  let appender = tracing_appender::rolling::never(&log_dir, "b9s.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_env("B9S_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
    )
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = init_tracing()?;

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override backend URL if specified on command line
  let config = if let Some(api_url) = args.api_url {
    config::Config {
      api: config::ApiConfig { base_url: api_url },
      ..config
    }
  } else {
    config
  };

  // Initialize and run the app
  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}
