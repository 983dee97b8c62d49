//! vigil server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered with
//! `VIGIL_*` environment variables, loads the risk model, opens the SQLite
//! store, and serves the dashboards over HTTP.
//!
//! The server refuses to start if the model artifact is missing or invalid.
//! To validate an artifact without starting the server:
//!
//! ```text
//! cargo run -p vigil-web --bin vigil -- --check-model
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use vigil_model::ModelBundle;
use vigil_store_sqlite::SqliteStore;
use vigil_web::{AppState, ServerConfig};

#[derive(Parser)]
#[command(author, version, about = "Vigil student risk dashboard")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Load and validate the model artifact, print its classes, and exit.
  #[arg(long)]
  check_model: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("VIGIL"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let model_path = expand_tilde(&server_cfg.model_path);
  let model = ModelBundle::load(&model_path)
    .with_context(|| format!("failed to load risk model from {model_path:?}"))?;

  if cli.check_model {
    println!("{}: {}", model_path.display(), model.classes().join(", "));
    return Ok(());
  }

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState {
    store:  Arc::new(store),
    model:  Arc::new(model),
    config: Arc::new(server_cfg),
  };

  let app = vigil_web::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
