//! hope server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `HOPE_*` environment variables, opens the SQLite store and serves the RPC
//! surface over HTTP.
//!
//! # Development tokens
//!
//! To mint a session token for an existing user without going through Google:
//!
//! ```text
//! cargo run -p hope-server --bin server -- --issue-token <USER_ID>
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use hope_core::store::UserStore;
use hope_server::{AppState, ServerConfig, auth::GoogleVerifier};
use hope_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Hope ride-sharing server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print a session token for the given user id and exit.
  #[arg(long, value_name = "USER_ID")]
  issue_token: Option<Uuid>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("HOPE")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("allowed_domains")
        .with_list_parse_key("public_methods"),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Helper mode: mint a token and exit.
  if let Some(user_id) = cli.issue_token {
    let user = store
      .get_user(user_id)
      .await
      .context("failed to read user")?
      .with_context(|| format!("no user {user_id}"))?;
    let token = server_cfg
      .session_keys()
      .issue(&user)
      .context("failed to sign token")?;
    println!("{token}");
    return Ok(());
  }

  let verifier = GoogleVerifier::new(server_cfg.google_tokeninfo_url.clone())
    .context("failed to build tokeninfo client")?;
  let state = AppState::new(Arc::new(store), &server_cfg, verifier);

  let app = hope_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!(
    completion_policy = ?server_cfg.completion_policy,
    public_methods = ?server_cfg.public_methods,
    "Listening on http://{address}"
  );
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
