//! rehome server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store and serves the JSON API over HTTP. Principals are managed from the
//! command line:
//!
//! ```text
//! rehome add-organization "Harbor Rescue"
//! rehome add-user sam --role shelter_staff
//! rehome add-membership <org-id> <user-id> --role staff
//! rehome serve
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use rehome_core::{
  engine::Engine,
  notify::TracingNotifier,
  principal::{MembershipRole, UserRole},
  store::AdoptionStore,
};
use rehome_server::ServerConfig;
use rehome_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "rehome adoption server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Create an organization and print its id.
  AddOrganization { name: String },
  /// Create a user and print its id.
  AddUser {
    username: String,
    /// adopter, shelter_staff or admin.
    #[arg(long, default_value = "adopter")]
    role:     UserRole,
  },
  /// Add a user to an organization, or reactivate them with a new role.
  AddMembership {
    organization_id: Uuid,
    user_id:         Uuid,
    /// admin, staff or volunteer.
    #[arg(long, default_value = "staff")]
    role:            MembershipRole,
  },
  /// Deactivate a user's membership in an organization.
  DeactivateMembership { organization_id: Uuid, user_id: Uuid },
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
    .add_source(config::Environment::with_prefix("REHOME"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open_with(&store_path, server_cfg.store_options())
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(store, &server_cfg).await,
    Command::AddOrganization { name } => {
      let org = store.add_organization(name).await.context("adding organization")?;
      println!("{}", org.organization_id);
      Ok(())
    }
    Command::AddUser { username, role } => {
      let user = store.add_user(username, role).await.context("adding user")?;
      println!("{}", user.user_id);
      Ok(())
    }
    Command::AddMembership { organization_id, user_id, role } => {
      store
        .add_membership(organization_id, user_id, role)
        .await
        .context("adding membership")?;
      Ok(())
    }
    Command::DeactivateMembership { organization_id, user_id } => {
      store
        .deactivate_membership(organization_id, user_id)
        .await
        .context("deactivating membership")?;
      Ok(())
    }
  }
}

async fn serve(store: SqliteStore, server_cfg: &ServerConfig) -> anyhow::Result<()> {
  let engine = Engine::with_notifier(store, TracingNotifier, server_cfg.engine_config());
  let app = rehome_server::router(Arc::new(engine));
  let address = server_cfg.address();

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
