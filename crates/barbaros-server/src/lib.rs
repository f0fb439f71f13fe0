//! Wiring for the `barbaros` binary: configuration, the admin bootstrap and
//! the HTTP stack around [`barbaros_api::api_router`].

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use axum::Router;
use barbaros_api::{ApiConfig, AppState, api_router};
use barbaros_core::{
  account::{NewAdmin, StaffRole},
  loyalty::DEFAULT_VISITS_PER_REWARD,
  store::ClientRepository,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Server settings, read from `config.toml` and `BARBAROS_*` variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub store_path:          PathBuf,
  pub visits_per_reward:   u32,
  pub max_upload_bytes:    usize,
  pub badge_width:         u32,
  /// Staff account created at startup if no account has this email yet.
  pub admin_email:         Option<String>,
  pub admin_name:          Option<String>,
  /// Argon2 PHC string, as printed by `barbaros --hash-password`.
  pub admin_password_hash: Option<String>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    let api = ApiConfig::default();
    Self {
      host:                "127.0.0.1".to_owned(),
      port:                8080,
      store_path:          PathBuf::from("barbaros.db"),
      visits_per_reward:   DEFAULT_VISITS_PER_REWARD,
      max_upload_bytes:    api.max_upload_bytes,
      badge_width:         api.badge_width,
      admin_email:         None,
      admin_name:          None,
      admin_password_hash: None,
    }
  }
}

impl ServerConfig {
  /// Layer the optional TOML file at `path` under `BARBAROS_*` variables.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("BARBAROS"))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn api_config(&self) -> ApiConfig {
    ApiConfig {
      visits_per_reward: self.visits_per_reward,
      max_upload_bytes:  self.max_upload_bytes,
      badge_width:       self.badge_width,
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  /// The configured bootstrap admin, if both an email and a hash are set.
  fn bootstrap_admin(&self) -> Option<NewAdmin> {
    let email = self.admin_email.as_deref()?.trim();
    let password_hash = self.admin_password_hash.as_deref()?.trim();
    if email.is_empty() || password_hash.is_empty() {
      return None;
    }
    Some(NewAdmin {
      email:         email.to_owned(),
      name:          self.admin_name.clone().unwrap_or_else(|| "Administrator".to_owned()),
      staff_role:    StaffRole::Owner,
      password_hash: password_hash.to_owned(),
    })
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Startup ──────────────────────────────────────────────────────────────────

/// Create the configured admin unless an account already uses that email.
/// Returns whether one was created.
pub async fn ensure_admin<S>(store: &S, config: &ServerConfig) -> anyhow::Result<bool>
where
  S: ClientRepository,
{
  let Some(admin) = config.bootstrap_admin() else {
    return Ok(false);
  };

  if store.find_account(&admin.email).await?.is_some() {
    tracing::debug!(email = %admin.email, "bootstrap admin already present");
    return Ok(false);
  }

  let created = store.create_admin(admin).await.context("failed to create admin")?;
  tracing::info!(admin_id = %created.id, email = %created.email, "created bootstrap admin");
  Ok(true)
}

/// The API router with request tracing.
pub fn app<S>(state: AppState<S>) -> Router
where
  S: ClientRepository + Clone + 'static,
{
  api_router(state).layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use barbaros_store_sqlite::SqliteStore;

  use super::*;

  fn parse(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn missing_keys_take_defaults() {
    let cfg = parse("port = 9000\nvisits_per_reward = 5\n");
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.address(), "127.0.0.1:9000");

    let api = cfg.api_config();
    assert_eq!(api.visits_per_reward, 5);
    assert_eq!(api.max_upload_bytes, ApiConfig::default().max_upload_bytes);
  }

  #[test]
  fn bootstrap_admin_needs_email_and_hash() {
    assert!(parse("admin_email = \"a@b.c\"").bootstrap_admin().is_none());
    assert!(parse("admin_password_hash = \"$argon2id$x\"").bootstrap_admin().is_none());

    let admin = parse("admin_email = \"a@b.c\"\nadmin_password_hash = \"$argon2id$x\"")
      .bootstrap_admin()
      .unwrap();
    assert_eq!(admin.name, "Administrator");
    assert_eq!(admin.staff_role, StaffRole::Owner);
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/shop.db")), PathBuf::from(home).join("shop.db"));
    assert_eq!(expand_tilde(Path::new("/srv/shop.db")), PathBuf::from("/srv/shop.db"));
  }

  #[tokio::test]
  async fn admin_is_created_once() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let cfg = ServerConfig {
      admin_email: Some("Owner@Shop.test".into()),
      admin_name: Some("Sal".into()),
      admin_password_hash: Some("$argon2id$v=19$m=8,t=1,p=1$c2FsdHNhbHQ$aGFzaA".into()),
      ..ServerConfig::default()
    };

    assert!(ensure_admin(&store, &cfg).await.unwrap());
    assert!(!ensure_admin(&store, &cfg).await.unwrap());

    let admin = store.find_admin_by_email("owner@shop.test").await.unwrap().unwrap();
    assert_eq!(admin.name, "Sal");
  }

  #[tokio::test]
  async fn no_admin_configured_is_a_no_op() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    assert!(!ensure_admin(&store, &ServerConfig::default()).await.unwrap());
  }
}
