//! Error types for `barbaros-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("client not found: {0}")]
  ClientNotFound(String),

  #[error("visit not found: {0}")]
  VisitNotFound(String),

  #[error("email already in use: {0}")]
  EmailInUse(String),

  #[error("a service category named {0:?} already exists")]
  CategoryNameInUse(String),

  #[error("client {0} has no unredeemed rewards")]
  NoRewardAvailable(String),

  #[error("invalid {field}: {reason}")]
  Validation {
    field:  &'static str,
    reason: String,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
