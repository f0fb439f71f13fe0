//! HTTP Basic identity provider.
//!
//! Credentials are `email:password`. The account is looked up with
//! [`ClientRepository::find_account`] (staff first, then clients) and the
//! password checked against its argon2 PHC hash.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use barbaros_core::{account::Identity, store::ClientRepository};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use rand_core::OsRng;

use crate::{AppState, error::ApiError};

fn bad_credentials() -> ApiError { ApiError::Unauthorized("invalid email or password".into()) }

/// Hash `password` into an argon2id PHC string with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| ApiError::Internal(format!("argon2 error: {e}")))
}

/// Check `password` against a PHC string. Malformed hashes never verify.
pub fn verify_password(password: &str, phc: &str) -> Result<(), ApiError> {
  let parsed = PasswordHash::new(phc).map_err(|_| bad_credentials())?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .map_err(|_| bad_credentials())
}

/// Pull `(email, password)` out of an `Authorization: Basic` header.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let missing = || ApiError::Unauthorized("authentication required".into());

  let value = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or_else(missing)?;
  let encoded = value.strip_prefix("Basic ").ok_or_else(missing)?;

  let decoded = B64.decode(encoded.trim()).map_err(|_| bad_credentials())?;
  let creds = String::from_utf8(decoded).map_err(|_| bad_credentials())?;
  let (email, password) = creds.split_once(':').ok_or_else(bad_credentials)?;
  Ok((email.to_owned(), password.to_owned()))
}

/// Resolve credentials to an [`Identity`]. Unknown emails, accounts without a
/// password, disabled accounts and wrong passwords are all 401s.
pub async fn authenticate<S>(store: &S, email: &str, password: &str) -> Result<Identity, ApiError>
where
  S: ClientRepository,
{
  let account = store
    .find_account(email)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(bad_credentials)?;

  if !account.active {
    tracing::info!(user_id = %account.user_id, "sign-in refused for disabled account");
    return Err(ApiError::Unauthorized("account is disabled".into()));
  }

  let phc = account.password_hash.as_deref().ok_or_else(bad_credentials)?;
  verify_password(password, phc)?;

  Ok(Identity { user_id: account.user_id, role: account.role })
}

// ─── Extractors ───────────────────────────────────────────────────────────────

/// Any signed-in user, with the email they signed in as.
pub struct Caller {
  pub identity: Identity,
  pub email:    String,
}

/// A signed-in staff member; clients get a 403.
pub struct AdminCaller(pub Identity);

impl<S> FromRequestParts<AppState<S>> for Caller
where
  S: ClientRepository,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let (email, password) = basic_credentials(&parts.headers)?;
    let identity = authenticate(state.store.as_ref(), &email, &password).await?;
    Ok(Caller { identity, email })
  }
}

impl<S> FromRequestParts<AppState<S>> for AdminCaller
where
  S: ClientRepository,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let Caller { identity, .. } = Caller::from_request_parts(parts, state).await?;
    if !identity.is_admin() {
      return Err(ApiError::Forbidden("staff access required".into()));
    }
    Ok(AdminCaller(identity))
  }
}

impl Caller {
  /// 403 unless the caller is staff or `client_id` themselves.
  pub fn ensure_may_view(&self, client_id: &str) -> Result<(), ApiError> {
    if self.identity.may_view_client(client_id) {
      Ok(())
    } else {
      Err(ApiError::Forbidden("you may only view your own record".into()))
    }
  }
}
