//! Handlers for sign-up and sign-in.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/register` | Body: [`RegisterBody`]; 201 with the new client |
//! | `POST` | `/login` | Body: `{"email","password"}`; 200 with a [`Profile`] |
//! | `GET`  | `/me` | The caller's [`Profile`] |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use barbaros_core::{
  account::{Identity, Role},
  client::{ClientRecord, NewClient},
  store::ClientRepository,
};
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  auth::{Caller, authenticate, hash_password},
  error::ApiError,
};

/// Who is signed in. Clients also get their full record.
#[derive(Debug, Serialize)]
pub struct Profile {
  pub user_id: String,
  pub role:    Role,
  pub name:    String,
  pub email:   String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub client:  Option<ClientRecord>,
}

async fn profile<S>(store: &S, identity: Identity, email: &str) -> Result<Profile, ApiError>
where
  S: ClientRepository,
{
  let gone = || ApiError::NotFound("account not found".into());

  match identity.role {
    Role::Admin => {
      let admin = store
        .find_admin_by_email(email)
        .await
        .map_err(ApiError::store)?
        .ok_or_else(gone)?;
      Ok(Profile {
        user_id: admin.id,
        role:    Role::Admin,
        name:    admin.name,
        email:   admin.email,
        client:  None,
      })
    }
    Role::Client => {
      let client = store
        .find_by_id(&identity.user_id)
        .await
        .map_err(ApiError::store)?
        .ok_or_else(gone)?;
      Ok(Profile {
        user_id: client.id.clone(),
        role:    Role::Client,
        name:    client.full_name(),
        email:   client.email.clone(),
        client:  Some(client),
      })
    }
  }
}

// ─── Register ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterBody {
  pub first_name:   String,
  pub last_name:    String,
  pub email:        String,
  pub phone_number: String,
  pub password:     String,
}

/// `POST /register`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ClientRepository,
{
  let fields = [
    &body.first_name,
    &body.last_name,
    &body.email,
    &body.phone_number,
    &body.password,
  ];
  if fields.iter().any(|f| f.trim().is_empty()) {
    return Err(ApiError::BadRequest("all fields are required".into()));
  }

  let existing = state.store.find_account(&body.email).await.map_err(ApiError::store)?;
  if existing.is_some() {
    return Err(ApiError::Conflict("an account with this email already exists".into()));
  }

  let password = body.password;
  let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
    .await
    .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))??;

  let client = state
    .store
    .create_client(NewClient {
      client_code:        None,
      first_name:         body.first_name,
      last_name:          body.last_name,
      email:              body.email,
      phone_number:       body.phone_number,
      password_hash:      Some(password_hash),
      preferred_services: Vec::new(),
    })
    .await
    .map_err(ApiError::store)?;

  tracing::info!(client_id = %client.id, client_code = %client.client_code, "client registered");
  Ok((StatusCode::CREATED, Json(client)))
}

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

/// `POST /login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<Profile>, ApiError>
where
  S: ClientRepository,
{
  let identity = authenticate(state.store.as_ref(), &body.email, &body.password).await?;
  state
    .store
    .touch_login(&identity.user_id, identity.role)
    .await
    .map_err(ApiError::store)?;

  tracing::info!(user_id = %identity.user_id, role = ?identity.role, "signed in");
  Ok(Json(profile(state.store.as_ref(), identity, &body.email).await?))
}

// ─── Me ───────────────────────────────────────────────────────────────────────

/// `GET /me`
pub async fn me<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
) -> Result<Json<Profile>, ApiError>
where
  S: ClientRepository,
{
  Ok(Json(profile(state.store.as_ref(), caller.identity, &caller.email).await?))
}
