//! Handlers for `/clients/{id}/qrcode`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/clients/{id}/qrcode` | Staff or the client; `?format=png` for raw bytes |
//! | `POST` | `/clients/{id}/qrcode` | Staff only; mints a fresh badge id |
//!
//! The first `GET` pins the client's badge id to their client code, so the
//! printed badge stays valid until staff rotate it.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::header,
  response::{IntoResponse, Response},
};
use barbaros_core::{
  client::{ClientRecord, ClientSummary},
  store::ClientRepository,
};
use barbaros_qr::render::{RenderOptions, encode_badge};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
  ApiConfig, AppState,
  auth::{AdminCaller, Caller},
  clients::resolve_client,
  error::ApiError,
};

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeFormat {
  #[default]
  Json,
  Png,
}

#[derive(Debug, Default, Deserialize)]
pub struct BadgeParams {
  #[serde(default)]
  pub format: BadgeFormat,
}

#[derive(Debug, Serialize)]
pub struct BadgeResponse {
  pub subject_id: String,
  /// The exact text encoded in the symbol.
  pub payload:    String,
  /// `data:image/png;base64,...`
  pub qr_code:    String,
  pub width:      u32,
  pub issued_at:  Option<i64>,
  pub client:     ClientSummary,
}

fn render(
  client: &ClientRecord,
  subject_id: &str,
  config: &ApiConfig,
  format: BadgeFormat,
) -> Result<Response, ApiError> {
  let options = RenderOptions { width: config.badge_width, ..RenderOptions::default() };
  let image = encode_badge(subject_id, &options)?;

  Ok(match format {
    BadgeFormat::Png => ([(header::CONTENT_TYPE, "image/png")], image.png).into_response(),
    BadgeFormat::Json => Json(BadgeResponse {
      qr_code:    image.data_url(),
      subject_id: image.badge.subject_id,
      payload:    image.payload,
      width:      image.width,
      issued_at:  image.badge.issued_at,
      client:     ClientSummary::from(client),
    })
    .into_response(),
  })
}

/// `GET /clients/{id}/qrcode[?format=png]`
pub async fn issue<S>(
  caller: Caller,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  Query(params): Query<BadgeParams>,
) -> Result<Response, ApiError>
where
  S: ClientRepository,
{
  let mut client = resolve_client(state.store.as_ref(), &id).await?;
  caller.ensure_may_view(&client.id)?;

  if client.badge_id.is_none() {
    let code = client.client_code.clone();
    client = state
      .store
      .set_badge_id(&client.id, &code)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::NotFound(format!("client {id} not found")))?;
    tracing::info!(client_id = %client.id, badge_id = %code, "badge issued");
  }

  let subject = client.badge_subject().to_owned();
  render(&client, &subject, &state.config, params.format)
}

/// `POST /clients/{id}/qrcode[?format=png]`
///
/// Replaces the badge id with `<client_code>-<millis>`. A previously rotated
/// id stops resolving; the client code itself always does.
pub async fn rotate<S>(
  AdminCaller(admin): AdminCaller,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  Query(params): Query<BadgeParams>,
) -> Result<Response, ApiError>
where
  S: ClientRepository,
{
  let client = resolve_client(state.store.as_ref(), &id).await?;
  let badge_id = format!("{}-{}", client.client_code, Utc::now().timestamp_millis());

  let client = state
    .store
    .set_badge_id(&client.id, &badge_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("client {id} not found")))?;

  tracing::info!(client_id = %client.id, %badge_id, by = %admin.user_id, "badge rotated");
  render(&client, &badge_id, &state.config, params.format)
}
