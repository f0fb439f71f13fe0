//! Handlers for the front-desk scanner.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/scan` | Staff only; raw image body, `Content-Type: image/*` |
//! | `POST` | `/scan/text` | Staff only; body: `{"raw_text": "..."}` from a client-side decoder |
//!
//! Both resolve the payload to an identifier, then look it up as a record id,
//! client code or badge id. An identifier with no matching client is a 404.

use axum::{
  Json,
  extract::{FromRequestParts, State, rejection::BytesRejection},
  http::{HeaderMap, StatusCode, header, request::Parts},
};
use barbaros_core::{client::ClientRecord, store::ClientRepository};
use barbaros_qr::{
  error::{ScanError, UploadFault},
  resolve::{Resolution, resolve},
  still::{StillImageLimits, scan_still_image, validate_mime},
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{AppState, auth::AdminCaller, clients::find_client, error::ApiError};

const NO_SUCH_CLIENT: &str = "scanned code does not correspond to any existing client";

#[derive(Debug, Serialize)]
pub struct ScanResponse {
  /// `badge`, `document_id`, `client_code` or `verbatim`.
  pub resolution: &'static str,
  pub subject_id: String,
  pub client:     ClientRecord,
}

async fn lookup<S>(store: &S, resolution: Resolution) -> Result<ScanResponse, ApiError>
where
  S: ClientRepository,
{
  let Some(client) = find_client(store, resolution.subject_id()).await? else {
    tracing::info!(
      subject_id = resolution.subject_id(),
      kind = resolution.kind(),
      "scan matched no client"
    );
    return Err(ApiError::NotFound(NO_SUCH_CLIENT.into()));
  };

  tracing::info!(client_id = %client.id, kind = resolution.kind(), "scan resolved");
  Ok(ScanResponse {
    resolution: resolution.kind(),
    subject_id: resolution.into_subject_id(),
    client,
  })
}

// ─── Upload ───────────────────────────────────────────────────────────────────

/// The declared `Content-Type` of an upload, checked to be `image/*` before
/// the body is read.
pub struct UploadMime(pub String);

impl<S> FromRequestParts<S> for UploadMime
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
    let mime = parts
      .headers
      .get(header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .unwrap_or_default()
      .to_owned();
    validate_mime(&mime)?;
    Ok(UploadMime(mime))
  }
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
  headers
    .get(header::CONTENT_LENGTH)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.parse().ok())
}

/// `POST /scan`
pub async fn image<S>(
  _: AdminCaller,
  State(state): State<AppState<S>>,
  UploadMime(mime): UploadMime,
  headers: HeaderMap,
  body: Result<Bytes, BytesRejection>,
) -> Result<Json<ScanResponse>, ApiError>
where
  S: ClientRepository,
{
  let limits = StillImageLimits { max_bytes: state.config.max_upload_bytes };

  let bytes = body.map_err(|rejection| {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
      let size = declared_length(&headers).unwrap_or(limits.max_bytes.saturating_add(1));
      let fault = UploadFault::TooLarge { size, max: limits.max_bytes };
      ApiError::from(ScanError::InvalidUpload(fault))
    } else {
      ApiError::BadRequest(rejection.body_text())
    }
  })?;

  let resolution = scan_still_image(bytes, mime, limits).await.inspect_err(|e| {
    tracing::info!(error = %e, "image scan failed");
  })?;
  Ok(Json(lookup(state.store.as_ref(), resolution).await?))
}

// ─── Text ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TextBody {
  pub raw_text: String,
}

/// `POST /scan/text`
pub async fn text<S>(
  _: AdminCaller,
  State(state): State<AppState<S>>,
  Json(body): Json<TextBody>,
) -> Result<Json<ScanResponse>, ApiError>
where
  S: ClientRepository,
{
  let resolution = resolve(&body.raw_text).map_err(ScanError::from)?;
  Ok(Json(lookup(state.store.as_ref(), resolution).await?))
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  #[test]
  fn declared_length_reads_content_length() {
    let mut headers = HeaderMap::new();
    assert_eq!(declared_length(&headers), None);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("2048"));
    assert_eq!(declared_length(&headers), Some(2048));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("lots"));
    assert_eq!(declared_length(&headers), None);
  }
}
