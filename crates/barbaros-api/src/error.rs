//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use barbaros_core::Error as CoreError;
use barbaros_qr::{CodecError, ScanError, UploadFault};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// The request was understood but its content cannot be acted on.
  #[error("unprocessable: {0}")]
  Unprocessable(String),

  #[error("payload too large: {0}")]
  PayloadTooLarge(String),

  #[error("unsupported media type: {0}")]
  UnsupportedMediaType(String),

  #[error("internal error: {0}")]
  Internal(String),

  #[error("badge error: {0}")]
  Codec(#[from] CodecError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a store failure. Domain errors anywhere in the source chain
  /// get their own status; anything else is a 500.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    let mut cause: Option<&(dyn std::error::Error + 'static)> = Some(&e);
    while let Some(err) = cause {
      if let Some(core) = err.downcast_ref::<CoreError>() {
        return Self::from_core(core);
      }
      cause = err.source();
    }
    tracing::error!(error = %e, "store failure");
    Self::Store(Box::new(e))
  }

  fn from_core(e: &CoreError) -> Self {
    let message = e.to_string();
    match e {
      CoreError::ClientNotFound(_) | CoreError::VisitNotFound(_) => Self::NotFound(message),
      CoreError::EmailInUse(_)
      | CoreError::CategoryNameInUse(_)
      | CoreError::NoRewardAvailable(_) => Self::Conflict(message),
      CoreError::Validation { .. } => Self::BadRequest(message),
      CoreError::Serialization(_) => Self::Internal(message),
    }
  }
}

impl From<ScanError> for ApiError {
  fn from(e: ScanError) -> Self {
    let message = e.to_string();
    match e {
      ScanError::InvalidUpload(UploadFault::TooLarge { .. }) => Self::PayloadTooLarge(message),
      ScanError::InvalidUpload(UploadFault::NotAnImage { .. }) => {
        Self::UnsupportedMediaType(message)
      }
      ScanError::InvalidUpload(_) => Self::BadRequest(message),
      ScanError::NoSymbolFound | ScanError::Rejected(_) => Self::Unprocessable(message),
      ScanError::CameraUnavailable(fault) => Self::Unprocessable(fault.remediation().to_owned()),
      ScanError::UnsupportedEnvironment(_) => Self::Unprocessable(message),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
      ApiError::PayloadTooLarge(m) => (StatusCode::PAYLOAD_TOO_LARGE, m.clone()),
      ApiError::UnsupportedMediaType(m) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, m.clone()),
      ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
      ApiError::Codec(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"barbaros\""),
      );
    }
    res
  }
}
