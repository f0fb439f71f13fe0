//! The JSON payload embedded in every client badge.
//!
//! Wire shape, which printed badges depend on:
//!
//! ```json
//! {"id":"C12345678","type":"barbaros-client","timestamp":1718000000000}
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CodecError;

/// Type tag that marks a payload as a client badge.
pub const BADGE_KIND: &str = "barbaros-client";

/// A decoded or freshly issued badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
  #[serde(rename = "id")]
  pub subject_id: String,
  #[serde(rename = "type")]
  pub kind:       String,
  /// Milliseconds since the epoch at issue time. Informational only; badges
  /// do not expire.
  #[serde(rename = "timestamp")]
  pub issued_at:  Option<i64>,
}

impl Badge {
  /// A badge for `subject_id` stamped with the current time.
  pub fn issue(subject_id: impl Into<String>) -> Result<Self, CodecError> {
    let subject_id = subject_id.into();
    if subject_id.is_empty() {
      return Err(CodecError::EmptySubject);
    }
    Ok(Self {
      subject_id,
      kind: BADGE_KIND.to_owned(),
      issued_at: Some(Utc::now().timestamp_millis()),
    })
  }

  pub fn to_payload(&self) -> Result<String, CodecError> {
    Ok(serde_json::to_string(self)?)
  }
}

/// The text to embed in a QR symbol for `subject_id`.
pub fn badge_payload(subject_id: &str) -> Result<String, CodecError> {
  Badge::issue(subject_id)?.to_payload()
}

/// Parse scanned text as a badge.
///
/// Returns `None` for anything that is not a JSON object tagged
/// [`BADGE_KIND`] with a non-empty string `id`. Scanning a QR code that is not
/// a badge is routine, so this never errors.
pub fn decode_badge(raw: &str) -> Option<Badge> {
  let value: Value = match serde_json::from_str(raw) {
    Ok(v) => v,
    Err(e) => {
      tracing::trace!(error = %e, "scanned text is not json");
      return None;
    }
  };
  let object = value.as_object()?;

  if object.get("type").and_then(Value::as_str) != Some(BADGE_KIND) {
    return None;
  }

  let subject_id = object.get("id").and_then(Value::as_str)?;
  if subject_id.is_empty() {
    return None;
  }

  Some(Badge {
    subject_id: subject_id.to_owned(),
    kind:       BADGE_KIND.to_owned(),
    issued_at:  object.get("timestamp").and_then(Value::as_i64),
  })
}
