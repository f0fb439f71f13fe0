//! Turning scanned text into a client identifier.
//!
//! A structured badge is preferred. Anything else is accepted if it merely
//! looks like an identifier, in this order:
//!
//! 1. exactly 24 hex digits, a record id printed by some other tool;
//! 2. `C` plus eight alphanumerics, a bare client code;
//! 3. any text of five or more UTF-16 code units, taken verbatim.
//!
//! Step 3 accepts almost anything. The identifier is only checked against
//! the client store by the caller, which must treat a miss as "scanned code
//! does not correspond to any existing client".

use barbaros_core::id::{is_client_code, is_record_id};
use image::GrayImage;
use serde::Serialize;
use thiserror::Error;

use crate::{badge::decode_badge, detect::detect_text, error::ScanError};

/// Shortest raw text accepted verbatim, in UTF-16 code units. Decoders
/// running in a browser report lengths that way, so an emoji counts twice.
pub const MIN_VERBATIM_LEN: usize = 5;

/// How a scanned payload was turned into an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "subject_id", rename_all = "snake_case")]
pub enum Resolution {
  /// A well-formed `barbaros-client` badge.
  Badge(String),
  /// Raw text shaped like a record id.
  DocumentId(String),
  /// Raw text shaped like a client code.
  ClientCode(String),
  /// Raw text of at least [`MIN_VERBATIM_LEN`] UTF-16 code units.
  Verbatim(String),
}

impl Resolution {
  pub fn subject_id(&self) -> &str {
    match self {
      Self::Badge(id) | Self::DocumentId(id) | Self::ClientCode(id) | Self::Verbatim(id) => id,
    }
  }

  pub fn into_subject_id(self) -> String {
    match self {
      Self::Badge(id) | Self::DocumentId(id) | Self::ClientCode(id) | Self::Verbatim(id) => id,
    }
  }

  pub fn kind(&self) -> &'static str {
    match self {
      Self::Badge(_) => "badge",
      Self::DocumentId(_) => "document_id",
      Self::ClientCode(_) => "client_code",
      Self::Verbatim(_) => "verbatim",
    }
  }

  /// `true` unless the payload was a structured badge.
  pub fn is_fallback(&self) -> bool { !matches!(self, Self::Badge(_)) }
}

/// A symbol was found but its text names no identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a recognized client code")]
pub struct Rejection {
  pub raw_text: String,
}

/// Apply the resolution rules to `raw`.
pub fn resolve(raw: &str) -> Result<Resolution, Rejection> {
  if let Some(badge) = decode_badge(raw) {
    return Ok(Resolution::Badge(badge.subject_id));
  }
  if is_record_id(raw) {
    return Ok(Resolution::DocumentId(raw.to_owned()));
  }
  if is_client_code(raw) {
    return Ok(Resolution::ClientCode(raw.to_owned()));
  }
  if raw.encode_utf16().count() >= MIN_VERBATIM_LEN {
    return Ok(Resolution::Verbatim(raw.to_owned()));
  }
  Err(Rejection { raw_text: raw.to_owned() })
}

// ─── Scan attempts ───────────────────────────────────────────────────────────

/// What one decode cycle produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
  NoSymbolFound,
  Resolved(Resolution),
  Rejected(Rejection),
}

/// One camera frame or one uploaded image, evaluated and then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanAttempt {
  /// Text of the detected symbol, if any.
  pub raw_text: Option<String>,
  pub outcome:  ScanOutcome,
}

impl ScanAttempt {
  /// Resolve already-extracted symbol text.
  pub fn evaluate(raw_text: Option<String>) -> Self {
    let outcome = match raw_text.as_deref() {
      None => ScanOutcome::NoSymbolFound,
      Some(raw) => match resolve(raw) {
        Ok(resolution) => ScanOutcome::Resolved(resolution),
        Err(rejection) => ScanOutcome::Rejected(rejection),
      },
    };
    Self { raw_text, outcome }
  }

  pub fn into_result(self) -> Result<Resolution, ScanError> {
    match self.outcome {
      ScanOutcome::NoSymbolFound => Err(ScanError::NoSymbolFound),
      ScanOutcome::Resolved(resolution) => Ok(resolution),
      ScanOutcome::Rejected(rejection) => Err(ScanError::Rejected(rejection)),
    }
  }
}

/// Detect a symbol in `frame` and resolve it.
pub fn scan_frame(frame: &GrayImage) -> ScanAttempt {
  let attempt = ScanAttempt::evaluate(detect_text(frame));
  match &attempt.outcome {
    ScanOutcome::NoSymbolFound => {}
    ScanOutcome::Resolved(resolution) => tracing::debug!(
      kind = resolution.kind(),
      subject_id = resolution.subject_id(),
      "resolved scanned symbol"
    ),
    ScanOutcome::Rejected(rejection) => tracing::warn!(
      raw_text = %rejection.raw_text,
      "scanned symbol is not a recognized client code"
    ),
  }
  attempt
}
