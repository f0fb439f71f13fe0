//! Scanning an uploaded image.
//!
//! A single pass per upload: validate, decode, detect, resolve. Nothing is
//! shared between concurrent uploads.

use crate::{
  error::{ScanError, UploadFault},
  resolve::{Resolution, scan_frame},
};

/// Largest upload accepted when not configured otherwise: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StillImageLimits {
  /// Inclusive upper bound on the file size in bytes.
  pub max_bytes: usize,
}

impl Default for StillImageLimits {
  fn default() -> Self { Self { max_bytes: DEFAULT_MAX_UPLOAD_BYTES } }
}

/// Refuse anything not declared as `image/*`. Parameters and case are
/// ignored.
pub fn validate_mime(mime: &str) -> Result<(), ScanError> {
  let essence = mime.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
  if !essence.starts_with("image/") {
    return Err(ScanError::InvalidUpload(UploadFault::NotAnImage { mime: mime.to_owned() }));
  }
  Ok(())
}

/// Check the declared type and the size of an upload. Runs before any
/// decoding so that oversized or foreign files cost nothing.
pub fn validate_upload(
  size: usize,
  mime: &str,
  limits: &StillImageLimits,
) -> Result<(), ScanError> {
  validate_mime(mime)?;
  if size > limits.max_bytes {
    return Err(ScanError::InvalidUpload(UploadFault::TooLarge {
      size,
      max: limits.max_bytes,
    }));
  }
  if size == 0 {
    return Err(ScanError::InvalidUpload(UploadFault::Unreadable("file is empty".into())));
  }
  Ok(())
}

/// The synchronous pipeline: validate, decode, detect, resolve.
pub fn scan_image_bytes(
  bytes: &[u8],
  mime: &str,
  limits: &StillImageLimits,
) -> Result<Resolution, ScanError> {
  validate_upload(bytes.len(), mime, limits)?;

  let image = image::load_from_memory(bytes)
    .map_err(|e| ScanError::InvalidUpload(UploadFault::Undecodable(e.to_string())))?;
  tracing::debug!(width = image.width(), height = image.height(), mime, "decoded upload");

  scan_frame(&image.to_luma8()).into_result()
}

/// Scan an uploaded file on a blocking thread.
pub async fn scan_still_image(
  bytes: impl AsRef<[u8]> + Send + 'static,
  mime: String,
  limits: StillImageLimits,
) -> Result<Resolution, ScanError> {
  // Cheap checks first, without leaving the async thread.
  validate_upload(bytes.as_ref().len(), &mime, &limits)?;

  tokio::task::spawn_blocking(move || scan_image_bytes(bytes.as_ref(), &mime, &limits))
    .await
    .map_err(|e| ScanError::InvalidUpload(UploadFault::Unreadable(e.to_string())))?
}
