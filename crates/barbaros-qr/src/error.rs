//! Error types for badge encoding and scanning.

use std::fmt;

use thiserror::Error;

use crate::resolve::Rejection;

/// Failure to produce a badge image.
#[derive(Debug, Error)]
pub enum CodecError {
  #[error("badge subject id must not be empty")]
  EmptySubject,

  #[error("invalid colour {0:?}: expected #rrggbb or #rrggbbaa")]
  InvalidColour(String),

  #[error("qr encoding failed: {0}")]
  Qr(#[from] qrcode::types::QrError),

  #[error("png encoding failed: {0}")]
  Image(#[from] image::ImageError),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

/// Why a camera could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraFault {
  PermissionDenied,
  NoDevice,
  /// The device is already streaming to someone else.
  DeviceBusy,
  /// The stream died mid-session without reporting an error.
  Lost,
}

impl CameraFault {
  /// What the person at the desk should do about it.
  pub fn remediation(self) -> &'static str {
    match self {
      Self::PermissionDenied => {
        "Camera access was denied. Allow camera access for this site and try again."
      }
      Self::NoDevice => "No camera was found. Connect a camera or upload an image instead.",
      Self::DeviceBusy => {
        "The camera is in use by another application. Close it and try again."
      }
      Self::Lost => "The camera stopped responding. Start the scanner again.",
    }
  }
}

impl fmt::Display for CameraFault {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::PermissionDenied => "permission denied",
      Self::NoDevice => "no camera device",
      Self::DeviceBusy => "camera device busy",
      Self::Lost => "camera stream lost",
    })
  }
}

/// Why an uploaded file was refused before or during image decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadFault {
  NotAnImage { mime: String },
  TooLarge { size: usize, max: usize },
  Unreadable(String),
  Undecodable(String),
}

impl fmt::Display for UploadFault {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::NotAnImage { mime } => {
        write!(f, "{mime:?} is not an image; please select a valid image file")
      }
      Self::TooLarge { size, max } => write!(
        f,
        "image is {size} bytes; please select a file under {} MB",
        max / (1024 * 1024)
      ),
      Self::Unreadable(reason) => write!(f, "unable to read the file: {reason}"),
      Self::Undecodable(reason) => write!(f, "invalid image format: {reason}"),
    }
  }
}

/// Every way a scan can end without a client identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
  #[error("camera unavailable: {0}")]
  CameraUnavailable(CameraFault),

  #[error("unsupported environment: {0}")]
  UnsupportedEnvironment(String),

  #[error("invalid upload: {0}")]
  InvalidUpload(UploadFault),

  #[error("no QR code detected in this image")]
  NoSymbolFound,

  #[error(transparent)]
  Rejected(#[from] Rejection),
}
