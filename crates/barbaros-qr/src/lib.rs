//! Client badges and the scanner that reads them back.
//!
//! Two halves:
//!
//! - the **badge codec** ([`badge`], [`render`]) turns a client identifier
//!   into a QR symbol carrying `{"id", "type": "barbaros-client",
//!   "timestamp"}` and parses that JSON back;
//! - the **scan resolver** ([`resolve`], [`still`], [`live`]) pulls a QR
//!   payload out of an uploaded image or a stream of camera frames and turns
//!   it into a client identifier, falling back to identifier-shaped raw text
//!   when the payload is not a badge.
//!
//! Resolution stops at an identifier. Looking that identifier up in the
//! client store, and reporting a miss, is the caller's job.

pub mod badge;
pub mod camera;
pub mod detect;
pub mod error;
pub mod live;
pub mod render;
pub mod resolve;
pub mod still;

pub use badge::{BADGE_KIND, Badge, badge_payload, decode_badge};
pub use camera::{CameraBackend, CameraDevice, FeedCamera, VideoStream, select_device};
pub use error::{CameraFault, CodecError, ScanError, UploadFault};
pub use live::{LiveScan, LiveScanConfig, ScanEvent, SessionState};
pub use render::{BadgeImage, RenderOptions, encode_badge};
pub use resolve::{Rejection, Resolution, ScanAttempt, ScanOutcome, resolve};
pub use still::{StillImageLimits, scan_still_image, validate_mime};
