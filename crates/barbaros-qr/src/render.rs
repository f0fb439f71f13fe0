//! Rendering badge payloads as PNG QR symbols.

use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use image::{ImageFormat, Rgba, RgbaImage};
use qrcode::{Color, EcLevel, QrCode};

use crate::{badge::Badge, error::CodecError};

/// Quiet zone, in modules, below which scanners start to struggle.
pub const MIN_MARGIN: u32 = 2;

/// How a badge is drawn. Error correction is always level H so that worn or
/// partly covered printouts still scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
  /// Edge length of the square image in pixels.
  pub width:  u32,
  /// Quiet zone in modules; raised to [`MIN_MARGIN`] if smaller.
  pub margin: u32,
  /// `#rrggbb` or `#rrggbbaa`.
  pub dark:   String,
  pub light:  String,
}

impl Default for RenderOptions {
  fn default() -> Self {
    Self {
      width:  300,
      margin: MIN_MARGIN,
      dark:   "#000000".to_owned(),
      light:  "#ffffff".to_owned(),
    }
  }
}

/// An issued badge: the payload and its rendering.
#[derive(Debug, Clone)]
pub struct BadgeImage {
  pub badge:   Badge,
  pub payload: String,
  pub png:     Vec<u8>,
  pub width:   u32,
}

impl BadgeImage {
  /// `data:image/png;base64,...`, ready for an `<img src>` or a download link.
  pub fn data_url(&self) -> String {
    format!("data:image/png;base64,{}", B64.encode(&self.png))
  }
}

/// Issue a badge for `subject_id` and render it as a PNG.
pub fn encode_badge(
  subject_id: &str,
  options: &RenderOptions,
) -> Result<BadgeImage, CodecError> {
  let badge = Badge::issue(subject_id)?;
  let payload = badge.to_payload()?;
  let image = render_symbol(&payload, options)?;

  let mut png = Vec::new();
  image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

  tracing::debug!(subject_id, width = image.width(), bytes = png.len(), "rendered badge");

  Ok(BadgeImage { badge, payload, png, width: image.width() })
}

/// Draw `text` as a QR symbol.
///
/// Modules share one integer scale so every module is the same size; pixels
/// left over after scaling widen the quiet zone evenly on all sides. If
/// `options.width` cannot fit the symbol at one pixel per module, the image
/// grows to the smallest size that can.
pub fn render_symbol(
  text: &str,
  options: &RenderOptions,
) -> Result<RgbaImage, CodecError> {
  let dark = parse_colour(&options.dark)?;
  let light = parse_colour(&options.light)?;

  let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::H)?;
  let modules = code.width() as u32;
  let colours = code.to_colors();

  let margin = options.margin.max(MIN_MARGIN);
  let span = modules + 2 * margin;
  let size = options.width.max(span);
  let scale = size / span;
  let origin = (size - span * scale) / 2 + margin * scale;
  let extent = modules * scale;

  Ok(RgbaImage::from_fn(size, size, |x, y| {
    if x < origin || y < origin || x >= origin + extent || y >= origin + extent {
      return light;
    }
    let (mx, my) = ((x - origin) / scale, (y - origin) / scale);
    match colours[(my * modules + mx) as usize] {
      Color::Dark => dark,
      Color::Light => light,
    }
  }))
}

fn parse_colour(s: &str) -> Result<Rgba<u8>, CodecError> {
  let invalid = || CodecError::InvalidColour(s.to_owned());
  let hex = s.strip_prefix('#').ok_or_else(invalid)?;
  if !(hex.len() == 6 || hex.len() == 8) || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
    return Err(invalid());
  }

  let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
  let alpha = if hex.len() == 8 { channel(6)? } else { u8::MAX };
  Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, alpha]))
}
