//! QR symbol detection over greyscale frames.

use image::GrayImage;

/// Find a QR symbol in `frame` and return its text payload.
///
/// Every candidate grid is tried; the first one that decodes wins. Dark
/// symbols on a light background only; inverted codes are not searched for.
pub fn detect_text(frame: &GrayImage) -> Option<String> {
  let (w, h) = frame.dimensions();
  if w == 0 || h == 0 {
    return None;
  }

  let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
    w as usize,
    h as usize,
    |x, y| frame.get_pixel(x as u32, y as u32).0[0],
  );

  prepared.detect_grids().into_iter().find_map(|grid| match grid.decode() {
    Ok((_meta, text)) => Some(text),
    Err(e) => {
      tracing::debug!(error = %e, "found a grid that did not decode");
      None
    }
  })
}
