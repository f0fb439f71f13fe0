//! Camera devices and the runtime that provides them.
//!
//! The scanner does not talk to hardware directly. A [`CameraBackend`]
//! enumerates devices and opens streams; a [`VideoStream`] hands out frames
//! until it is stopped. [`FeedCamera`] is a backend whose frames are pushed
//! in by another component, e.g. frames relayed from a browser at the desk.

use std::{
  future::Future,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::error::{CameraFault, ScanError};

/// Labels that usually mean "the camera facing away from the user".
const REAR_LABEL_HINTS: [&str; 3] = ["back", "rear", "environment"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDevice {
  pub id:    String,
  pub label: String,
}

/// Pick the camera to scan with: with several devices, the first whose label
/// suggests a rear-facing camera; otherwise the first device.
///
/// Label matching is English-only and best effort.
pub fn select_device(devices: &[CameraDevice]) -> Option<&CameraDevice> {
  if devices.len() > 1 {
    let rear = devices.iter().find(|d| {
      let label = d.label.to_lowercase();
      REAR_LABEL_HINTS.iter().any(|hint| label.contains(hint))
    });
    if rear.is_some() {
      return rear;
    }
  }
  devices.first()
}

/// An open camera stream.
pub trait VideoStream: Send + 'static {
  fn device_id(&self) -> &str;

  /// The current frame, or `None` if no frame is ready yet.
  fn capture(
    &mut self,
  ) -> impl Future<Output = Result<Option<GrayImage>, ScanError>> + Send + '_;

  /// Stop all tracks and release the device. Must be idempotent.
  fn stop(&mut self);
}

/// Something that can enumerate and open cameras.
pub trait CameraBackend: Send + Sync + 'static {
  type Stream: VideoStream;

  /// Fail with [`ScanError::UnsupportedEnvironment`] when cameras cannot be
  /// used at all here (e.g. an insecure browser context).
  fn check_environment(&self) -> Result<(), ScanError> { Ok(()) }

  fn devices(
    &self,
  ) -> impl Future<Output = Result<Vec<CameraDevice>, ScanError>> + Send + '_;

  fn open<'a>(
    &'a self,
    device_id: &'a str,
  ) -> impl Future<Output = Result<Self::Stream, ScanError>> + Send + 'a;
}

// ─── FeedCamera ──────────────────────────────────────────────────────────────

struct FeedDevice {
  info:   CameraDevice,
  /// Taken by the open stream; `None` while the device is busy.
  frames: Option<mpsc::Receiver<GrayImage>>,
}

#[derive(Default)]
struct FeedState {
  devices: Vec<FeedDevice>,
}

fn lock(state: &Mutex<FeedState>) -> MutexGuard<'_, FeedState> {
  state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A camera backend fed by [`FrameFeeder`]s.
///
/// Cloning is cheap; clones share the same devices.
#[derive(Clone, Default)]
pub struct FeedCamera {
  state: Arc<Mutex<FeedState>>,
}

/// The producing end of a [`FeedCamera`] device.
#[derive(Clone)]
pub struct FrameFeeder {
  frames: mpsc::Sender<GrayImage>,
}

impl FrameFeeder {
  /// Offer a frame. Frames are dropped when the buffer is full, as a real
  /// camera would drop them; returns `false` in that case or once the device
  /// is gone.
  pub fn push(&self, frame: GrayImage) -> bool { self.frames.try_send(frame).is_ok() }
}

impl FeedCamera {
  pub fn new() -> Self { Self::default() }

  /// Register a device buffering up to `buffer` frames.
  pub fn add_device(
    &self,
    id: impl Into<String>,
    label: impl Into<String>,
    buffer: usize,
  ) -> FrameFeeder {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    lock(&self.state).devices.push(FeedDevice {
      info:   CameraDevice { id: id.into(), label: label.into() },
      frames: Some(rx),
    });
    FrameFeeder { frames: tx }
  }
}

impl CameraBackend for FeedCamera {
  type Stream = FeedStream;

  async fn devices(&self) -> Result<Vec<CameraDevice>, ScanError> {
    Ok(lock(&self.state).devices.iter().map(|d| d.info.clone()).collect())
  }

  async fn open<'a>(&'a self, device_id: &'a str) -> Result<FeedStream, ScanError> {
    let mut state = lock(&self.state);
    let device = state
      .devices
      .iter_mut()
      .find(|d| d.info.id == device_id)
      .ok_or(ScanError::CameraUnavailable(CameraFault::NoDevice))?;
    let frames = device
      .frames
      .take()
      .ok_or(ScanError::CameraUnavailable(CameraFault::DeviceBusy))?;

    Ok(FeedStream {
      device_id: device_id.to_owned(),
      frames:    Some(frames),
      home:      Arc::clone(&self.state),
    })
  }
}

/// A stream over a [`FeedCamera`] device. Stopping (or dropping) it hands the
/// device back so it can be opened again.
pub struct FeedStream {
  device_id: String,
  frames:    Option<mpsc::Receiver<GrayImage>>,
  home:      Arc<Mutex<FeedState>>,
}

impl VideoStream for FeedStream {
  fn device_id(&self) -> &str { &self.device_id }

  async fn capture(&mut self) -> Result<Option<GrayImage>, ScanError> {
    let frames = self
      .frames
      .as_mut()
      .ok_or(ScanError::CameraUnavailable(CameraFault::NoDevice))?;

    // Skip to the newest frame; older ones are stale.
    let mut latest = None;
    loop {
      match frames.try_recv() {
        Ok(frame) => latest = Some(frame),
        Err(TryRecvError::Empty) => return Ok(latest),
        Err(TryRecvError::Disconnected) => {
          return match latest {
            Some(frame) => Ok(Some(frame)),
            None => Err(ScanError::CameraUnavailable(CameraFault::NoDevice)),
          };
        }
      }
    }
  }

  fn stop(&mut self) {
    let Some(frames) = self.frames.take() else { return };
    let mut state = lock(&self.home);
    if let Some(device) = state.devices.iter_mut().find(|d| d.info.id == self.device_id) {
      device.frames = Some(frames);
    }
  }
}

impl Drop for FeedStream {
  fn drop(&mut self) { self.stop(); }
}

#[cfg(test)]
mod tests {
  use image::Luma;

  use super::*;

  fn device(id: &str, label: &str) -> CameraDevice {
    CameraDevice { id: id.into(), label: label.into() }
  }

  #[test]
  fn prefers_rear_camera_when_several() {
    let devices = [
      device("0", "FaceTime HD Camera (front)"),
      device("1", "Back Camera"),
      device("2", "Environment facing"),
    ];
    assert_eq!(select_device(&devices).unwrap().id, "1");

    let devices = [device("0", "front"), device("1", "camera2 0, facing ENVIRONMENT")];
    assert_eq!(select_device(&devices).unwrap().id, "1");
  }

  #[test]
  fn falls_back_to_first_device() {
    let devices = [device("0", "USB Webcam"), device("1", "Integrated Camera")];
    assert_eq!(select_device(&devices).unwrap().id, "0");
  }

  #[test]
  fn single_device_is_used_whatever_its_label() {
    let devices = [device("0", "front")];
    assert_eq!(select_device(&devices).unwrap().id, "0");
    assert!(select_device(&[]).is_none());
  }

  #[tokio::test]
  async fn feed_device_is_exclusive_until_stopped() {
    let camera = FeedCamera::new();
    let _feeder = camera.add_device("desk", "Desk camera", 4);

    let mut stream = camera.open("desk").await.unwrap();
    assert_eq!(
      camera.open("desk").await.err(),
      Some(ScanError::CameraUnavailable(CameraFault::DeviceBusy))
    );

    stream.stop();
    stream.stop();
    assert!(camera.open("desk").await.is_ok());
  }

  #[tokio::test]
  async fn dropping_a_stream_releases_the_device() {
    let camera = FeedCamera::new();
    let _feeder = camera.add_device("desk", "Desk camera", 4);
    drop(camera.open("desk").await.unwrap());
    assert!(camera.open("desk").await.is_ok());
  }

  #[tokio::test]
  async fn unknown_device_is_reported() {
    let camera = FeedCamera::new();
    assert_eq!(
      camera.open("nope").await.err(),
      Some(ScanError::CameraUnavailable(CameraFault::NoDevice))
    );
  }

  #[tokio::test]
  async fn capture_returns_newest_frame() {
    let camera = FeedCamera::new();
    let feeder = camera.add_device("desk", "Desk camera", 4);
    let mut stream = camera.open("desk").await.unwrap();

    assert_eq!(stream.capture().await.unwrap(), None);

    feeder.push(GrayImage::from_pixel(1, 1, Luma([1])));
    feeder.push(GrayImage::from_pixel(1, 1, Luma([2])));
    let frame = stream.capture().await.unwrap().unwrap();
    assert_eq!(frame.get_pixel(0, 0).0[0], 2);
  }

  #[tokio::test]
  async fn capture_fails_once_the_feeder_is_gone() {
    let camera = FeedCamera::new();
    let feeder = camera.add_device("desk", "Desk camera", 4);
    let mut stream = camera.open("desk").await.unwrap();
    drop(feeder);
    assert_eq!(
      stream.capture().await,
      Err(ScanError::CameraUnavailable(CameraFault::NoDevice))
    );
  }
}
