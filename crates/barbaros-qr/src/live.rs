//! Live scanning: poll a camera stream until a client badge turns up.
//!
//! A [`LiveScan`] owns at most one open stream at a time. While a session is
//! active a worker task captures the current frame every
//! [`LiveScanConfig::cadence`], decodes it off the async runtime and reports
//! through an event channel. Ticks that fall due while a decode is still
//! running are skipped, never queued.
//!
//! ```text
//! Idle ──start──▶ Initializing ──▶ Active ──resolved / stop──▶ Stopped
//!                      │              │
//!                      └──────────────┴──camera fault──▶ Failed
//! ```
//!
//! The stream is released on every way out of `Active`: a resolved badge,
//! [`LiveScan::stop`], [`LiveScan::switch_device`], a capture error, a
//! panicking backend, and dropping the `LiveScan` itself.

use std::{sync::Arc, time::Duration};

use tokio::{
  sync::{mpsc, oneshot, watch},
  task::{self, JoinError, JoinHandle},
  time::{self, Interval, MissedTickBehavior},
};

use crate::{
  camera::{CameraBackend, CameraDevice, VideoStream, select_device},
  error::{CameraFault, ScanError},
  resolve::{Rejection, Resolution, ScanOutcome, scan_frame},
};

pub const DEFAULT_CADENCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
  Idle,
  Initializing,
  Active { device_id: String },
  Stopped,
  Failed(ScanError),
}

/// Reported to whoever started the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
  Resolved(Resolution),
  /// A symbol was seen but not recognised; the session keeps scanning.
  Rejected(Rejection),
  Failed(ScanError),
  Stopped,
}

#[derive(Debug, Clone)]
pub struct LiveScanConfig {
  pub cadence:          Duration,
  /// Device to open instead of the rear-camera guess, if it is present.
  pub preferred_device: Option<String>,
  pub event_buffer:     usize,
}

impl Default for LiveScanConfig {
  fn default() -> Self {
    Self { cadence: DEFAULT_CADENCE, preferred_device: None, event_buffer: 16 }
  }
}

struct Worker {
  stop:      oneshot::Sender<()>,
  handle:    JoinHandle<WorkerExit>,
  device_id: String,
}

enum WorkerExit {
  /// Told to stop; hands back the event sender so the session can go on.
  Halted(mpsc::Sender<ScanEvent>),
  /// Ended on its own after resolving or failing.
  Finished,
}

pub struct LiveScan<B: CameraBackend> {
  backend: Arc<B>,
  config:  LiveScanConfig,
  state:   Arc<watch::Sender<SessionState>>,
  worker:  Option<Worker>,
}

impl<B: CameraBackend> LiveScan<B> {
  pub fn new(backend: B, config: LiveScanConfig) -> Self {
    Self {
      backend: Arc::new(backend),
      config,
      state: Arc::new(watch::Sender::new(SessionState::Idle)),
      worker: None,
    }
  }

  pub fn state(&self) -> SessionState { self.state.borrow().clone() }

  /// Watch state transitions.
  pub fn subscribe(&self) -> watch::Receiver<SessionState> { self.state.subscribe() }

  /// The device currently streaming, if any. A worker that has already
  /// resolved or failed no longer counts.
  pub fn active_device(&self) -> Option<&str> {
    if !matches!(*self.state.borrow(), SessionState::Active { .. }) {
      return None;
    }
    self.worker.as_ref().map(|w| w.device_id.as_str())
  }

  pub async fn devices(&self) -> Result<Vec<CameraDevice>, ScanError> {
    self.backend.check_environment()?;
    self.backend.devices().await
  }

  /// Open a camera and start scanning.
  ///
  /// Any session already running is stopped first; its event channel closes
  /// without a [`ScanEvent::Stopped`]. Acquisition failures are returned and
  /// leave the session `Failed`; nothing is retried.
  pub async fn start(&mut self) -> Result<mpsc::Receiver<ScanEvent>, ScanError> {
    self.halt().await;
    self.state.send_replace(SessionState::Initializing);

    let stream = match self.acquire(None).await {
      Ok(stream) => stream,
      Err(error) => return Err(self.fail(error)),
    };
    let (events, receiver) = mpsc::channel(self.config.event_buffer.max(1));
    self.launch(stream, events);
    Ok(receiver)
  }

  /// Stop scanning and release the camera. Does nothing unless a session is
  /// actually scanning, so it is safe to call from any state, repeatedly.
  pub async fn stop(&mut self) {
    if let Some(WorkerExit::Halted(events)) = self.halt().await {
      self.state.send_replace(SessionState::Stopped);
      let _ = events.try_send(ScanEvent::Stopped);
      tracing::debug!("live scan stopped");
    }
  }

  /// Move the running session to another camera.
  ///
  /// The current stream is stopped, and its worker joined, before the new
  /// device is opened. Without a running session this only changes which
  /// device the next [`start`](Self::start) prefers.
  pub async fn switch_device(&mut self, device_id: &str) -> Result<(), ScanError> {
    self.config.preferred_device = Some(device_id.to_owned());

    let Some(WorkerExit::Halted(events)) = self.halt().await else {
      return Ok(());
    };
    self.state.send_replace(SessionState::Initializing);

    match self.acquire(Some(device_id)).await {
      Ok(stream) => {
        self.launch(stream, events);
        Ok(())
      }
      Err(error) => {
        let _ = events.try_send(ScanEvent::Failed(error.clone()));
        Err(self.fail(error))
      }
    }
  }

  async fn acquire(&self, requested: Option<&str>) -> Result<B::Stream, ScanError> {
    self.backend.check_environment()?;
    let devices = self.backend.devices().await?;

    let device = match requested {
      Some(id) => devices.iter().find(|d| d.id == id),
      None => self
        .config
        .preferred_device
        .as_deref()
        .and_then(|id| devices.iter().find(|d| d.id == id))
        .or_else(|| select_device(&devices)),
    }
    .ok_or(ScanError::CameraUnavailable(CameraFault::NoDevice))?;

    tracing::debug!(device_id = %device.id, label = %device.label, "opening camera");
    self.backend.open(&device.id).await
  }

  fn launch(&mut self, stream: B::Stream, events: mpsc::Sender<ScanEvent>) {
    let device_id = stream.device_id().to_owned();
    let (stop, stop_rx) = oneshot::channel();

    // Publish Active before the worker can publish anything else.
    self.state.send_replace(SessionState::Active { device_id: device_id.clone() });
    let scanner = tokio::spawn(run(
      stream,
      self.config.cadence,
      Arc::clone(&self.state),
      events.clone(),
      stop_rx,
    ));
    let handle = tokio::spawn(supervise(
      scanner,
      device_id.clone(),
      Arc::clone(&self.state),
      events,
    ));
    self.worker = Some(Worker { stop, handle, device_id });
  }

  /// Signal the worker and wait until it has released its stream.
  async fn halt(&mut self) -> Option<WorkerExit> {
    let worker = self.worker.take()?;
    let _ = worker.stop.send(());
    match worker.handle.await {
      Ok(exit) => Some(exit),
      Err(error) => {
        self.fail(worker_lost(&error, &worker.device_id));
        None
      }
    }
  }

  fn fail(&self, error: ScanError) -> ScanError {
    tracing::warn!(%error, "live scan failed");
    self.state.send_replace(SessionState::Failed(error.clone()));
    error
  }
}

impl<B: CameraBackend> Drop for LiveScan<B> {
  fn drop(&mut self) {
    // The worker drops its stream as soon as it sees the signal.
    if let Some(worker) = self.worker.take() {
      let _ = worker.stop.send(());
    }
  }
}

// ─── Worker ──────────────────────────────────────────────────────────────────

fn worker_lost(error: &JoinError, device_id: &str) -> ScanError {
  tracing::error!(%error, %device_id, "live scan worker panicked");
  ScanError::CameraUnavailable(CameraFault::Lost)
}

/// Wait out the scanner task. A panic there unwinds through its
/// [`StreamGuard`], so only the session state and the report are left.
async fn supervise(
  scanner: JoinHandle<WorkerExit>,
  device_id: String,
  state: Arc<watch::Sender<SessionState>>,
  events: mpsc::Sender<ScanEvent>,
) -> WorkerExit {
  match scanner.await {
    Ok(exit) => exit,
    Err(error) => {
      let failure = worker_lost(&error, &device_id);
      state.send_replace(SessionState::Failed(failure.clone()));
      let _ = events.try_send(ScanEvent::Failed(failure));
      WorkerExit::Finished
    }
  }
}

/// Stops the stream however the worker exits.
struct StreamGuard<S: VideoStream>(S);

impl<S: VideoStream> Drop for StreamGuard<S> {
  fn drop(&mut self) { self.0.stop(); }
}

enum Step {
  Continue,
  Resolved(Resolution),
  Failed(ScanError),
}

async fn run<S: VideoStream>(
  stream: S,
  cadence: Duration,
  state: Arc<watch::Sender<SessionState>>,
  events: mpsc::Sender<ScanEvent>,
  mut stop: oneshot::Receiver<()>,
) -> WorkerExit {
  let mut stream = StreamGuard(stream);
  let mut ticker = time::interval(cadence);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

  loop {
    let step = tokio::select! {
      biased;
      _ = &mut stop => return WorkerExit::Halted(events),
      step = cycle(&mut stream.0, &mut ticker, &events) => step,
    };

    let terminal = match step {
      Step::Continue => continue,
      Step::Resolved(resolution) => {
        drop(stream);
        state.send_replace(SessionState::Stopped);
        vec![ScanEvent::Resolved(resolution), ScanEvent::Stopped]
      }
      Step::Failed(error) => {
        drop(stream);
        tracing::warn!(%error, "camera capture failed");
        state.send_replace(SessionState::Failed(error.clone()));
        vec![ScanEvent::Failed(error)]
      }
    };

    // A stop request while the receiver is not draining abandons delivery.
    let deliver = async {
      for event in terminal {
        if events.send(event).await.is_err() {
          break;
        }
      }
    };
    tokio::select! {
      biased;
      _ = &mut stop => {}
      _ = deliver => {}
    }
    return WorkerExit::Finished;
  }
}

/// One tick: capture, detect, resolve.
async fn cycle<S: VideoStream>(
  stream: &mut S,
  ticker: &mut Interval,
  events: &mpsc::Sender<ScanEvent>,
) -> Step {
  ticker.tick().await;

  let frame = match stream.capture().await {
    Ok(Some(frame)) => frame,
    Ok(None) => return Step::Continue,
    Err(error) => return Step::Failed(error),
  };

  let attempt = match task::spawn_blocking(move || scan_frame(&frame)).await {
    Ok(attempt) => attempt,
    Err(error) => {
      tracing::error!(%error, "frame decode panicked");
      return Step::Continue;
    }
  };

  match attempt.outcome {
    ScanOutcome::NoSymbolFound => Step::Continue,
    ScanOutcome::Rejected(rejection) => {
      if events.try_send(ScanEvent::Rejected(rejection)).is_err() {
        tracing::debug!("event buffer full, dropping rejection");
      }
      Step::Continue
    }
    ScanOutcome::Resolved(resolution) => Step::Resolved(resolution),
  }
}
