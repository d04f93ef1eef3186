//! Threaded session actor.
//!
//! Motion and location samples usually come from different producers. A
//! [`GaitSession`] owns one [`GaitSegmentTracker`] on a dedicated worker
//! thread and applies commands strictly in arrival order, so the tracker
//! state only ever has one writer. Producers hold cheap [`SessionHandle`]
//! clones; events come back on an `mpsc` receiver.
//!
//! The command queue is bounded by `session_queue_capacity`. Sample pushes
//! never block: a full queue returns [`GaitError::QueueFull`] and the sample
//! is dropped. Control commands wait for room.
//!
//! # Example
//!
//! ```
//! use equine_gait::{AgeAdjustment, Breed, GaitConfig, GaitSession, LocationSample};
//!
//! let (session, events) =
//!     GaitSession::start(GaitConfig::default(), Breed::Arabian, AgeAdjustment::NONE, 0.0)?;
//! let gps = session.handle();
//! for i in 1..=3 {
//!     gps.push_location(LocationSample::new(f64::from(i), 1.3, 1.3))?;
//! }
//! let segments = session.stop(4.0)?;
//! assert_eq!(segments.len(), 2);
//! assert!(events.try_iter().count() >= 2);
//! # Ok::<(), equine_gait::GaitError>(())
//! ```

use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, warn};

use crate::breed::{AgeAdjustment, Breed};
use crate::config::GaitConfig;
use crate::error::{GaitError, Result};
use crate::segment::{GaitEvent, GaitSegment};
use crate::tracker::{GaitSegmentTracker, TrackerSnapshot};
use crate::types::{Attitude, Lead, LocationSample, MotionSample};

enum SessionCommand {
    Motion(MotionSample),
    SecondaryMotion(MotionSample),
    Location(LocationSample),
    Calibrate(Attitude),
    ResetCalibration,
    Lead(Lead, f64),
    Rhythm(f64),
    Snapshot(mpsc::Sender<TrackerSnapshot>),
    Stop {
        timestamp: f64,
        reply: mpsc::Sender<Result<Vec<GaitSegment>>>,
    },
    Shutdown,
}

/// Cloneable producer handle.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    sender: mpsc::SyncSender<SessionCommand>,
    capacity: usize,
}

impl SessionHandle {
    /// Blocking send, for control commands that must not be lost.
    fn send(&self, command: SessionCommand) -> Result<()> {
        self.sender
            .send(command)
            .map_err(|_| GaitError::SessionClosed)
    }

    /// Non-blocking send, for samples.
    fn try_send(&self, command: SessionCommand) -> Result<()> {
        self.sender.try_send(command).map_err(|e| match e {
            mpsc::TrySendError::Full(_) => {
                warn!(
                    target: "equine_gait::session",
                    capacity = self.capacity,
                    "command queue full, sample dropped"
                );
                GaitError::QueueFull {
                    capacity: self.capacity,
                }
            }
            mpsc::TrySendError::Disconnected(_) => GaitError::SessionClosed,
        })
    }

    /// Queue a primary motion sample.
    ///
    /// # Errors
    ///
    /// Returns [`GaitError::QueueFull`] if the worker is behind, or
    /// [`GaitError::SessionClosed`] once the session has stopped.
    pub fn push_motion(&self, sample: MotionSample) -> Result<()> {
        self.try_send(SessionCommand::Motion(sample))
    }

    /// Queue a secondary-device sample.
    ///
    /// # Errors
    ///
    /// Returns [`GaitError::QueueFull`] if the worker is behind, or
    /// [`GaitError::SessionClosed`] once the session has stopped.
    pub fn push_secondary_motion(&self, sample: MotionSample) -> Result<()> {
        self.try_send(SessionCommand::SecondaryMotion(sample))
    }

    /// Queue a location update.
    ///
    /// # Errors
    ///
    /// Returns [`GaitError::QueueFull`] if the worker is behind, or
    /// [`GaitError::SessionClosed`] once the session has stopped.
    pub fn push_location(&self, location: LocationSample) -> Result<()> {
        self.try_send(SessionCommand::Location(location))
    }

    /// Maximum number of queued commands.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Calibrate after all previously queued samples were transformed.
    ///
    /// # Errors
    ///
    /// Returns [`GaitError::SessionClosed`] once the session has stopped.
    pub fn calibrate(&self, attitude: Attitude) -> Result<()> {
        self.send(SessionCommand::Calibrate(attitude))
    }

    /// # Errors
    ///
    /// Returns [`GaitError::SessionClosed`] once the session has stopped.
    pub fn reset_calibration(&self) -> Result<()> {
        self.send(SessionCommand::ResetCalibration)
    }

    /// # Errors
    ///
    /// Returns [`GaitError::SessionClosed`] once the session has stopped.
    pub fn update_lead(&self, lead: Lead, confidence: f64) -> Result<()> {
        self.send(SessionCommand::Lead(lead, confidence))
    }

    /// # Errors
    ///
    /// Returns [`GaitError::SessionClosed`] once the session has stopped.
    pub fn update_rhythm(&self, score: f64) -> Result<()> {
        self.send(SessionCommand::Rhythm(score))
    }

    /// Live values, taken after every previously queued command.
    ///
    /// # Errors
    ///
    /// Returns [`GaitError::SessionClosed`] once the session has stopped.
    pub fn snapshot(&self) -> Result<TrackerSnapshot> {
        let (reply, response) = mpsc::channel();
        self.send(SessionCommand::Snapshot(reply))?;
        response.recv().map_err(|_| GaitError::SessionClosed)
    }
}

/// A running analysis session on its own thread.
#[derive(Debug)]
pub struct GaitSession {
    handle: SessionHandle,
    worker: Option<JoinHandle<()>>,
}

impl GaitSession {
    /// Configure a tracker, start analyzing at `start_time` and spawn the worker.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the worker
    /// thread cannot be spawned.
    pub fn start(
        config: GaitConfig,
        breed: Breed,
        age: AgeAdjustment,
        start_time: f64,
    ) -> Result<(Self, mpsc::Receiver<GaitEvent>)> {
        let capacity = config.session_queue_capacity;
        let mut tracker = GaitSegmentTracker::new(config)?;
        tracker.configure(breed, age);

        let (event_tx, event_rx) = mpsc::channel();
        tracker.set_event_callback(Box::new(move |event| {
            // A dropped receiver only means nobody is listening.
            let _ = event_tx.send(event.clone());
        }));
        tracker.start_analyzing(start_time);

        let (command_tx, command_rx) = mpsc::sync_channel::<SessionCommand>(capacity);
        let worker = thread::Builder::new()
            .name("gait-session".into())
            .spawn(move || run(tracker, &command_rx))
            .map_err(|e| GaitError::invalid_input(format!("failed to spawn session thread: {e}")))?;

        Ok((
            Self {
                handle: SessionHandle {
                    sender: command_tx,
                    capacity,
                },
                worker: Some(worker),
            },
            event_rx,
        ))
    }

    /// A producer handle that can be moved to another thread.
    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// # Errors
    ///
    /// Returns [`GaitError::SessionClosed`] if the worker has exited.
    pub fn snapshot(&self) -> Result<TrackerSnapshot> {
        self.handle.snapshot()
    }

    /// Finalize the open segment, stop the worker and return every segment.
    ///
    /// Commands queued before this call are processed first.
    ///
    /// # Errors
    ///
    /// Returns [`GaitError::SessionClosed`] if the worker has already exited.
    pub fn stop(mut self, timestamp: f64) -> Result<Vec<GaitSegment>> {
        let (reply, response) = mpsc::channel();
        self.handle.send(SessionCommand::Stop { timestamp, reply })?;
        let segments = response.recv().map_err(|_| GaitError::SessionClosed)?;
        self.join();
        segments
    }

    fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.join() {
                error!(target: "equine_gait::session", "session thread panicked: {e:?}");
            }
        }
    }
}

impl Drop for GaitSession {
    fn drop(&mut self) {
        if self.worker.is_some() {
            // Already-exited workers make this a no-op.
            let _ = self.handle.send(SessionCommand::Shutdown);
            self.join();
        }
    }
}

fn run(mut tracker: GaitSegmentTracker, commands: &mpsc::Receiver<SessionCommand>) {
    while let Ok(command) = commands.recv() {
        let outcome = match command {
            SessionCommand::Motion(sample) => tracker.process_motion(&sample),
            SessionCommand::SecondaryMotion(sample) => tracker.process_secondary_motion(&sample),
            SessionCommand::Location(location) => tracker.process_location(&location).map(|_| ()),
            SessionCommand::Calibrate(attitude) => {
                tracker.calibrate(&attitude);
                Ok(())
            }
            SessionCommand::ResetCalibration => {
                tracker.reset_calibration();
                Ok(())
            }
            SessionCommand::Lead(lead, confidence) => {
                tracker.update_lead(lead, confidence);
                Ok(())
            }
            SessionCommand::Rhythm(score) => {
                tracker.update_rhythm(score);
                Ok(())
            }
            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(tracker.snapshot());
                Ok(())
            }
            SessionCommand::Stop { timestamp, reply } => {
                let _ = reply.send(tracker.stop_analyzing(timestamp));
                break;
            }
            SessionCommand::Shutdown => {
                let _ = tracker.stop_analyzing(f64::NEG_INFINITY);
                break;
            }
        };
        if let Err(e) = outcome {
            warn!(target: "equine_gait::session", error = %e, "command rejected");
        }
    }
    debug!(target: "equine_gait::session", "session worker exiting");
}
