//! Streaming gait tracker.
//!
//! [`GaitSegmentTracker`] is the single-writer owner of all per-session
//! state: calibration, sliding windows, estimator belief and segments.
//! Motion samples fill buffers and, once a full spectral window is
//! buffered, update the estimator every `window_size × (1 − window_overlap)`
//! samples. Every location update triggers one re-evaluation:
//!
//! 1. motion-based estimate (estimator, or bounce classifier when the
//!    estimator is unsure), once enough motion is buffered and the horse moves
//! 2. speed-based estimate from the smoothed GPS speed
//! 3. [`resolve`](crate::decision::resolve) reconciles the two
//! 4. hysteresis: the same detection must repeat `confirmation_threshold`
//!    times before the gait moves one adjacent step toward it
//!
//! # Example
//!
//! ```
//! use equine_gait::{GaitConfig, GaitSegmentTracker, GaitState, LocationSample};
//!
//! let mut tracker = GaitSegmentTracker::new(GaitConfig::default())?;
//! tracker.start_analyzing(0.0);
//! for i in 1..=4 {
//!     tracker.process_location(&LocationSample::new(f64::from(i), 1.2, 1.2))?;
//! }
//! assert_eq!(tracker.current_gait(), GaitState::Walk);
//! let segments = tracker.stop_analyzing(5.0)?;
//! assert_eq!(segments.len(), 2);
//! # Ok::<(), equine_gait::GaitError>(())
//! ```

use std::fmt;

use tracing::{debug, info, trace, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::annotation::{LeadAnalyzer, RhythmAnalyzer};
use crate::breed::{AgeAdjustment, Breed};
use crate::config::GaitConfig;
use crate::decision::{classify_motion, classify_speed, resolve};
use crate::error::{GaitError, Result};
use crate::estimator::{Belief, GaitStateEstimator};
use crate::features::{FeatureExtractor, GaitFeatureVector};
use crate::frame::{FrameTransformer, GyroBiasEstimator};
use crate::segment::{GaitEvent, GaitSegment, GaitSummary};
use crate::streaming::{BounceWindow, MotionHistory, SlidingWindow, SpeedWindow};
use crate::types::{Attitude, GaitState, Lead, LocationSample, MotionSample};

/// Callback invoked for every emitted event.
pub type EventCallback = Box<dyn FnMut(&GaitEvent) + Send>;

/// Live values for display collaborators.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackerSnapshot {
    pub gait: GaitState,
    pub confidence: f64,
    pub belief: Belief,
    pub bounce_frequency: f64,
    pub bounce_amplitude: f64,
    pub smoothed_speed: f64,
    pub is_analyzing: bool,
}

/// Detection waiting for confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    detected: GaitState,
    count: usize,
}

/// Per-session gait tracker.
pub struct GaitSegmentTracker {
    config: GaitConfig,
    transformer: FrameTransformer,
    gyro_bias: GyroBiasEstimator,
    extractor: FeatureExtractor,
    estimator: GaitStateEstimator,
    lead: LeadAnalyzer,
    rhythm: RhythmAnalyzer,

    bounce: BounceWindow,
    speeds: SpeedWindow,
    history: MotionHistory,
    wrist: SlidingWindow<f64>,
    bounce_frequency: f64,
    spectral_hop: usize,
    since_spectral: usize,

    analyzing: bool,
    current_gait: GaitState,
    pending: Option<Pending>,
    open_segment: Option<GaitSegment>,
    closed: Vec<GaitSegment>,
    last_timestamp: f64,

    on_event: Option<EventCallback>,
}

impl fmt::Debug for GaitSegmentTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GaitSegmentTracker")
            .field("analyzing", &self.analyzing)
            .field("current_gait", &self.current_gait)
            .field("pending", &self.pending)
            .field("open_segment", &self.open_segment)
            .field("closed", &self.closed.len())
            .field("belief", self.estimator.belief())
            .finish_non_exhaustive()
    }
}

impl GaitSegmentTracker {
    /// Build a tracker and all of its analyzers.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: GaitConfig) -> Result<Self> {
        if let Err(e) = config.validate() {
            warn!(target: "equine_gait::tracker", error = %e, "rejected configuration");
            return Err(e);
        }
        let rate = config.motion_sample_rate;
        let window = config.spectral_window_size;
        let spectral_hop =
            ((window as f64 * (1.0 - config.window_overlap)).round() as usize).max(1);

        Ok(Self {
            transformer: FrameTransformer::new(),
            gyro_bias: GyroBiasEstimator::default(),
            extractor: FeatureExtractor::new(window, rate, config.frequency_band)?
                .with_silence_floor(config.numerical_eps),
            estimator: GaitStateEstimator::new(&config)?,
            lead: LeadAnalyzer::new(rate)?,
            rhythm: RhythmAnalyzer::new(rate),
            bounce: BounceWindow::new(config.bounce_capacity(), config.min_bounce_samples),
            speeds: SpeedWindow::new(config.speed_window),
            history: MotionHistory::new(window),
            wrist: SlidingWindow::new(window),
            bounce_frequency: 0.0,
            spectral_hop,
            since_spectral: 0,
            analyzing: false,
            current_gait: GaitState::Stationary,
            pending: None,
            open_segment: None,
            closed: Vec::new(),
            last_timestamp: 0.0,
            on_event: None,
            config,
        })
    }

    /// Apply breed and age priors to the estimator.
    pub fn configure(&mut self, breed: Breed, age: AgeAdjustment) {
        self.estimator.configure(breed, age);
    }

    /// Register a callback for gait changes and closed segments.
    pub fn set_event_callback(&mut self, callback: EventCallback) {
        self.on_event = Some(callback);
    }

    pub fn clear_event_callback(&mut self) {
        self.on_event = None;
    }

    /// Begin a session at `timestamp` with an open stationary segment.
    ///
    /// A session already in progress is stopped first; its segments are
    /// discarded from the tracker (they were already emitted as events).
    pub fn start_analyzing(&mut self, timestamp: f64) {
        if self.analyzing {
            self.end_session(timestamp);
        }
        self.clear_buffers();
        self.estimator.reset();
        self.closed.clear();
        self.pending = None;
        self.current_gait = GaitState::Stationary;
        self.open_segment = Some(GaitSegment::open(GaitState::Stationary, timestamp));
        self.last_timestamp = timestamp;
        self.analyzing = true;
        info!(target: "equine_gait::tracker", timestamp, "gait analysis started");
    }

    /// Finalize the open segment and return every segment of the session.
    ///
    /// # Errors
    ///
    /// Returns [`GaitError::NotAnalyzing`] if no session is active.
    pub fn stop_analyzing(&mut self, timestamp: f64) -> Result<Vec<GaitSegment>> {
        if !self.analyzing {
            return Err(GaitError::NotAnalyzing);
        }
        let end = self.end_session(timestamp);
        let segments = std::mem::take(&mut self.closed);
        info!(
            target: "equine_gait::tracker",
            timestamp = end,
            segments = segments.len(),
            "gait analysis stopped"
        );
        Ok(segments)
    }

    #[must_use]
    pub const fn is_analyzing(&self) -> bool {
        self.analyzing
    }

    /// Ingest a location update and re-evaluate the gait.
    ///
    /// Returns the events produced by this update.
    ///
    /// # Errors
    ///
    /// Returns [`GaitError::NotAnalyzing`] if no session is active.
    pub fn process_location(&mut self, location: &LocationSample) -> Result<Vec<GaitEvent>> {
        if !self.analyzing {
            return Err(GaitError::NotAnalyzing);
        }
        self.speeds.push(location.speed);
        if let Some(segment) = self.open_segment.as_mut() {
            segment.add_distance(location.distance_delta);
        }
        self.last_timestamp = self.last_timestamp.max(location.timestamp);
        Ok(self.evaluate(self.last_timestamp))
    }

    /// Ingest one primary motion sample.
    ///
    /// # Errors
    ///
    /// Returns [`GaitError::NotAnalyzing`] if no session is active.
    pub fn process_motion(&mut self, sample: &MotionSample) -> Result<()> {
        if !self.analyzing {
            return Err(GaitError::NotAnalyzing);
        }
        if self.config.gyro_bias_correction && self.is_quiet() {
            self.gyro_bias.update(sample.rotation_rate);
            self.transformer.set_gyro_bias(self.gyro_bias.bias());
        }

        let acceleration = self
            .transformer
            .acceleration_to_horse_frame(&sample.acceleration, &sample.attitude);
        let rotation = self
            .transformer
            .rotation_to_horse_frame(&sample.rotation_rate, &sample.attitude);

        if self.history.push(sample.timestamp, &acceleration, &rotation) {
            self.bounce.push(acceleration.vertical);
            self.last_timestamp = self.last_timestamp.max(sample.timestamp);
            self.since_spectral += 1;
            if self.history.is_full() && self.since_spectral >= self.spectral_hop {
                self.since_spectral = 0;
                self.update_spectral();
            }
        }
        Ok(())
    }

    /// Ingest a sample from a secondary (wrist) device.
    ///
    /// The wrist has its own orientation, so only its attitude is applied.
    ///
    /// # Errors
    ///
    /// Returns [`GaitError::NotAnalyzing`] if no session is active.
    pub fn process_secondary_motion(&mut self, sample: &MotionSample) -> Result<()> {
        if !self.analyzing {
            return Err(GaitError::NotAnalyzing);
        }
        let world = sample
            .attitude
            .to_unit_quaternion()
            .transform_vector(&sample.acceleration);
        self.wrist.push(world.z);
        Ok(())
    }

    /// Capture the current attitude as the mount offset.
    pub fn calibrate(&mut self, attitude: &Attitude) {
        self.transformer.calibrate(attitude);
    }

    pub fn reset_calibration(&mut self) {
        self.transformer.reset_calibration();
    }

    #[must_use]
    pub const fn is_calibrated(&self) -> bool {
        self.transformer.is_calibrated()
    }

    /// Annotate the open segment with a lead. Ignored (returns `false`)
    /// unless the current gait has a lead.
    pub fn update_lead(&mut self, lead: Lead, confidence: f64) -> bool {
        if !self.current_gait.is_lead_applicable() {
            return false;
        }
        match self.open_segment.as_mut() {
            Some(segment) => {
                segment.set_lead(lead, confidence);
                true
            }
            None => false,
        }
    }

    /// Annotate the open segment with a rhythm score. Ignored (returns
    /// `false`) while stationary.
    pub fn update_rhythm(&mut self, score: f64) -> bool {
        if !self.current_gait.is_moving() {
            return false;
        }
        match self.open_segment.as_mut() {
            Some(segment) => {
                segment.set_rhythm(score);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub const fn current_gait(&self) -> GaitState {
        self.current_gait
    }

    /// Estimator probability of the current (confirmed) gait.
    #[must_use]
    pub fn state_confidence(&self) -> f64 {
        self.estimator.probability(self.current_gait)
    }

    #[must_use]
    pub const fn estimator(&self) -> &GaitStateEstimator {
        &self.estimator
    }

    #[must_use]
    pub const fn config(&self) -> &GaitConfig {
        &self.config
    }

    #[must_use]
    pub const fn open_segment(&self) -> Option<&GaitSegment> {
        self.open_segment.as_ref()
    }

    #[must_use]
    pub fn closed_segments(&self) -> &[GaitSegment] {
        &self.closed
    }

    /// Closed segments followed by the open one.
    #[must_use]
    pub fn segments(&self) -> Vec<GaitSegment> {
        self.closed
            .iter()
            .chain(self.open_segment.iter())
            .cloned()
            .collect()
    }

    /// Per-gait totals, with the open segment measured to the last sample.
    #[must_use]
    pub fn summary(&self) -> GaitSummary {
        GaitSummary::from_segments(&self.segments(), self.last_timestamp)
    }

    #[must_use]
    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            gait: self.current_gait,
            confidence: self.state_confidence(),
            belief: *self.estimator.belief(),
            bounce_frequency: self.bounce_frequency,
            bounce_amplitude: self.bounce.amplitude(),
            smoothed_speed: self.speeds.smoothed(),
            is_analyzing: self.analyzing,
        }
    }

    /// Stationary by decision and by bounce: safe to sample gyro bias.
    fn is_quiet(&self) -> bool {
        self.current_gait == GaitState::Stationary
            && self.bounce.len() >= self.config.min_bounce_samples
            && self.bounce.amplitude() < self.config.thresholds.stationary_max_amplitude
    }

    fn evaluate(&mut self, timestamp: f64) -> Vec<GaitEvent> {
        let speed = self.speeds.smoothed();
        let speed_gait = classify_speed(&self.config.thresholds, speed);
        let motion = self.motion_estimate(speed);
        let decision = resolve(&self.config.thresholds, motion, speed_gait, speed);

        trace!(
            target: "equine_gait::tracker",
            speed,
            ?speed_gait,
            ?motion,
            detected = ?decision.gait,
            rule = ?decision.rule,
            bounce_frequency = self.bounce_frequency,
            bounce_amplitude = self.bounce.amplitude(),
            "evaluated gait"
        );

        let events = self.confirm(decision.gait, timestamp);
        self.annotate();
        events
    }

    /// Motion-based gait, `None` until enough motion is buffered and the
    /// horse is moving.
    fn motion_estimate(&mut self, speed: f64) -> Option<GaitState> {
        if self.bounce.len() < self.config.min_motion_samples {
            return None;
        }
        let rate = self.config.motion_sample_rate;
        self.bounce_frequency = self.bounce.frequency(rate);
        let amplitude = self.bounce.amplitude();

        // Full windows update the estimator from process_motion.
        if !self.history.is_full() {
            let features = GaitFeatureVector::from_bounce(self.bounce_frequency, amplitude, speed);
            self.estimator.update(&features);
        }

        if speed <= self.config.min_motion_speed {
            return None;
        }
        if self.estimator.state_confidence() >= self.config.estimator_min_confidence {
            Some(self.estimator.current_state())
        } else {
            Some(classify_motion(
                &self.config.thresholds,
                self.bounce_frequency,
                amplitude,
            ))
        }
    }

    /// Estimator update from the full horse-frame window.
    fn update_spectral(&mut self) {
        let speed = self.speeds.smoothed();
        let wrist = if self.wrist.is_empty() {
            None
        } else {
            Some(self.wrist.as_slice())
        };
        let Some(features) = self
            .history
            .window()
            .and_then(|window| self.extractor.extract(&window, wrist, speed))
        else {
            return;
        };
        let belief = self.estimator.update(&features);
        trace!(
            target: "equine_gait::tracker",
            stride_frequency = features.stride_frequency,
            complete = features.is_complete(),
            ?belief,
            "spectral window"
        );
    }

    /// Hysteresis: commit one adjacent step after enough agreeing detections.
    fn confirm(&mut self, detected: GaitState, timestamp: f64) -> Vec<GaitEvent> {
        if detected == self.current_gait {
            self.pending = None;
            return Vec::new();
        }
        let count = match self.pending {
            Some(p) if p.detected == detected => p.count + 1,
            _ => 1,
        };
        if count < self.config.confirmation_threshold {
            self.pending = Some(Pending { detected, count });
            return Vec::new();
        }
        self.pending = None;
        let next = self.current_gait.step_toward(detected);
        self.commit(next, timestamp)
    }

    fn commit(&mut self, new: GaitState, timestamp: f64) -> Vec<GaitEvent> {
        let previous = self.current_gait;
        let mut events = Vec::with_capacity(2);
        if let Some(event) = self.close_open_segment(timestamp) {
            events.push(event);
        }
        self.open_segment = Some(GaitSegment::open(new, timestamp));
        self.current_gait = new;
        info!(
            target: "equine_gait::tracker",
            %previous,
            %new,
            timestamp,
            "gait changed"
        );
        events.push(GaitEvent::GaitChanged {
            previous,
            new,
            timestamp,
        });
        for event in &events {
            self.emit(event);
        }
        events
    }

    /// Close the open segment and drop per-session state. Returns the end time.
    fn end_session(&mut self, timestamp: f64) -> f64 {
        let end = timestamp.max(self.last_timestamp);
        if let Some(event) = self.close_open_segment(end) {
            self.emit(&event);
        }
        self.analyzing = false;
        self.pending = None;
        self.clear_buffers();
        self.transformer.reset_calibration();
        end
    }

    fn close_open_segment(&mut self, timestamp: f64) -> Option<GaitEvent> {
        let mut segment = self.open_segment.take()?;
        segment.finalize(timestamp);
        debug!(
            target: "equine_gait::tracker",
            gait = %segment.gait,
            distance = segment.distance,
            average_speed = segment.average_speed,
            "segment closed"
        );
        self.closed.push(segment.clone());
        Some(GaitEvent::SegmentClosed(segment))
    }

    /// Automatic lead and rhythm annotation of the open segment.
    fn annotate(&mut self) {
        if self.current_gait.is_lead_applicable() {
            let estimate = match self.history.window() {
                Some(window) => self.lead.analyze(window.lateral, window.yaw).ok().flatten(),
                None => None,
            };
            if let Some(estimate) = estimate {
                self.update_lead(estimate.lead, estimate.confidence);
            }
        }
        if self.current_gait.is_moving() && self.bounce.len() >= self.config.min_motion_samples {
            if let Some(score) = self.rhythm.score(self.bounce.samples()) {
                self.update_rhythm(score);
            }
        }
    }

    fn emit(&mut self, event: &GaitEvent) {
        if let Some(callback) = self.on_event.as_mut() {
            callback(event);
        }
    }

    fn clear_buffers(&mut self) {
        self.bounce.clear();
        self.speeds.clear();
        self.history.clear();
        self.wrist.clear();
        self.gyro_bias.reset();
        self.transformer.set_gyro_bias(None);
        self.bounce_frequency = 0.0;
        self.since_spectral = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use std::f64::consts::PI;
    use std::sync::{Arc, Mutex};

    const RATE: f64 = 50.0;

    fn tracker() -> GaitSegmentTracker {
        GaitSegmentTracker::new(GaitConfig::default()).unwrap()
    }

    fn bounce_sample(i: usize, freq: f64, amplitude: f64) -> MotionSample {
        let t = i as f64 / RATE;
        MotionSample::new(
            t,
            Vector3::new(0.0, 0.0, amplitude * (2.0 * PI * freq * t).sin()),
            Vector3::zeros(),
            Attitude::identity(),
        )
    }

    fn location(t: f64, speed: f64) -> LocationSample {
        LocationSample::new(t, speed, speed)
    }

    #[test]
    fn test_requires_session() {
        let mut tracker = tracker();
        assert_eq!(
            tracker.process_location(&location(1.0, 1.0)),
            Err(GaitError::NotAnalyzing)
        );
        assert!(tracker.process_motion(&bounce_sample(0, 2.0, 0.1)).is_err());
        assert!(tracker.process_secondary_motion(&bounce_sample(0, 2.0, 0.1)).is_err());
        assert_eq!(tracker.stop_analyzing(1.0), Err(GaitError::NotAnalyzing));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GaitConfig::default().with_spectral_window_size(100);
        assert!(GaitSegmentTracker::new(config).is_err());
    }

    #[test]
    fn test_start_opens_stationary_segment() {
        let mut tracker = tracker();
        tracker.start_analyzing(3.0);
        let open = tracker.open_segment().unwrap();
        assert_eq!(open.gait, GaitState::Stationary);
        assert_eq!(open.start_time, 3.0);
        assert!(tracker.is_analyzing());
        assert_eq!(tracker.estimator().belief()[0], 1.0);
    }

    #[test]
    fn test_speed_only_walk_after_confirmation() {
        let mut tracker = tracker();
        tracker.start_analyzing(0.0);
        for i in 1..=2 {
            let events = tracker.process_location(&location(f64::from(i), 1.2)).unwrap();
            assert!(events.is_empty());
            assert_eq!(tracker.current_gait(), GaitState::Stationary);
        }
        let events = tracker.process_location(&location(3.0, 1.2)).unwrap();
        assert_eq!(tracker.current_gait(), GaitState::Walk);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], GaitEvent::SegmentClosed(_)));
        assert_eq!(
            events[1],
            GaitEvent::GaitChanged {
                previous: GaitState::Stationary,
                new: GaitState::Walk,
                timestamp: 3.0
            }
        );
    }

    #[test]
    fn test_changes_step_through_adjacent_gaits() {
        let mut tracker = tracker();
        tracker.start_analyzing(0.0);
        let mut seen = vec![tracker.current_gait()];
        for i in 1..=12 {
            tracker.process_location(&location(f64::from(i), 4.5)).unwrap();
            if seen.last() != Some(&tracker.current_gait()) {
                seen.push(tracker.current_gait());
            }
        }
        assert_eq!(
            seen,
            vec![
                GaitState::Stationary,
                GaitState::Walk,
                GaitState::Trot,
                GaitState::Canter
            ]
        );
    }

    #[test]
    fn test_alternating_detections_never_commit() {
        // No smoothing, so every update alternates the detection.
        let config = GaitConfig {
            speed_window: 1,
            ..GaitConfig::default()
        };
        let mut tracker = GaitSegmentTracker::new(config).unwrap();
        tracker.start_analyzing(0.0);
        for i in 1..=20 {
            let speed = if i % 2 == 0 { 1.2 } else { 0.1 };
            let events = tracker.process_location(&location(f64::from(i), speed)).unwrap();
            assert!(events.is_empty(), "committed at update {i}");
        }
        assert_eq!(tracker.current_gait(), GaitState::Stationary);
    }

    #[test]
    fn test_distance_accounting() {
        let mut tracker = tracker();
        tracker.start_analyzing(0.0);
        let mut fed = 0.0;
        for i in 1..=30 {
            let speed = if i <= 15 { 1.2 } else { 3.0 };
            tracker
                .process_location(&LocationSample::new(f64::from(i), speed, speed))
                .unwrap();
            fed += speed;
        }
        let total: f64 = tracker.segments().iter().map(|s| s.distance).sum();
        assert_relative_eq!(total, fed, epsilon = 1e-9);
        assert_relative_eq!(tracker.summary().total_distance, fed, epsilon = 1e-9);
    }

    #[test]
    fn test_stop_finalizes_and_clears() {
        let mut tracker = tracker();
        tracker.start_analyzing(0.0);
        for i in 1..=4 {
            tracker.process_location(&location(f64::from(i), 1.2)).unwrap();
        }
        tracker.calibrate(&Attitude::identity());
        let segments = tracker.stop_analyzing(10.0).unwrap();
        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(|s| s.end_time.is_some()));
        assert_eq!(segments[1].end_time, Some(10.0));
        assert!(!tracker.is_analyzing());
        assert!(!tracker.is_calibrated());
        assert!(tracker.open_segment().is_none());
        assert_eq!(tracker.snapshot().smoothed_speed, 0.0);
    }

    #[test]
    fn test_bounce_reaches_canter() {
        let mut tracker = tracker();
        tracker.start_analyzing(0.0);
        for i in 0..50 {
            tracker.process_motion(&bounce_sample(i, 2.5, 0.3)).unwrap();
        }
        for i in 1..=12 {
            tracker
                .process_location(&location(1.0 + f64::from(i), 4.0))
                .unwrap();
        }
        assert_eq!(tracker.current_gait(), GaitState::Canter);
        assert!(tracker.state_confidence() > 0.5);

        let snapshot = tracker.snapshot();
        assert_relative_eq!(snapshot.bounce_frequency, 2.5, epsilon = 1e-6);
        assert!(snapshot.bounce_amplitude > 0.2);
        // Regular synthetic bounce scores as a regular rhythm.
        assert!(tracker.open_segment().unwrap().rhythm_score > 0.99);
    }

    #[test]
    fn test_confidence_tracks_displayed_gait() {
        let mut tracker = tracker();
        tracker.start_analyzing(0.0);
        for i in 1..=12 {
            tracker.process_location(&location(f64::from(i), 4.5)).unwrap();
        }
        // Speed alone drove the gait; the estimator never left stationary.
        assert_eq!(tracker.current_gait(), GaitState::Canter);
        let belief = tracker.estimator().belief()[GaitState::Canter.index()];
        assert_relative_eq!(tracker.state_confidence(), belief);
        assert_relative_eq!(tracker.snapshot().confidence, belief);
        assert!(tracker.state_confidence() < 0.5);
    }

    #[test]
    fn test_spectral_updates_follow_window_hop() {
        let mut tracker = tracker();
        tracker.start_analyzing(0.0);
        let hop = 64;
        for i in 0..127 {
            tracker.process_motion(&bounce_sample(i, 2.5, 0.3)).unwrap();
        }
        assert_eq!(tracker.estimator().update_count(), 0);
        tracker.process_motion(&bounce_sample(127, 2.5, 0.3)).unwrap();
        assert_eq!(tracker.estimator().update_count(), 1);
        for i in 128..128 + hop - 1 {
            tracker.process_motion(&bounce_sample(i, 2.5, 0.3)).unwrap();
        }
        assert_eq!(tracker.estimator().update_count(), 1);
        tracker.process_motion(&bounce_sample(128 + hop - 1, 2.5, 0.3)).unwrap();
        assert_eq!(tracker.estimator().update_count(), 2);

        // Location updates leave a full window's estimator alone.
        tracker.process_location(&location(4.0, 4.0)).unwrap();
        assert_eq!(tracker.estimator().update_count(), 2);
    }

    #[test]
    fn test_no_overlap_hops_a_whole_window() {
        let config = GaitConfig {
            window_overlap: 0.0,
            ..GaitConfig::default()
        };
        let mut tracker = GaitSegmentTracker::new(config).unwrap();
        tracker.start_analyzing(0.0);
        for i in 0..128 * 3 {
            tracker.process_motion(&bounce_sample(i, 2.5, 0.3)).unwrap();
        }
        assert_eq!(tracker.estimator().update_count(), 3);
    }

    #[test]
    fn test_lead_only_on_lead_gaits() {
        let mut tracker = tracker();
        tracker.start_analyzing(0.0);
        assert!(!tracker.update_lead(Lead::Left, 0.9));
        assert!(!tracker.update_rhythm(0.8));

        for i in 1..=12 {
            tracker.process_location(&location(f64::from(i), 4.5)).unwrap();
        }
        assert_eq!(tracker.current_gait(), GaitState::Canter);
        assert!(tracker.update_lead(Lead::Right, 0.7));
        let open = tracker.open_segment().unwrap();
        assert_eq!(open.lead, Some(Lead::Right));
        assert_relative_eq!(open.lead_confidence, 0.7);
    }

    #[test]
    fn test_callback_receives_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut tracker = tracker();
        tracker.set_event_callback(Box::new(move |event| {
            sink.lock().unwrap().push(event.clone());
        }));
        tracker.start_analyzing(0.0);
        for i in 1..=3 {
            tracker.process_location(&location(f64::from(i), 1.2)).unwrap();
        }
        tracker.stop_analyzing(5.0).unwrap();

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[1], GaitEvent::GaitChanged { .. }));
        assert!(matches!(&events[2], GaitEvent::SegmentClosed(s) if s.gait == GaitState::Walk));
    }

    #[test]
    fn test_gyro_bias_learned_while_quiet() {
        let config = GaitConfig::default().with_gyro_bias_correction(true);
        let mut tracker = GaitSegmentTracker::new(config).unwrap();
        tracker.start_analyzing(0.0);
        let drift = Vector3::new(0.0, 0.0, 0.03);
        for i in 0..200 {
            let sample = MotionSample::new(
                i as f64 / RATE,
                Vector3::zeros(),
                drift,
                Attitude::identity(),
            );
            tracker.process_motion(&sample).unwrap();
        }
        let r = tracker
            .transformer
            .rotation_to_horse_frame(&drift, &Attitude::identity());
        assert_relative_eq!(r.yaw, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_restart_closes_previous_segment() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut tracker = tracker();
        tracker.set_event_callback(Box::new(move |event| {
            sink.lock().unwrap().push(event.clone());
        }));
        tracker.start_analyzing(0.0);
        for i in 1..=3 {
            tracker.process_location(&location(f64::from(i), 1.2)).unwrap();
        }
        tracker.calibrate(&Attitude::identity());
        tracker.start_analyzing(10.0);

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[2],
            GaitEvent::SegmentClosed(s) if s.gait == GaitState::Walk && s.end_time == Some(10.0)
        ));
        drop(events);
        assert!(!tracker.is_calibrated());
        assert!(tracker.is_analyzing());
    }

    #[test]
    fn test_restart_resets_state() {
        let mut tracker = tracker();
        tracker.start_analyzing(0.0);
        for i in 1..=4 {
            tracker.process_location(&location(f64::from(i), 1.2)).unwrap();
        }
        tracker.start_analyzing(10.0);
        assert_eq!(tracker.current_gait(), GaitState::Stationary);
        assert!(tracker.closed_segments().is_empty());
        assert_eq!(tracker.open_segment().unwrap().start_time, 10.0);
    }
}
