//! Exports a scripted ride to JSON for offline inspection.
//!
//! Run with: cargo test --test export_segments -- --ignored --nocapture

use equine_gait::{
    Attitude, GaitConfig, GaitSegment, GaitSegmentTracker, GaitSummary, LocationSample,
    MotionSample, TrackerSnapshot,
};
use nalgebra::Vector3;
use serde::Serialize;
use std::f64::consts::PI;
use std::fs::File;
use std::io::Write;

#[derive(Serialize)]
struct SegmentExport {
    gait: String,
    start_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_time: Option<f64>,
    distance: f64,
    average_speed: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    lead: Option<String>,
    lead_confidence: f64,
    rhythm_score: f64,
}

impl From<&GaitSegment> for SegmentExport {
    fn from(s: &GaitSegment) -> Self {
        Self {
            gait: s.gait.to_string(),
            start_time: s.start_time,
            end_time: s.end_time,
            distance: s.distance,
            average_speed: s.average_speed,
            lead: s.lead.map(|l| format!("{l:?}").to_lowercase()),
            lead_confidence: s.lead_confidence,
            rhythm_score: s.rhythm_score,
        }
    }
}

#[derive(Serialize)]
struct TimelinePoint {
    time: f64,
    gait: String,
    confidence: f64,
    belief: [f64; 5],
    bounce_frequency: f64,
    bounce_amplitude: f64,
    smoothed_speed: f64,
}

impl TimelinePoint {
    fn new(time: f64, s: &TrackerSnapshot) -> Self {
        Self {
            time,
            gait: s.gait.to_string(),
            confidence: s.confidence,
            belief: s.belief,
            bounce_frequency: s.bounce_frequency,
            bounce_amplitude: s.bounce_amplitude,
            smoothed_speed: s.smoothed_speed,
        }
    }
}

#[derive(Serialize)]
struct SummaryExport {
    gait: String,
    duration: f64,
    distance: f64,
    segments: usize,
    share: f64,
}

#[derive(Serialize)]
struct RideExport {
    segments: Vec<SegmentExport>,
    timeline: Vec<TimelinePoint>,
    summary: Vec<SummaryExport>,
}

/// Phase of the scripted ride at time `t`: (bounce Hz, bounce g, speed m/s).
fn ride_phase(t: f64) -> (f64, f64, f64) {
    match t {
        t if t < 10.0 => (0.0, 0.0, 0.0),
        t if t < 40.0 => (1.8, 0.12, 1.5),
        t if t < 80.0 => (3.0, 0.35, 3.2),
        t if t < 120.0 => (2.4, 0.3, 5.0),
        _ => (1.8, 0.12, 1.4),
    }
}

#[test]
#[ignore]
fn export_scripted_ride() {
    let config = GaitConfig::default();
    let rate = config.motion_sample_rate;
    let mut tracker = GaitSegmentTracker::new(config).unwrap();
    tracker.start_analyzing(0.0);

    let mut timeline = Vec::new();
    let mut sample = 0usize;
    for second in 1..=150 {
        let end = f64::from(second);
        loop {
            let t = sample as f64 / rate;
            if t >= end {
                break;
            }
            let (freq, amplitude, _) = ride_phase(t);
            let vertical = amplitude * (2.0 * PI * freq * t).sin();
            let sway = 0.3 * amplitude * (PI * freq * t).sin();
            let yaw = amplitude * (PI * freq * t + 0.8).sin();
            tracker
                .process_motion(&MotionSample::new(
                    t,
                    Vector3::new(sway, 0.0, vertical),
                    Vector3::new(0.0, 0.0, yaw),
                    Attitude::identity(),
                ))
                .unwrap();
            sample += 1;
        }
        let (_, _, speed) = ride_phase(end);
        tracker
            .process_location(&LocationSample::new(end, speed, speed))
            .unwrap();
        timeline.push(TimelinePoint::new(end, &tracker.snapshot()));
    }

    let summary: GaitSummary = tracker.summary();
    let segments = tracker.stop_analyzing(151.0).unwrap();

    let export = RideExport {
        segments: segments.iter().map(SegmentExport::from).collect(),
        timeline,
        summary: summary
            .totals
            .iter()
            .map(|(gait, totals)| SummaryExport {
                gait: gait.to_string(),
                duration: totals.duration,
                distance: totals.distance,
                segments: totals.segments,
                share: summary.share(*gait),
            })
            .collect(),
    };

    let json = serde_json::to_string_pretty(&export).unwrap();
    let path = std::env::temp_dir().join("equine_gait_ride.json");
    let mut file = File::create(&path).unwrap();
    file.write_all(json.as_bytes()).unwrap();

    println!("Exported {} segments to {}", export.segments.len(), path.display());
    for s in &export.segments {
        println!(
            "  {:>10} {:>7.1}s  {:>7.1} m  lead={:?}",
            s.gait,
            s.end_time.unwrap_or(f64::NAN) - s.start_time,
            s.distance,
            s.lead
        );
    }
}
