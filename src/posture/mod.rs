//! Posture analysis pipeline.
//!
//! `analyzer` drives the per-frame path; `calibration` builds the anchor it
//! measures against. Everything else is a stage either of them composes.

pub mod analyzer;
pub mod baseline;
pub mod calibration;
pub mod config;
pub mod diagnostics;
pub mod filters;
pub mod geometry;
pub mod landmarks;
pub mod rules;
pub mod screen_angle;
pub mod types;

pub use analyzer::{AnalyzerOptions, PostureAnalyzer};
pub use calibration::{CalibrationProgress, CalibrationResult, CalibrationService};
pub use config::EngineConfig;
pub use diagnostics::{DiagnosticsEvent, DiagnosticsSink};
pub use landmarks::{DetectionFrame, Landmark, LandmarkIndex, LandmarkSet};
pub use rules::{RuleThresholdOverrides, RuleThresholds, RuleToggles};
pub use types::{
    AnalysisResult, AngleDeviations, CalibrationData, PostureAngles, PostureRule, PostureStatus,
    PostureViolation, ScreenAngleReference, ScreenAngleSignals,
};
