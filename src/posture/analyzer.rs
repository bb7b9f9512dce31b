//! Per-frame orchestration.
//!
//! One [`PostureAnalyzer`] owns all mutable state for one landmark stream:
//! filter history, the adaptive baseline and the last timestamp. Each
//! `analyze` call runs gate → extract → compensate → smooth → deviate →
//! evaluate, and only then updates the baseline, so a frame is always judged
//! against the baseline as it stood before that frame.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_SENSITIVITY, MILLIS_PER_SEC};
use crate::posture::baseline::AdaptiveBaseline;
use crate::posture::config::EngineConfig;
use crate::posture::diagnostics::{DiagnosticsEvent, DiagnosticsSink};
use crate::posture::filters::FilterSet;
use crate::posture::geometry::extract_angles;
use crate::posture::landmarks::{DetectionFrame, LandmarkIndex};
use crate::posture::rules::{
    evaluate_all_rules_with, RuleThresholdOverrides, RuleThresholds, RuleToggles,
};
use crate::posture::screen_angle::ScreenAngleEstimator;
use crate::posture::types::{
    AnalysisResult, AngleDeviations, CalibrationData, PostureAngles, PostureStatus,
    ScreenAngleReference, ScreenAngleSignals,
};

fn default_sensitivity() -> f64 {
    DEFAULT_SENSITIVITY
}

/// Per-instance user settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerOptions {
    /// 0 = lenient, 1 = strict
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
    #[serde(default)]
    pub toggles: RuleToggles,
    #[serde(default)]
    pub threshold_overrides: RuleThresholdOverrides,
    #[serde(default)]
    pub debug_mode: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            toggles: RuleToggles::default(),
            threshold_overrides: RuleThresholdOverrides::default(),
            debug_mode: false,
        }
    }
}

pub struct PostureAnalyzer {
    config: EngineConfig,
    options: AnalyzerOptions,
    baseline: AdaptiveBaseline,
    filters: FilterSet,
    estimator: ScreenAngleEstimator,
    screen_reference: Option<ScreenAngleSignals>,
    screen_references: Vec<ScreenAngleReference>,
    last_timestamp: Option<f64>,
    diagnostics: Option<Box<dyn DiagnosticsSink>>,
}

impl PostureAnalyzer {
    pub fn new(calibration: CalibrationData, options: AnalyzerOptions) -> Self {
        Self::with_config(calibration, options, EngineConfig::default())
    }

    pub fn with_config(
        calibration: CalibrationData,
        options: AnalyzerOptions,
        config: EngineConfig,
    ) -> Self {
        let screen_references = calibration.screen_angle_references.clone();
        Self {
            baseline: AdaptiveBaseline::new(calibration, config.baseline.clone()),
            filters: FilterSet::new(&config.filters),
            estimator: ScreenAngleEstimator::new(config.screen_angle.clone()),
            options: AnalyzerOptions {
                sensitivity: sanitize_sensitivity(options.sensitivity),
                ..options
            },
            config,
            screen_reference: None,
            screen_references,
            last_timestamp: None,
            diagnostics: None,
        }
    }

    pub fn analyze(&mut self, frame: &DetectionFrame) -> AnalysisResult {
        let confidence = frame.landmarks.mean_visibility(&LandmarkIndex::CRITICAL);
        let delta_secs = self.advance_clock(frame.timestamp);

        if self.is_occluded(frame) {
            tracing::debug!(
                timestamp = frame.timestamp,
                confidence,
                "Critical landmarks occluded, skipping frame"
            );
            let result = AnalysisResult {
                status: PostureStatus {
                    is_good: true,
                    violations: Vec::new(),
                    confidence,
                    timestamp: frame.timestamp,
                },
                angles: PostureAngles::default(),
                deviations: AngleDeviations::default(),
            };
            self.emit_diagnostics(|analyzer| DiagnosticsEvent {
                timestamp: frame.timestamp,
                gated: true,
                confidence,
                raw: PostureAngles::default(),
                compensated: PostureAngles::default(),
                smoothed: PostureAngles::default(),
                baseline: *analyzer.baseline.current(),
                deviations: AngleDeviations::default(),
                pitch_delta: 0.0,
                delta_secs,
                good_posture_duration: analyzer.baseline.good_posture_duration(),
                violations: Vec::new(),
            });
            return result;
        }

        let raw = extract_angles(frame);
        let pitch_delta = self.pitch_delta(frame);
        let compensated = self.estimator.compensate_angles(&raw, pitch_delta);
        let smoothed = self.filters.apply(&compensated);

        // judge against the baseline as it stood before this frame
        let baseline_used = *self.baseline.current();
        let deviations = AngleDeviations::between(&smoothed, &baseline_used);
        let violations = evaluate_all_rules_with(
            &deviations,
            &self.thresholds(),
            &self.options.toggles,
            &self.config.rules.forward_head_weights,
        );
        let is_good = violations.is_empty();

        self.baseline.update(is_good, &smoothed, delta_secs);

        tracing::trace!(
            timestamp = frame.timestamp,
            is_good,
            violations = violations.len(),
            head_forward = smoothed.head_forward,
            pitch_delta,
            "Frame analyzed"
        );

        let status = PostureStatus {
            is_good,
            violations,
            confidence,
            timestamp: frame.timestamp,
        };
        self.emit_diagnostics(|analyzer| DiagnosticsEvent {
            timestamp: frame.timestamp,
            gated: false,
            confidence,
            raw,
            compensated,
            smoothed,
            baseline: baseline_used,
            deviations,
            pitch_delta,
            delta_secs,
            good_posture_duration: analyzer.baseline.good_posture_duration(),
            violations: status.violations.clone(),
        });

        AnalysisResult {
            status,
            angles: smoothed,
            deviations,
        }
    }

    /// Replace the calibration anchor, discarding any accumulated drift
    pub fn update_calibration(&mut self, calibration: CalibrationData) {
        tracing::debug!(
            references = calibration.screen_angle_references.len(),
            "Calibration replaced"
        );
        self.screen_references = calibration.screen_angle_references.clone();
        self.baseline = AdaptiveBaseline::new(calibration, self.config.baseline.clone());
    }

    /// Single-reference compensation. Overrides a lone calibration reference;
    /// two or more references still take precedence.
    pub fn update_screen_angle_reference(&mut self, reference: Option<ScreenAngleSignals>) {
        self.screen_reference = reference;
    }

    pub fn update_screen_angle_references(&mut self, references: Vec<ScreenAngleReference>) {
        self.screen_references = references;
    }

    pub fn update_sensitivity(&mut self, sensitivity: f64) {
        self.options.sensitivity = sanitize_sensitivity(sensitivity);
    }

    pub fn update_rule_toggles(&mut self, toggles: RuleToggles) {
        self.options.toggles = toggles;
    }

    pub fn update_threshold_overrides(&mut self, overrides: RuleThresholdOverrides) {
        self.options.threshold_overrides = overrides;
    }

    pub fn set_debug_mode(&mut self, enabled: bool) {
        self.options.debug_mode = enabled;
    }

    pub fn set_diagnostics_sink<S>(&mut self, sink: S)
    where
        S: DiagnosticsSink + 'static,
    {
        self.diagnostics = Some(Box::new(sink));
    }

    pub fn clear_diagnostics_sink(&mut self) {
        self.diagnostics = None;
    }

    /// Clear filter history and drift; the calibration anchor is kept
    pub fn reset(&mut self) {
        tracing::debug!("Analyzer reset");
        self.filters.reset();
        self.baseline.reset();
        self.last_timestamp = None;
    }

    /// Drifted baseline with the anchor's timestamp and references
    pub fn current_baseline(&self) -> CalibrationData {
        self.baseline.current_calibration()
    }

    pub fn calibration(&self) -> &CalibrationData {
        self.baseline.anchor()
    }

    pub fn good_posture_duration(&self) -> f64 {
        self.baseline.good_posture_duration()
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Thresholds in effect for the next frame
    pub fn thresholds(&self) -> RuleThresholds {
        self.config
            .rules
            .thresholds
            .with_overrides(&self.options.threshold_overrides)
            .scaled(self.options.sensitivity)
    }

    /// Seconds since the previous frame; 0 for the first frame, never negative
    fn advance_clock(&mut self, timestamp: f64) -> f64 {
        if !timestamp.is_finite() {
            return 0.0;
        }
        match self.last_timestamp {
            Some(prev) => {
                self.last_timestamp = Some(prev.max(timestamp));
                ((timestamp - prev) / MILLIS_PER_SEC).max(0.0)
            }
            None => {
                self.last_timestamp = Some(timestamp);
                0.0
            }
        }
    }

    /// More than half of the critical landmarks below the visibility floor
    fn is_occluded(&self, frame: &DetectionFrame) -> bool {
        let min = self.config.visibility.min_visibility;
        let low = LandmarkIndex::CRITICAL
            .iter()
            .filter(|&&i| frame.landmarks[i].clamped_visibility() < min)
            .count();
        low > LandmarkIndex::CRITICAL.len() / 2
    }

    /// Nearest-neighbour against two or more references; otherwise the explicit
    /// single reference, falling back to a lone calibration reference
    fn pitch_delta(&self, frame: &DetectionFrame) -> f64 {
        if self.screen_references.len() >= 2 {
            let current = self.estimator.signals(&frame.landmarks);
            return self
                .estimator
                .estimate_angle_change_multi(&current, &self.screen_references);
        }
        let reference = self
            .screen_reference
            .as_ref()
            .or_else(|| self.screen_references.first().map(|r| &r.signals));
        match reference {
            Some(reference) => {
                let current = self.estimator.signals(&frame.landmarks);
                self.estimator.estimate_angle_change(&current, reference)
            }
            None => 0.0,
        }
    }

    fn emit_diagnostics<F>(&mut self, build: F)
    where
        F: FnOnce(&Self) -> DiagnosticsEvent,
    {
        if !self.options.debug_mode || self.diagnostics.is_none() {
            return;
        }
        let event = build(&*self);
        if let Some(sink) = self.diagnostics.as_mut() {
            sink.emit(&event);
        }
    }
}

impl fmt::Debug for PostureAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostureAnalyzer")
            .field("options", &self.options)
            .field("baseline", &self.baseline)
            .field("screen_references", &self.screen_references.len())
            .field("last_timestamp", &self.last_timestamp)
            .field("diagnostics", &self.diagnostics.is_some())
            .finish_non_exhaustive()
    }
}

fn sanitize_sensitivity(sensitivity: f64) -> f64 {
    if sensitivity.is_finite() {
        sensitivity.clamp(0.0, 1.0)
    } else {
        DEFAULT_SENSITIVITY
    }
}
