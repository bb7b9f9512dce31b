use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::posture::rules::RuleThresholds;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterConfig {
    pub angle_alpha: f64,
    pub ratio_alpha: f64,
    /// Dead zone for the four angle channels (degrees)
    pub angle_deadzone: f64,
    pub face_frame_ratio_deadzone: f64,
    pub face_y_deadzone: f64,
    pub nose_to_ear_deadzone: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            angle_alpha: 0.3,
            ratio_alpha: 0.3,
            angle_deadzone: 1.0,
            face_frame_ratio_deadzone: 0.005,
            face_y_deadzone: 0.01,
            nose_to_ear_deadzone: 0.02,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BaselineConfig {
    pub warmup_secs: f64,
    pub drift_rate_per_sec: f64,
    pub angle_ceiling_deg: f64,
    pub ratio_ceiling: f64,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            warmup_secs: DEFAULT_DRIFT_WARMUP_SECS,
            drift_rate_per_sec: DEFAULT_DRIFT_RATE_PER_SEC,
            angle_ceiling_deg: ANGLE_DRIFT_CEILING_DEG,
            ratio_ceiling: RATIO_DRIFT_CEILING,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScreenAngleConfig {
    pub face_y_sensitivity: f64,
    pub nose_chin_sensitivity: f64,
    pub eye_mouth_sensitivity: f64,
    pub compensation_factor: f64,
    pub min_ear_span: f64,
}

impl Default for ScreenAngleConfig {
    fn default() -> Self {
        Self {
            face_y_sensitivity: FACE_Y_SENSITIVITY_DEG,
            nose_chin_sensitivity: NOSE_CHIN_SENSITIVITY_DEG,
            eye_mouth_sensitivity: EYE_MOUTH_SENSITIVITY_DEG,
            compensation_factor: HEAD_FORWARD_COMPENSATION,
            min_ear_span: MIN_EAR_SPAN,
        }
    }
}

/// Weights of the three forward-head sub-scores
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForwardHeadWeights {
    pub nose_to_ear: f64,
    pub face_frame: f64,
    pub angle: f64,
}

impl Default for ForwardHeadWeights {
    fn default() -> Self {
        Self {
            nose_to_ear: 0.6,
            face_frame: 0.2,
            angle: 0.2,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfig {
    #[serde(default)]
    pub thresholds: RuleThresholds,
    #[serde(default)]
    pub forward_head_weights: ForwardHeadWeights,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalibrationConfig {
    pub total_samples: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            total_samples: DEFAULT_CALIBRATION_SAMPLES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisibilityConfig {
    pub min_visibility: f64,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            min_visibility: DEFAULT_MIN_VISIBILITY,
        }
    }
}

/// Engine tuning shared by every analyzer instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub baseline: BaselineConfig,
    #[serde(default)]
    pub screen_angle: ScreenAngleConfig,
    #[serde(default)]
    pub rules: RuleConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub visibility: VisibilityConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), String> {
        let alpha_ok = |a: f64| a > 0.0 && a <= 1.0;
        if !alpha_ok(self.filters.angle_alpha) {
            return Err("filters.angle_alpha must be in (0,1]".to_string());
        }
        if !alpha_ok(self.filters.ratio_alpha) {
            return Err("filters.ratio_alpha must be in (0,1]".to_string());
        }
        if self.filters.angle_deadzone < 0.0
            || self.filters.face_frame_ratio_deadzone < 0.0
            || self.filters.face_y_deadzone < 0.0
            || self.filters.nose_to_ear_deadzone < 0.0
        {
            return Err("filter deadzones must be >= 0".to_string());
        }

        if self.baseline.warmup_secs < 0.0 {
            return Err("baseline.warmup_secs must be >= 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.baseline.drift_rate_per_sec) {
            return Err("baseline.drift_rate_per_sec must be in [0,1]".to_string());
        }
        if self.baseline.angle_ceiling_deg < 0.0 || self.baseline.ratio_ceiling < 0.0 {
            return Err("baseline drift ceilings must be >= 0".to_string());
        }

        if !(0.0..=1.0).contains(&self.screen_angle.compensation_factor) {
            return Err("screen_angle.compensation_factor must be in [0,1]".to_string());
        }
        if self.screen_angle.min_ear_span <= 0.0 {
            return Err("screen_angle.min_ear_span must be > 0".to_string());
        }

        let w = &self.rules.forward_head_weights;
        if w.nose_to_ear < 0.0 || w.face_frame < 0.0 || w.angle < 0.0 {
            return Err("rules.forward_head_weights must be >= 0".to_string());
        }
        let weight_sum = w.nose_to_ear + w.face_frame + w.angle;
        if (weight_sum - 1.0).abs() > 0.01 {
            return Err(format!(
                "rules.forward_head_weights should sum to ~1.0 (got {weight_sum:.3})"
            ));
        }
        let t = &self.rules.thresholds;
        if [
            t.nose_to_ear_ratio,
            t.face_frame_ratio,
            t.forward_head_angle,
            t.slouch,
            t.head_tilt,
            t.shoulder_asymmetry,
        ]
        .iter()
        .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err("rules.thresholds must be finite and >= 0".to_string());
        }

        if self.calibration.total_samples == 0 {
            return Err("calibration.total_samples must be > 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.visibility.min_visibility) {
            return Err("visibility.min_visibility must be in [0,1]".to_string());
        }

        Ok(())
    }
}
