//! Rule evaluation.
//!
//! Pure functions from deviations, thresholds and toggles to violations.
//! Output order is fixed: forward head, slouch, head tilt, shoulder asymmetry.
//!
//! Forward head and "too close" are one rule: a front camera cannot tell
//! leaning in from sitting closer. It fuses three sub-scores
//! (deviation / threshold, floored at 0):
//! - nose/ear ratio: 0.6
//! - face/frame ratio: 0.2
//! - head-forward angle: 0.2
//!
//! The combined score is `max(fused, angle sub-score)`, and the rule fires
//! above 1.0 with severity `combined - 1`. A missing nose/ear channel drops
//! out of the fusion and the remaining weights are renormalised. Any
//! non-positive component threshold saturates the rule at severity 1.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_SENSITIVITY;
use crate::posture::config::ForwardHeadWeights;
use crate::posture::types::{AngleDeviations, PostureRule, PostureViolation};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleThresholds {
    pub nose_to_ear_ratio: f64,
    pub face_frame_ratio: f64,
    /// Degrees
    pub forward_head_angle: f64,
    /// Degrees
    pub slouch: f64,
    /// Degrees
    pub head_tilt: f64,
    /// Degrees
    pub shoulder_asymmetry: f64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            nose_to_ear_ratio: 0.08,
            face_frame_ratio: 0.04,
            forward_head_angle: 10.0,
            slouch: 8.0,
            head_tilt: 10.0,
            shoulder_asymmetry: 5.0,
        }
    }
}

/// Per-rule threshold overrides from the settings store
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleThresholdOverrides {
    #[serde(default)]
    pub nose_to_ear_ratio: Option<f64>,
    #[serde(default)]
    pub face_frame_ratio: Option<f64>,
    #[serde(default)]
    pub forward_head_angle: Option<f64>,
    #[serde(default)]
    pub slouch: Option<f64>,
    #[serde(default)]
    pub head_tilt: Option<f64>,
    #[serde(default)]
    pub shoulder_asymmetry: Option<f64>,
}

impl RuleThresholds {
    pub fn with_overrides(&self, overrides: &RuleThresholdOverrides) -> Self {
        Self {
            nose_to_ear_ratio: overrides.nose_to_ear_ratio.unwrap_or(self.nose_to_ear_ratio),
            face_frame_ratio: overrides.face_frame_ratio.unwrap_or(self.face_frame_ratio),
            forward_head_angle: overrides
                .forward_head_angle
                .unwrap_or(self.forward_head_angle),
            slouch: overrides.slouch.unwrap_or(self.slouch),
            head_tilt: overrides.head_tilt.unwrap_or(self.head_tilt),
            shoulder_asymmetry: overrides
                .shoulder_asymmetry
                .unwrap_or(self.shoulder_asymmetry),
        }
    }

    /// Thresholds scaled by user sensitivity: 1.5x at 0, 1x at 0.5, 0.5x at 1
    pub fn scaled(&self, sensitivity: f64) -> Self {
        let m = sensitivity_multiplier(sensitivity);
        Self {
            nose_to_ear_ratio: self.nose_to_ear_ratio * m,
            face_frame_ratio: self.face_frame_ratio * m,
            forward_head_angle: self.forward_head_angle * m,
            slouch: self.slouch * m,
            head_tilt: self.head_tilt * m,
            shoulder_asymmetry: self.shoulder_asymmetry * m,
        }
    }
}

pub fn sensitivity_multiplier(sensitivity: f64) -> f64 {
    let s = if sensitivity.is_finite() {
        sensitivity.clamp(0.0, 1.0)
    } else {
        DEFAULT_SENSITIVITY
    };
    1.5 - s
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleToggles {
    pub forward_head: bool,
    pub slouch: bool,
    pub head_tilt: bool,
    pub shoulder_asymmetry: bool,
}

impl Default for RuleToggles {
    fn default() -> Self {
        Self {
            forward_head: true,
            slouch: true,
            head_tilt: true,
            shoulder_asymmetry: true,
        }
    }
}

/// `value / threshold` floored at 0; a non-positive threshold saturates
fn sub_score(value: f64, threshold: f64) -> f64 {
    if !(threshold > 0.0) {
        return f64::INFINITY;
    }
    (value / threshold).max(0.0)
}

/// Severity when `value` exceeds `threshold`, `None` otherwise
fn exceedance(value: f64, threshold: f64) -> Option<f64> {
    if !(threshold > 0.0) {
        return Some(1.0);
    }
    if value > threshold {
        Some(((value - threshold) / threshold).clamp(0.0, 1.0))
    } else {
        None
    }
}

/// Combined forward-head score; fires above 1.0
pub fn forward_head_score(
    deviations: &AngleDeviations,
    thresholds: &RuleThresholds,
    weights: &ForwardHeadWeights,
) -> f64 {
    // a non-positive component threshold saturates even when its channel is absent
    let component_thresholds = [
        thresholds.nose_to_ear_ratio,
        thresholds.face_frame_ratio,
        thresholds.forward_head_angle,
    ];
    if component_thresholds.iter().any(|t| !(*t > 0.0)) {
        return f64::INFINITY;
    }

    let angle = sub_score(deviations.head_forward, thresholds.forward_head_angle);
    let terms = [
        (
            weights.nose_to_ear,
            deviations
                .nose_to_ear_avg
                .map(|ratio| sub_score(ratio, thresholds.nose_to_ear_ratio)),
        ),
        (
            weights.face_frame,
            Some(sub_score(
                deviations.face_frame_ratio,
                thresholds.face_frame_ratio,
            )),
        ),
        (weights.angle, Some(angle)),
    ];

    let (weighted, total) = terms
        .iter()
        .filter_map(|&(w, score)| score.filter(|_| w > 0.0).map(|s| (w, s)))
        .fold((0.0, 0.0), |(acc, tw), (w, s)| (acc + w * s, tw + w));
    let fused = if total > 0.0 { weighted / total } else { 0.0 };

    fused.max(angle)
}

pub fn evaluate_forward_head(
    deviations: &AngleDeviations,
    thresholds: &RuleThresholds,
    weights: &ForwardHeadWeights,
) -> Option<PostureViolation> {
    let combined = forward_head_score(deviations, thresholds, weights);
    if combined > 1.0 {
        Some(PostureViolation {
            rule: PostureRule::ForwardHead,
            severity: (combined - 1.0).clamp(0.0, 1.0),
            message: "Head is too far forward or too close to the screen".to_string(),
        })
    } else {
        None
    }
}

pub fn evaluate_slouch(
    deviations: &AngleDeviations,
    thresholds: &RuleThresholds,
) -> Option<PostureViolation> {
    exceedance(deviations.torso, thresholds.slouch).map(|severity| PostureViolation {
        rule: PostureRule::Slouch,
        severity,
        message: "Slouching: sit up straight".to_string(),
    })
}

pub fn evaluate_head_tilt(
    deviations: &AngleDeviations,
    thresholds: &RuleThresholds,
) -> Option<PostureViolation> {
    exceedance(deviations.head_tilt.abs(), thresholds.head_tilt).map(|severity| {
        let side = if deviations.head_tilt >= 0.0 {
            "left"
        } else {
            "right"
        };
        PostureViolation {
            rule: PostureRule::HeadTilt,
            severity,
            message: format!("Head tilted to the {side}"),
        }
    })
}

pub fn evaluate_shoulder_asymmetry(
    deviations: &AngleDeviations,
    thresholds: &RuleThresholds,
) -> Option<PostureViolation> {
    exceedance(deviations.shoulder_diff.abs(), thresholds.shoulder_asymmetry).map(|severity| {
        PostureViolation {
            rule: PostureRule::ShoulderAsymmetry,
            severity,
            message: "Shoulders are uneven".to_string(),
        }
    })
}

/// Evaluate every enabled rule with the default forward-head weights
pub fn evaluate_all_rules(
    deviations: &AngleDeviations,
    thresholds: &RuleThresholds,
    toggles: &RuleToggles,
) -> Vec<PostureViolation> {
    evaluate_all_rules_with(
        deviations,
        thresholds,
        toggles,
        &ForwardHeadWeights::default(),
    )
}

pub fn evaluate_all_rules_with(
    deviations: &AngleDeviations,
    thresholds: &RuleThresholds,
    toggles: &RuleToggles,
    weights: &ForwardHeadWeights,
) -> Vec<PostureViolation> {
    let mut violations = Vec::new();
    if toggles.forward_head {
        violations.extend(evaluate_forward_head(deviations, thresholds, weights));
    }
    if toggles.slouch {
        violations.extend(evaluate_slouch(deviations, thresholds));
    }
    if toggles.head_tilt {
        violations.extend(evaluate_head_tilt(deviations, thresholds));
    }
    if toggles.shoulder_asymmetry {
        violations.extend(evaluate_shoulder_asymmetry(deviations, thresholds));
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev() -> AngleDeviations {
        AngleDeviations::default()
    }

    #[test]
    fn neutral_deviations_are_clean() {
        let out = evaluate_all_rules(&dev(), &RuleThresholds::default(), &RuleToggles::default());
        assert!(out.is_empty());
    }

    #[test]
    fn large_angle_alone_triggers_forward_head() {
        let d = AngleDeviations {
            head_forward: 20.0,
            ..dev()
        };
        let out = evaluate_all_rules(&d, &RuleThresholds::default(), &RuleToggles::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].rule, PostureRule::ForwardHead);
        assert!(out[0].severity > 0.0);
    }

    #[test]
    fn fusion_combines_weak_signals() {
        // angle alone stays under its threshold, the ratios carry the score
        let t = RuleThresholds::default();
        let d = AngleDeviations {
            head_forward: t.forward_head_angle * 0.5,
            face_frame_ratio: t.face_frame_ratio * 1.2,
            nose_to_ear_avg: Some(t.nose_to_ear_ratio * 1.4),
            ..dev()
        };
        let score = forward_head_score(&d, &t, &ForwardHeadWeights::default());
        assert!((score - (0.6 * 1.4 + 0.2 * 1.2 + 0.2 * 0.5)).abs() < 1e-9);
        assert!(evaluate_forward_head(&d, &t, &ForwardHeadWeights::default()).is_some());
    }

    #[test]
    fn missing_ratio_channel_renormalises() {
        let t = RuleThresholds::default();
        let d = AngleDeviations {
            head_forward: t.forward_head_angle * 0.5,
            face_frame_ratio: t.face_frame_ratio * 2.0,
            ..dev()
        };
        let score = forward_head_score(&d, &t, &ForwardHeadWeights::default());
        assert!((score - 1.25).abs() < 1e-9);
    }

    #[test]
    fn leaning_back_never_scores() {
        let d = AngleDeviations {
            head_forward: -30.0,
            face_frame_ratio: -0.2,
            nose_to_ear_avg: Some(-0.5),
            ..dev()
        };
        assert_eq!(
            forward_head_score(&d, &RuleThresholds::default(), &ForwardHeadWeights::default()),
            0.0
        );
    }

    #[test]
    fn slouch_severity_formula() {
        let t = RuleThresholds {
            slouch: 10.0,
            ..RuleThresholds::default()
        };
        let d = AngleDeviations { torso: 15.0, ..dev() };
        let v = evaluate_slouch(&d, &t).unwrap();
        assert!((v.severity - 0.5).abs() < 1e-12);
        let d = AngleDeviations { torso: 50.0, ..dev() };
        assert_eq!(evaluate_slouch(&d, &t).unwrap().severity, 1.0);
        let d = AngleDeviations { torso: 10.0, ..dev() };
        assert!(evaluate_slouch(&d, &t).is_none());
    }

    #[test]
    fn tilt_and_shoulders_use_magnitude() {
        let t = RuleThresholds::default();
        let d = AngleDeviations {
            head_tilt: -15.0,
            shoulder_diff: -7.5,
            ..dev()
        };
        let tilt = evaluate_head_tilt(&d, &t).unwrap();
        assert!((tilt.severity - 0.5).abs() < 1e-12);
        assert!(tilt.message.contains("right"));
        let sh = evaluate_shoulder_asymmetry(&d, &t).unwrap();
        assert!((sh.severity - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_threshold_always_triggers_at_full_severity() {
        let t = RuleThresholds {
            nose_to_ear_ratio: 0.0,
            face_frame_ratio: 0.0,
            forward_head_angle: 0.0,
            slouch: 0.0,
            head_tilt: 0.0,
            shoulder_asymmetry: 0.0,
        };
        let out = evaluate_all_rules(&dev(), &t, &RuleToggles::default());
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|v| v.severity == 1.0));

        // five-channel calibrations leave the nose/ear deviation absent
        for t in [
            RuleThresholds {
                nose_to_ear_ratio: 0.0,
                ..RuleThresholds::default()
            },
            RuleThresholds {
                face_frame_ratio: 0.0,
                ..RuleThresholds::default()
            },
        ] {
            let d = dev();
            assert_eq!(d.nose_to_ear_avg, None);
            let v = evaluate_forward_head(&d, &t, &ForwardHeadWeights::default())
                .expect("saturated forward head");
            assert_eq!(v.severity, 1.0);
        }

        // a zero weight does not hide a zero threshold
        let weights = ForwardHeadWeights {
            nose_to_ear: 0.0,
            ..ForwardHeadWeights::default()
        };
        let t = RuleThresholds {
            nose_to_ear_ratio: 0.0,
            ..RuleThresholds::default()
        };
        assert!(evaluate_forward_head(&dev(), &t, &weights).is_some());
    }

    #[test]
    fn disabled_rules_and_fixed_order() {
        let t = RuleThresholds {
            slouch: 0.0,
            head_tilt: 0.0,
            shoulder_asymmetry: 0.0,
            forward_head_angle: 0.0,
            ..RuleThresholds::default()
        };
        let toggles = RuleToggles {
            head_tilt: false,
            ..RuleToggles::default()
        };
        let rules: Vec<_> = evaluate_all_rules(&dev(), &t, &toggles)
            .into_iter()
            .map(|v| v.rule)
            .collect();
        assert_eq!(
            rules,
            vec![
                PostureRule::ForwardHead,
                PostureRule::Slouch,
                PostureRule::ShoulderAsymmetry
            ]
        );
    }

    #[test]
    fn sensitivity_scales_thresholds() {
        let base = RuleThresholds::default();
        assert_eq!(base.scaled(0.5), base);
        assert!((base.scaled(1.0).slouch - base.slouch * 0.5).abs() < 1e-12);
        assert!((base.scaled(0.0).slouch - base.slouch * 1.5).abs() < 1e-12);
        assert_eq!(base.scaled(f64::NAN), base);
        assert_eq!(base.scaled(7.0), base.scaled(1.0));
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let base = RuleThresholds::default();
        let o = RuleThresholdOverrides {
            slouch: Some(3.0),
            ..RuleThresholdOverrides::default()
        };
        let merged = base.with_overrides(&o);
        assert_eq!(merged.slouch, 3.0);
        assert_eq!(merged.head_tilt, base.head_tilt);
    }
}
