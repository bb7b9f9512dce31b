use proptest::prelude::*;

use posture_engine::posture::baseline::AdaptiveBaseline;
use posture_engine::posture::config::{BaselineConfig, ForwardHeadWeights};
use posture_engine::posture::rules::{
    evaluate_all_rules, evaluate_forward_head, evaluate_head_tilt, evaluate_shoulder_asymmetry,
    evaluate_slouch,
};
use posture_engine::posture::screen_angle::ScreenAngleEstimator;
use posture_engine::posture::types::{ChannelKind, ChannelValues};
use posture_engine::posture::{
    AngleDeviations, CalibrationData, PostureAngles, PostureViolation, RuleThresholds,
    RuleToggles,
};

fn severity(v: Option<PostureViolation>) -> f64 {
    v.map(|v| v.severity).unwrap_or(0.0)
}

fn angles(
    head_forward: f64,
    torso: f64,
    head_tilt: f64,
    face_frame_ratio: f64,
    shoulder_diff: f64,
) -> PostureAngles {
    PostureAngles {
        head_forward,
        torso,
        head_tilt,
        face_frame_ratio,
        shoulder_diff,
        face_y: Some(face_frame_ratio + 0.2),
        nose_to_ear_avg: Some(face_frame_ratio * 3.0),
    }
}

proptest! {
    #[test]
    fn pt_severity_always_in_unit_range(
        hf in -90.0_f64..90.0,
        torso in -90.0_f64..90.0,
        tilt in -90.0_f64..90.0,
        frame in -1.0_f64..1.0,
        shoulder in -90.0_f64..90.0,
        ratio in -2.0_f64..2.0,
        threshold_scale in 0.0_f64..3.0,
    ) {
        let deviations = AngleDeviations {
            head_forward: hf,
            torso,
            head_tilt: tilt,
            face_frame_ratio: frame,
            shoulder_diff: shoulder,
            face_y: None,
            nose_to_ear_avg: Some(ratio),
        };
        let thresholds = RuleThresholds::default().scaled(0.5);
        let thresholds = RuleThresholds {
            slouch: thresholds.slouch * threshold_scale,
            head_tilt: thresholds.head_tilt * threshold_scale,
            ..thresholds
        };
        for v in evaluate_all_rules(&deviations, &thresholds, &RuleToggles::default()) {
            prop_assert!((0.0..=1.0).contains(&v.severity), "{:?}", v);
        }
    }

    #[test]
    fn pt_severity_monotonic_in_deviation(
        a in -60.0_f64..60.0,
        b in -60.0_f64..60.0,
        ratio in 0.0_f64..0.3,
    ) {
        let (lo, hi) = if a.abs() <= b.abs() { (a, b) } else { (b, a) };
        let t = RuleThresholds::default();
        let w = ForwardHeadWeights::default();

        let dev = |x: f64| AngleDeviations {
            head_forward: x.abs(),
            torso: x.abs(),
            head_tilt: x,
            shoulder_diff: x,
            nose_to_ear_avg: Some(ratio),
            ..AngleDeviations::default()
        };
        let (d_lo, d_hi) = (dev(lo), dev(hi));

        prop_assert!(severity(evaluate_forward_head(&d_lo, &t, &w)) <= severity(evaluate_forward_head(&d_hi, &t, &w)));
        prop_assert!(severity(evaluate_slouch(&d_lo, &t)) <= severity(evaluate_slouch(&d_hi, &t)));
        prop_assert!(severity(evaluate_head_tilt(&d_lo, &t)) <= severity(evaluate_head_tilt(&d_hi, &t)));
        prop_assert!(severity(evaluate_shoulder_asymmetry(&d_lo, &t)) <= severity(evaluate_shoulder_asymmetry(&d_hi, &t)));
    }

    #[test]
    fn pt_baseline_stays_within_ceiling(
        steps in prop::collection::vec(
            ((-90.0_f64..90.0), (0.0_f64..1.0), (0.0_f64..120.0), any::<bool>()),
            1..80,
        ),
    ) {
        let config = BaselineConfig::default();
        let anchor = CalibrationData::new(angles(5.0, 3.0, 1.0, 0.2, 0.5));
        let mut baseline = AdaptiveBaseline::new(anchor.clone(), config.clone());

        for (angle, ratio, dt, good) in steps {
            let live = angles(angle, angle, -angle, ratio, angle / 2.0);
            baseline.update(good, &live, dt);

            for kind in ChannelKind::ALL {
                let (Some(current), Some(origin)) =
                    (baseline.current().channel(kind), anchor.baseline.channel(kind))
                else {
                    continue;
                };
                let ceiling = if kind.is_angular() {
                    config.angle_ceiling_deg
                } else {
                    config.ratio_ceiling
                };
                prop_assert!((current - origin).abs() <= ceiling + 1e-9, "{:?}", kind);
            }
        }
    }

    #[test]
    fn pt_zero_pitch_compensation_is_identity(
        hf in -90.0_f64..90.0,
        torso in -90.0_f64..90.0,
        tilt in -45.0_f64..45.0,
        frame in 0.0_f64..1.0,
        shoulder in -45.0_f64..45.0,
    ) {
        let estimator = ScreenAngleEstimator::default();
        let input = angles(hf, torso, tilt, frame, shoulder);
        prop_assert_eq!(estimator.compensate_angles(&input, 0.0), input);
    }
}
