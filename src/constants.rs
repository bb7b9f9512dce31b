/// Number of landmarks in one pose landmark set
pub const LANDMARK_COUNT: usize = 33;

/// Visibility below this marks a landmark as unreliable
pub const DEFAULT_MIN_VISIBILITY: f64 = 0.5;

/// Consecutive good-posture seconds before the baseline starts drifting
pub const DEFAULT_DRIFT_WARMUP_SECS: f64 = 30.0;

/// Fraction of the gap closed per second of drift
pub const DEFAULT_DRIFT_RATE_PER_SEC: f64 = 0.001;

/// Max distance (degrees) a drifted angle channel may move from calibration
pub const ANGLE_DRIFT_CEILING_DEG: f64 = 8.0;

/// Max distance a drifted ratio channel may move from calibration
pub const RATIO_DRIFT_CEILING: f64 = 0.1;

/// Pitch sensitivity of the nose vertical position (degrees per unit)
pub const FACE_Y_SENSITIVITY_DEG: f64 = 45.0;

/// Pitch sensitivity of the nose-to-mouth / ear-span ratio (degrees per unit)
pub const NOSE_CHIN_SENSITIVITY_DEG: f64 = 30.0;

/// Pitch sensitivity of the eye-to-mouth / ear-span ratio (degrees per unit)
pub const EYE_MOUTH_SENSITIVITY_DEG: f64 = 20.0;

/// Share of the estimated pitch delta removed from the head-forward angle
pub const HEAD_FORWARD_COMPENSATION: f64 = 0.8;

/// Divisor used when the ear span collapses
pub const MIN_EAR_SPAN: f64 = 0.01;

/// Divisor used when the shoulder span collapses
pub const MIN_SHOULDER_SPAN: f64 = 0.01;

/// Default calibration session length (frames)
pub const DEFAULT_CALIBRATION_SAMPLES: usize = 30;

/// Default user sensitivity
pub const DEFAULT_SENSITIVITY: f64 = 0.5;

/// Milliseconds per second
pub const MILLIS_PER_SEC: f64 = 1000.0;
