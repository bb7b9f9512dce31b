use posture_engine::posture::geometry::extract_angles;
use posture_engine::posture::screen_angle::ScreenAngleEstimator;
use posture_engine::posture::{
    CalibrationData, DetectionFrame, Landmark, LandmarkIndex, LandmarkSet, ScreenAngleReference,
};

/// Frames of a seated user facing a 640x480 camera
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    timestamp: f64,
    head_forward_m: f64,
    torso_lean_m: f64,
    ear_drop_m: f64,
    shoulder_drop_m: f64,
    face_shift_y: f64,
    visibility: f64,
    occluded: usize,
}

impl FrameBuilder {
    pub fn upright(timestamp: f64) -> Self {
        Self {
            timestamp,
            head_forward_m: 0.0,
            torso_lean_m: 0.0,
            ear_drop_m: 0.0,
            shoulder_drop_m: 0.0,
            face_shift_y: 0.0,
            visibility: 0.95,
            occluded: 0,
        }
    }

    /// Ears moved toward the camera (metres)
    pub fn head_forward(mut self, metres: f64) -> Self {
        self.head_forward_m = metres;
        self
    }

    /// Shoulders moved toward the camera relative to the hips (metres)
    pub fn slouch(mut self, metres: f64) -> Self {
        self.torso_lean_m = metres;
        self
    }

    /// Left ear lowered (metres)
    pub fn head_tilt(mut self, metres: f64) -> Self {
        self.ear_drop_m = metres;
        self
    }

    /// Left shoulder lowered (metres)
    pub fn shoulder_drop(mut self, metres: f64) -> Self {
        self.shoulder_drop_m = metres;
        self
    }

    /// Whole face moved down the image, as when the lid tilts back
    pub fn face_shift(mut self, dy: f64) -> Self {
        self.face_shift_y = dy;
        self
    }

    /// Drop the visibility of the first `count` critical landmarks to 0.1
    pub fn occlude(mut self, count: usize) -> Self {
        self.occluded = count;
        self
    }

    pub fn build(&self) -> DetectionFrame {
        let v = self.visibility;
        let lm = |x: f64, y: f64, z: f64| Landmark::new(x, y, z, v);
        let f = self.head_forward_m;
        let s = self.torso_lean_m;

        let world = LandmarkSet::default()
            .with(LandmarkIndex::Nose, lm(0.0, -0.62, -0.10 - f - s))
            .with(
                LandmarkIndex::LeftEar,
                lm(0.08, -0.60 + self.ear_drop_m, -f - s),
            )
            .with(LandmarkIndex::RightEar, lm(-0.08, -0.60, -f - s))
            .with(
                LandmarkIndex::LeftShoulder,
                lm(0.18, -0.40 + self.shoulder_drop_m, -s),
            )
            .with(LandmarkIndex::RightShoulder, lm(-0.18, -0.40, -s))
            .with(LandmarkIndex::LeftHip, lm(0.12, 0.0, 0.0))
            .with(LandmarkIndex::RightHip, lm(-0.12, 0.0, 0.0));

        let dy = self.face_shift_y;
        let mut image = LandmarkSet::default()
            .with(LandmarkIndex::Nose, lm(0.50, 0.35 + dy, 0.0))
            .with(LandmarkIndex::LeftEye, lm(0.53, 0.32 + dy, 0.0))
            .with(LandmarkIndex::RightEye, lm(0.47, 0.32 + dy, 0.0))
            .with(LandmarkIndex::MouthLeft, lm(0.52, 0.40 + dy, 0.0))
            .with(LandmarkIndex::MouthRight, lm(0.48, 0.40 + dy, 0.0))
            .with(LandmarkIndex::LeftEar, lm(0.58, 0.34 + dy, 0.0))
            .with(LandmarkIndex::RightEar, lm(0.42, 0.34 + dy, 0.0))
            .with(LandmarkIndex::LeftShoulder, lm(0.68, 0.60, 0.0))
            .with(LandmarkIndex::RightShoulder, lm(0.32, 0.60, 0.0));

        for &idx in LandmarkIndex::CRITICAL.iter().take(self.occluded) {
            let mut landmark = image[idx];
            landmark.visibility = 0.1;
            image.set(idx, landmark);
        }

        DetectionFrame {
            landmarks: image,
            world_landmarks: world,
            timestamp: self.timestamp,
            frame_width: 640.0,
            frame_height: 480.0,
        }
    }
}

/// Calibration captured from an upright frame, with its screen reference
pub fn upright_calibration() -> CalibrationData {
    let frame = FrameBuilder::upright(0.0).build();
    let mut calibration = CalibrationData::new(extract_angles(&frame));
    calibration
        .screen_angle_references
        .push(ScreenAngleReference {
            signals: ScreenAngleEstimator::default().signals(&frame.landmarks),
            lid_angle: Some(110.0),
        });
    calibration
}

/// `count` frames `step_ms` apart starting at `start_ms`
pub fn stream(start_ms: f64, step_ms: f64, count: usize) -> impl Iterator<Item = f64> {
    (0..count).map(move |i| start_ms + step_ms * i as f64)
}
