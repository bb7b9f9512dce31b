use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-frame posture measurements.
///
/// `face_y` and `nose_to_ear_avg` are optional because calibrations captured
/// before those channels existed carry only the five core channels. The
/// geometry extractor always fills them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostureAngles {
    /// Degrees between the neck vector and world up
    pub head_forward: f64,
    /// Degrees between the torso vector and world down
    pub torso: f64,
    /// Signed degrees of the ear line from horizontal; positive = left ear lower
    pub head_tilt: f64,
    /// Ear span over frame width; larger = closer to the camera
    pub face_frame_ratio: f64,
    /// Signed degrees of the shoulder line from horizontal; positive = left lower
    pub shoulder_diff: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nose_to_ear_avg: Option<f64>,
}

/// Smoothed value minus current baseline, per channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AngleDeviations {
    pub head_forward: f64,
    pub torso: f64,
    pub head_tilt: f64,
    pub face_frame_ratio: f64,
    pub shoulder_diff: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nose_to_ear_avg: Option<f64>,
}

/// One measurement channel of [`PostureAngles`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChannelKind {
    HeadForward,
    Torso,
    HeadTilt,
    FaceFrameRatio,
    ShoulderDiff,
    FaceY,
    NoseToEarAvg,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 7] = [
        ChannelKind::HeadForward,
        ChannelKind::Torso,
        ChannelKind::HeadTilt,
        ChannelKind::FaceFrameRatio,
        ChannelKind::ShoulderDiff,
        ChannelKind::FaceY,
        ChannelKind::NoseToEarAvg,
    ];

    /// Angle channels are in degrees, the rest are dimensionless ratios
    pub fn is_angular(self) -> bool {
        matches!(
            self,
            ChannelKind::HeadForward
                | ChannelKind::Torso
                | ChannelKind::HeadTilt
                | ChannelKind::ShoulderDiff
        )
    }
}

/// Uniform per-channel access shared by angles and deviations
pub trait ChannelValues {
    fn channel(&self, kind: ChannelKind) -> Option<f64>;
    fn set_channel(&mut self, kind: ChannelKind, value: f64);
}

macro_rules! impl_channel_values {
    ($ty:ty) => {
        impl ChannelValues for $ty {
            fn channel(&self, kind: ChannelKind) -> Option<f64> {
                match kind {
                    ChannelKind::HeadForward => Some(self.head_forward),
                    ChannelKind::Torso => Some(self.torso),
                    ChannelKind::HeadTilt => Some(self.head_tilt),
                    ChannelKind::FaceFrameRatio => Some(self.face_frame_ratio),
                    ChannelKind::ShoulderDiff => Some(self.shoulder_diff),
                    ChannelKind::FaceY => self.face_y,
                    ChannelKind::NoseToEarAvg => self.nose_to_ear_avg,
                }
            }

            fn set_channel(&mut self, kind: ChannelKind, value: f64) {
                match kind {
                    ChannelKind::HeadForward => self.head_forward = value,
                    ChannelKind::Torso => self.torso = value,
                    ChannelKind::HeadTilt => self.head_tilt = value,
                    ChannelKind::FaceFrameRatio => self.face_frame_ratio = value,
                    ChannelKind::ShoulderDiff => self.shoulder_diff = value,
                    ChannelKind::FaceY => self.face_y = Some(value),
                    ChannelKind::NoseToEarAvg => self.nose_to_ear_avg = Some(value),
                }
            }
        }
    };
}

impl_channel_values!(PostureAngles);
impl_channel_values!(AngleDeviations);

impl AngleDeviations {
    /// `smoothed - baseline` for every channel present in both
    pub fn between(smoothed: &PostureAngles, baseline: &PostureAngles) -> Self {
        let mut out = AngleDeviations::default();
        for kind in ChannelKind::ALL {
            if let (Some(value), Some(base)) = (smoothed.channel(kind), baseline.channel(kind)) {
                out.set_channel(kind, value - base);
            }
        }
        out
    }
}

/// Viewing-angle proxies taken from image-space face landmarks
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenAngleSignals {
    /// Nose vertical position in the frame (0 = top)
    pub face_y: f64,
    /// Nose-to-mouth vertical span over ear span
    pub nose_chin_ratio: f64,
    /// Eye-to-mouth vertical span over ear span
    pub eye_mouth_ratio: f64,
}

impl ScreenAngleSignals {
    /// Euclidean distance in signal space
    pub fn distance(&self, other: &ScreenAngleSignals) -> f64 {
        ((self.face_y - other.face_y).powi(2)
            + (self.nose_chin_ratio - other.nose_chin_ratio).powi(2)
            + (self.eye_mouth_ratio - other.eye_mouth_ratio).powi(2))
        .sqrt()
    }

    /// Component-wise mean; `None` for an empty slice
    pub fn mean(samples: &[ScreenAngleSignals]) -> Option<ScreenAngleSignals> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let sum = samples
            .iter()
            .fold(ScreenAngleSignals::default(), |acc, s| ScreenAngleSignals {
                face_y: acc.face_y + s.face_y,
                nose_chin_ratio: acc.nose_chin_ratio + s.nose_chin_ratio,
                eye_mouth_ratio: acc.eye_mouth_ratio + s.eye_mouth_ratio,
            });
        Some(ScreenAngleSignals {
            face_y: sum.face_y / n,
            nose_chin_ratio: sum.nose_chin_ratio / n,
            eye_mouth_ratio: sum.eye_mouth_ratio / n,
        })
    }
}

/// Screen-angle signals captured at calibration time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenAngleReference {
    pub signals: ScreenAngleSignals,
    /// Nominal lid angle in degrees (e.g. 90, 110, 130)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lid_angle: Option<f64>,
}

/// Calibrated "correct posture" anchor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationData {
    pub baseline: PostureAngles,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub screen_angle_references: Vec<ScreenAngleReference>,
}

impl CalibrationData {
    pub fn new(baseline: PostureAngles) -> Self {
        Self {
            baseline,
            timestamp: Utc::now(),
            screen_angle_references: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostureRule {
    /// Leaning in or sitting too close; a front camera cannot tell them apart
    ForwardHead,
    Slouch,
    HeadTilt,
    ShoulderAsymmetry,
}

impl PostureRule {
    pub fn as_str(self) -> &'static str {
        match self {
            PostureRule::ForwardHead => "FORWARD_HEAD",
            PostureRule::Slouch => "SLOUCH",
            PostureRule::HeadTilt => "HEAD_TILT",
            PostureRule::ShoulderAsymmetry => "SHOULDER_ASYMMETRY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostureViolation {
    pub rule: PostureRule,
    /// Always within [0,1]
    pub severity: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostureStatus {
    pub is_good: bool,
    pub violations: Vec<PostureViolation>,
    /// Mean visibility of the critical landmarks
    pub confidence: f64,
    /// Frame timestamp (milliseconds)
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub status: PostureStatus,
    pub angles: PostureAngles,
    pub deviations: AngleDeviations,
}
