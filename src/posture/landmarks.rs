//! Landmark input types.
//!
//! Landmark sets follow the MediaPipe Pose 33-point order. The set is a
//! fixed-size array so "exactly 33 entries" holds by construction; JSON input
//! with any other length is rejected at deserialisation.

use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::constants::LANDMARK_COUNT;
use crate::error::LandmarkCountError;

/// One tracked body location
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Detector confidence (0.0-1.0)
    #[serde(default)]
    pub visibility: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64, visibility: f64) -> Self {
        Self {
            x,
            y,
            z,
            visibility,
        }
    }

    pub fn midpoint(&self, other: &Landmark) -> Landmark {
        Landmark {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
            z: (self.z + other.z) / 2.0,
            visibility: self.visibility.min(other.visibility),
        }
    }

    /// Distance in the image plane, ignoring depth
    pub fn distance_2d(&self, other: &Landmark) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Visibility clamped to [0,1], with non-finite values treated as 0
    pub fn clamped_visibility(&self) -> f64 {
        if self.visibility.is_finite() {
            self.visibility.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Anatomical index into a landmark set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    MouthLeft,
    MouthRight,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

impl LandmarkIndex {
    /// Landmarks whose visibility gates the whole frame
    pub const CRITICAL: [LandmarkIndex; 4] = [
        LandmarkIndex::LeftEar,
        LandmarkIndex::RightEar,
        LandmarkIndex::LeftShoulder,
        LandmarkIndex::RightShoulder,
    ];

    pub fn as_usize(self) -> usize {
        self as usize
    }
}

/// Exactly 33 landmarks in anatomical order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Landmark>", into = "Vec<Landmark>")]
pub struct LandmarkSet([Landmark; LANDMARK_COUNT]);

impl LandmarkSet {
    pub fn new(landmarks: [Landmark; LANDMARK_COUNT]) -> Self {
        Self(landmarks)
    }

    pub fn get(&self, index: LandmarkIndex) -> &Landmark {
        &self.0[index.as_usize()]
    }

    pub fn set(&mut self, index: LandmarkIndex, landmark: Landmark) {
        self.0[index.as_usize()] = landmark;
    }

    /// Builder-style `set`
    pub fn with(mut self, index: LandmarkIndex, landmark: Landmark) -> Self {
        self.set(index, landmark);
        self
    }

    pub fn as_slice(&self) -> &[Landmark] {
        &self.0
    }

    /// Mean clamped visibility over `indices`; 0 for an empty list
    pub fn mean_visibility(&self, indices: &[LandmarkIndex]) -> f64 {
        if indices.is_empty() {
            return 0.0;
        }
        let sum: f64 = indices
            .iter()
            .map(|&i| self.get(i).clamped_visibility())
            .sum();
        sum / indices.len() as f64
    }
}

impl Default for LandmarkSet {
    fn default() -> Self {
        Self([Landmark::default(); LANDMARK_COUNT])
    }
}

impl Index<LandmarkIndex> for LandmarkSet {
    type Output = Landmark;

    fn index(&self, index: LandmarkIndex) -> &Landmark {
        self.get(index)
    }
}

impl TryFrom<Vec<Landmark>> for LandmarkSet {
    type Error = LandmarkCountError;

    fn try_from(value: Vec<Landmark>) -> Result<Self, Self::Error> {
        let actual = value.len();
        <[Landmark; LANDMARK_COUNT]>::try_from(value)
            .map(Self)
            .map_err(|_| LandmarkCountError {
                expected: LANDMARK_COUNT,
                actual,
            })
    }
}

impl From<LandmarkSet> for Vec<Landmark> {
    fn from(set: LandmarkSet) -> Self {
        set.0.to_vec()
    }
}

/// One sampled instant from the external landmark detector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionFrame {
    /// Image-normalized landmarks (x, y in [0,1], y pointing down)
    pub landmarks: LandmarkSet,
    /// World-space landmarks (metres, hip-centred, y pointing down)
    pub world_landmarks: LandmarkSet,
    /// Monotonic timestamp (milliseconds)
    pub timestamp: f64,
    pub frame_width: f64,
    pub frame_height: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_order_matches_pose_model() {
        assert_eq!(LandmarkIndex::Nose.as_usize(), 0);
        assert_eq!(LandmarkIndex::LeftEar.as_usize(), 7);
        assert_eq!(LandmarkIndex::RightEar.as_usize(), 8);
        assert_eq!(LandmarkIndex::LeftShoulder.as_usize(), 11);
        assert_eq!(LandmarkIndex::RightHip.as_usize(), 24);
        assert_eq!(LandmarkIndex::RightFootIndex.as_usize(), LANDMARK_COUNT - 1);
    }

    #[test]
    fn rejects_wrong_length() {
        let short = vec![Landmark::default(); 32];
        let err = LandmarkSet::try_from(short).unwrap_err();
        assert_eq!(err.actual, 32);

        let json = serde_json::to_string(&vec![Landmark::default(); 34]).unwrap();
        assert!(serde_json::from_str::<LandmarkSet>(&json).is_err());
    }

    #[test]
    fn json_uses_plain_array() {
        let set = LandmarkSet::default().with(LandmarkIndex::Nose, Landmark::new(0.5, 0.4, 0.0, 0.9));
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json.as_array().map(|a| a.len()), Some(LANDMARK_COUNT));
        let back: LandmarkSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn mean_visibility_clamps_and_ignores_nan() {
        let set = LandmarkSet::default()
            .with(LandmarkIndex::LeftEar, Landmark::new(0.0, 0.0, 0.0, 1.5))
            .with(LandmarkIndex::RightEar, Landmark::new(0.0, 0.0, 0.0, f64::NAN));
        let mean = set.mean_visibility(&[LandmarkIndex::LeftEar, LandmarkIndex::RightEar]);
        assert!((mean - 0.5).abs() < 1e-12);
    }
}
