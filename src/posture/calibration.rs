//! Offline calibration.
//!
//! Accumulates posture samples while the user holds a good posture and
//! turns them into a [`CalibrationData`] anchor. The multi-angle flow repeats
//! the capture at several lid angles and keeps one screen-angle reference per
//! angle; the posture baseline comes from the first angle.

use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;
use crate::posture::config::CalibrationConfig;
use crate::posture::types::{
    CalibrationData, ChannelKind, ChannelValues, PostureAngles, ScreenAngleReference,
    ScreenAngleSignals,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationProgress {
    /// `min(1, sample_count / total_samples)`
    pub progress: f64,
    pub complete: bool,
    pub sample_count: usize,
    pub total_samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationResult {
    pub calibration: CalibrationData,
    /// Population standard deviation per channel
    pub std_dev: PostureAngles,
}

impl CalibrationResult {
    /// Whether every angle channel stayed within `max_angle_std` degrees
    pub fn is_stable(&self, max_angle_std: f64) -> bool {
        ChannelKind::ALL
            .iter()
            .filter(|k| k.is_angular())
            .filter_map(|&k| self.std_dev.channel(k))
            .all(|s| s <= max_angle_std)
    }
}

#[derive(Debug, Clone)]
struct Sample {
    angles: PostureAngles,
    signals: Option<ScreenAngleSignals>,
}

#[derive(Debug, Clone)]
struct AngleCollection {
    reference: ScreenAngleReference,
    mean: PostureAngles,
    std_dev: PostureAngles,
}

#[derive(Debug, Clone)]
pub struct CalibrationService {
    total_samples: usize,
    samples: Vec<Sample>,
    /// `Some(lid_angle)` while an angle collection is open
    active: Option<Option<f64>>,
    collections: Vec<AngleCollection>,
}

impl CalibrationService {
    pub fn new(config: &CalibrationConfig) -> Self {
        Self {
            total_samples: config.total_samples.max(1),
            samples: Vec::new(),
            active: None,
            collections: Vec::new(),
        }
    }

    pub fn add_sample(
        &mut self,
        angles: &PostureAngles,
        screen_signals: Option<&ScreenAngleSignals>,
    ) -> CalibrationProgress {
        self.samples.push(Sample {
            angles: *angles,
            signals: screen_signals.copied(),
        });
        self.progress()
    }

    pub fn progress(&self) -> CalibrationProgress {
        let sample_count = self.samples.len();
        CalibrationProgress {
            progress: (sample_count as f64 / self.total_samples as f64).min(1.0),
            complete: sample_count >= self.total_samples,
            sample_count,
            total_samples: self.total_samples,
        }
    }

    /// Mean and spread of the collected samples
    pub fn compute_baseline(&self) -> Result<CalibrationResult, CalibrationError> {
        if self.samples.is_empty() {
            return Err(CalibrationError::NoSamples);
        }
        let (mean, std_dev) = mean_and_std(&self.samples);

        let signals: Vec<ScreenAngleSignals> =
            self.samples.iter().filter_map(|s| s.signals).collect();
        let mut calibration = CalibrationData::new(mean);
        if let Some(signals) = ScreenAngleSignals::mean(&signals) {
            calibration.screen_angle_references.push(ScreenAngleReference {
                signals,
                lid_angle: None,
            });
        }

        tracing::info!(
            samples = self.samples.len(),
            head_forward = mean.head_forward,
            torso = mean.torso,
            "Calibration baseline computed"
        );
        Ok(CalibrationResult {
            calibration,
            std_dev,
        })
    }

    /// Open a collection for one nominal lid angle, discarding buffered samples
    pub fn start_angle_collection(&mut self, lid_angle: Option<f64>) {
        self.samples.clear();
        self.active = Some(lid_angle);
    }

    /// Commit the open collection as a screen-angle reference; returns the angle count
    pub fn complete_current_angle(&mut self) -> Result<usize, CalibrationError> {
        let Some(lid_angle) = self.active else {
            return Err(CalibrationError::NoActiveCollection);
        };
        if self.samples.is_empty() {
            return Err(CalibrationError::EmptyCollection);
        }
        let signals: Vec<ScreenAngleSignals> =
            self.samples.iter().filter_map(|s| s.signals).collect();
        let signals =
            ScreenAngleSignals::mean(&signals).ok_or(CalibrationError::MissingScreenSignals)?;

        let (mean, std_dev) = mean_and_std(&self.samples);
        self.collections.push(AngleCollection {
            reference: ScreenAngleReference { signals, lid_angle },
            mean,
            std_dev,
        });
        self.samples.clear();
        self.active = None;

        tracing::info!(
            lid_angle = ?lid_angle,
            angle_count = self.collections.len(),
            "Screen angle collected"
        );
        Ok(self.collections.len())
    }

    pub fn angle_count(&self) -> usize {
        self.collections.len()
    }

    pub fn is_collecting(&self) -> bool {
        self.active.is_some()
    }

    /// Baseline from the first angle plus one reference per collected angle
    pub fn compute_multi_angle_baseline(&self) -> Result<CalibrationResult, CalibrationError> {
        let first = self
            .collections
            .first()
            .ok_or(CalibrationError::NoAngleCollections)?;

        let mut calibration = CalibrationData::new(first.mean);
        calibration.screen_angle_references =
            self.collections.iter().map(|c| c.reference).collect();

        tracing::info!(
            angles = self.collections.len(),
            "Multi-angle calibration computed"
        );
        Ok(CalibrationResult {
            calibration,
            std_dev: first.std_dev,
        })
    }

    /// Drop buffered samples and all angle collections
    pub fn reset(&mut self) {
        self.samples.clear();
        self.active = None;
        self.collections.clear();
    }
}

impl Default for CalibrationService {
    fn default() -> Self {
        Self::new(&CalibrationConfig::default())
    }
}

/// Per-channel mean and population standard deviation.
///
/// Optional channels are averaged over the samples that carry them and stay
/// absent if none do.
fn mean_and_std(samples: &[Sample]) -> (PostureAngles, PostureAngles) {
    let mut mean = PostureAngles {
        face_y: None,
        nose_to_ear_avg: None,
        ..PostureAngles::default()
    };
    let mut std_dev = mean;

    for kind in ChannelKind::ALL {
        let values: Vec<f64> = samples
            .iter()
            .filter_map(|s| s.angles.channel(kind))
            .filter(|v| v.is_finite())
            .collect();
        if values.is_empty() {
            continue;
        }
        let n = values.len() as f64;
        let m = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
        mean.set_channel(kind, m);
        std_dev.set_channel(kind, var.sqrt());
    }
    (mean, std_dev)
}
