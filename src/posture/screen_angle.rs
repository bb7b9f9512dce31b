//! 屏幕角度估计与补偿模块
//!
//! 笔记本屏幕开合角度变化会改变摄像头看向面部的视角，
//! 在姿态没有真正变化时也会使头部前倾角产生偏差。
//! 通过三个二维面部信号追踪视角，将其相对校准快照的偏移换算为俯仰角变化
//! （度，正值 = 屏幕后仰），并从头部前倾通道中扣除大部分影响。

use crate::posture::config::ScreenAngleConfig;
use crate::posture::landmarks::{LandmarkIndex, LandmarkSet};
use crate::posture::types::{PostureAngles, ScreenAngleReference, ScreenAngleSignals};

#[derive(Debug, Clone, Default)]
pub struct ScreenAngleEstimator {
    config: ScreenAngleConfig,
}

impl ScreenAngleEstimator {
    pub fn new(config: ScreenAngleConfig) -> Self {
        Self { config }
    }

    /// 从归一化图像关键点提取视角信号
    pub fn signals(&self, image: &LandmarkSet) -> ScreenAngleSignals {
        let nose = &image[LandmarkIndex::Nose];
        let mouth = image[LandmarkIndex::MouthLeft].midpoint(&image[LandmarkIndex::MouthRight]);
        let eyes = image[LandmarkIndex::LeftEye].midpoint(&image[LandmarkIndex::RightEye]);

        let span = image[LandmarkIndex::LeftEar].distance_2d(&image[LandmarkIndex::RightEar]);
        let span = if span.is_finite() && span >= self.config.min_ear_span {
            span
        } else {
            self.config.min_ear_span
        };

        ScreenAngleSignals {
            face_y: nose.y,
            nose_chin_ratio: (mouth.y - nose.y) / span,
            eye_mouth_ratio: (mouth.y - eyes.y) / span,
        }
    }

    /// `current` 相对 `reference` 的俯仰角变化（度）
    pub fn estimate_angle_change(
        &self,
        current: &ScreenAngleSignals,
        reference: &ScreenAngleSignals,
    ) -> f64 {
        let delta = (current.face_y - reference.face_y) * self.config.face_y_sensitivity
            + (current.nose_chin_ratio - reference.nose_chin_ratio)
                * self.config.nose_chin_sensitivity
            + (current.eye_mouth_ratio - reference.eye_mouth_ratio)
                * self.config.eye_mouth_sensitivity;
        if delta.is_finite() {
            delta
        } else {
            0.0
        }
    }

    /// 相对信号空间中最近参考的俯仰角变化，无参考时返回 0
    pub fn estimate_angle_change_multi(
        &self,
        current: &ScreenAngleSignals,
        references: &[ScreenAngleReference],
    ) -> f64 {
        match nearest_reference(current, references) {
            Some(nearest) => self.estimate_angle_change(current, &nearest.signals),
            None => 0.0,
        }
    }

    /// 从头部前倾通道中扣除屏幕倾斜分量
    pub fn compensate_angles(&self, angles: &PostureAngles, pitch_delta: f64) -> PostureAngles {
        let mut out = *angles;
        if pitch_delta.is_finite() {
            out.head_forward -= self.config.compensation_factor * pitch_delta;
        }
        out
    }
}

fn nearest_reference<'a>(
    current: &ScreenAngleSignals,
    references: &'a [ScreenAngleReference],
) -> Option<&'a ScreenAngleReference> {
    references.iter().min_by(|a, b| {
        let da = current.distance(&a.signals);
        let db = current.distance(&b.signals);
        da.total_cmp(&db)
    })
}
