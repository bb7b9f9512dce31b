//! 自适应基线模块
//!
//! 持续良好姿态经过预热期后，基线各通道向实时平滑值缓慢漂移
//! （一阶，超出预热的每秒良好时间漂移 `drift_rate_per_sec`）。
//! 每个通道都有相对校准锚点的漂移上限：漂移可以吸收座椅调整，
//! 但永远无法完全掩盖不良姿态。

use crate::posture::config::BaselineConfig;
use crate::posture::types::{CalibrationData, ChannelKind, ChannelValues, PostureAngles};

#[derive(Debug, Clone)]
pub struct AdaptiveBaseline {
    anchor: CalibrationData,
    current: PostureAngles,
    good_posture_duration: f64,
    config: BaselineConfig,
}

impl AdaptiveBaseline {
    pub fn new(anchor: CalibrationData, config: BaselineConfig) -> Self {
        Self {
            current: anchor.baseline,
            anchor,
            good_posture_duration: 0.0,
            config,
        }
    }

    /// 下一帧偏差所参照的基线
    pub fn current(&self) -> &PostureAngles {
        &self.current
    }

    pub fn anchor(&self) -> &CalibrationData {
        &self.anchor
    }

    /// 漂移后的基线，附带锚点的采集时间戳和参考
    pub fn current_calibration(&self) -> CalibrationData {
        CalibrationData {
            baseline: self.current,
            ..self.anchor.clone()
        }
    }

    /// 连续良好姿态秒数
    pub fn good_posture_duration(&self) -> f64 {
        self.good_posture_duration
    }

    pub fn update(&mut self, is_good: bool, smoothed: &PostureAngles, delta_secs: f64) {
        if !is_good {
            self.good_posture_duration = 0.0;
            return;
        }

        let dt = if delta_secs.is_finite() && delta_secs > 0.0 {
            delta_secs
        } else {
            0.0
        };
        let previous = self.good_posture_duration;
        self.good_posture_duration += dt;

        // 仅预热期之后的时间驱动漂移
        let excess = self.good_posture_duration - previous.max(self.config.warmup_secs);
        if excess <= 0.0 {
            return;
        }
        let gain = (self.config.drift_rate_per_sec * excess).min(1.0);

        for kind in ChannelKind::ALL {
            let (Some(base), Some(live), Some(anchor)) = (
                self.current.channel(kind),
                smoothed.channel(kind),
                self.anchor.baseline.channel(kind),
            ) else {
                continue;
            };
            if !live.is_finite() {
                continue;
            }
            let ceiling = self.ceiling(kind);
            let next = (base + (live - base) * gain).clamp(anchor - ceiling, anchor + ceiling);
            self.current.set_channel(kind, next);
        }
    }

    /// 恢复校准锚点并清空预热计时
    pub fn reset(&mut self) {
        self.current = self.anchor.baseline;
        self.good_posture_duration = 0.0;
    }

    fn ceiling(&self, kind: ChannelKind) -> f64 {
        if kind.is_angular() {
            self.config.angle_ceiling_deg
        } else {
            self.config.ratio_ceiling
        }
    }
}
