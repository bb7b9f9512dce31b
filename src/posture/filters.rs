//! 逐通道平滑模块
//!
//! 每个通道执行 `Jitter(EMA(x))`：EMA 去除传感器噪声，死区在平滑值真正变化前
//! 保持输出稳定。各通道状态互不共享。

use std::marker::PhantomData;

use crate::posture::config::FilterConfig;
use crate::posture::types::{ChannelKind, ChannelValues, PostureAngles};

/// 指数移动平均，以首个样本作为初值
#[derive(Debug, Clone)]
pub struct EmaFilter {
    alpha: f64,
    state: Option<f64>,
}

impl EmaFilter {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            state: None,
        }
    }

    pub fn update(&mut self, value: f64) -> f64 {
        let next = match self.state {
            None => value,
            Some(prev) => self.alpha * value + (1.0 - self.alpha) * prev,
        };
        self.state = Some(next);
        next
    }

    pub fn value(&self) -> Option<f64> {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}

/// 死区滤波器：输入变化超过 `deadzone` 前保持输出不变
#[derive(Debug, Clone)]
pub struct JitterFilter {
    deadzone: f64,
    last: Option<f64>,
}

impl JitterFilter {
    pub fn new(deadzone: f64) -> Self {
        Self {
            deadzone: deadzone.max(0.0),
            last: None,
        }
    }

    pub fn update(&mut self, value: f64) -> f64 {
        match self.last {
            Some(prev) if (value - prev).abs() <= self.deadzone => prev,
            _ => {
                self.last = Some(value);
                value
            }
        }
    }

    pub fn value(&self) -> Option<f64> {
        self.last
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// 平滑通道的单位
pub trait ChannelUnit {
    const NAME: &'static str;
}

#[derive(Debug, Clone, Copy)]
pub struct Degrees;

#[derive(Debug, Clone, Copy)]
pub struct Ratio;

impl ChannelUnit for Degrees {
    const NAME: &'static str = "deg";
}

impl ChannelUnit for Ratio {
    const NAME: &'static str = "ratio";
}

/// 单个平滑测量通道
#[derive(Debug, Clone)]
pub struct Channel<U> {
    ema: EmaFilter,
    jitter: JitterFilter,
    _unit: PhantomData<U>,
}

impl<U: ChannelUnit> Channel<U> {
    pub fn new(alpha: f64, deadzone: f64) -> Self {
        Self {
            ema: EmaFilter::new(alpha),
            jitter: JitterFilter::new(deadzone),
            _unit: PhantomData,
        }
    }

    /// 平滑一个样本。非有限值沿用上次输出（无输出时为 0）
    pub fn push(&mut self, value: f64) -> f64 {
        if !value.is_finite() {
            return self.jitter.value().unwrap_or(0.0);
        }
        let smoothed = self.ema.update(value);
        self.jitter.update(smoothed)
    }

    pub fn value(&self) -> Option<f64> {
        self.jitter.value()
    }

    pub fn unit(&self) -> &'static str {
        U::NAME
    }

    pub fn reset(&mut self) {
        self.ema.reset();
        self.jitter.reset();
    }
}

const DEGREE_CHANNELS: [ChannelKind; 4] = [
    ChannelKind::HeadForward,
    ChannelKind::Torso,
    ChannelKind::HeadTilt,
    ChannelKind::ShoulderDiff,
];

const RATIO_CHANNELS: [ChannelKind; 3] = [
    ChannelKind::FaceFrameRatio,
    ChannelKind::FaceY,
    ChannelKind::NoseToEarAvg,
];

fn ratio_deadzone(config: &FilterConfig, kind: ChannelKind) -> f64 {
    match kind {
        ChannelKind::FaceY => config.face_y_deadzone,
        ChannelKind::NoseToEarAvg => config.nose_to_ear_deadzone,
        _ => config.face_frame_ratio_deadzone,
    }
}

fn smooth_into<U: ChannelUnit>(
    kind: ChannelKind,
    channel: &mut Channel<U>,
    raw: &PostureAngles,
    out: &mut PostureAngles,
) {
    if let Some(value) = raw.channel(kind) {
        out.set_channel(kind, channel.push(value));
    }
}

/// 所有姿态通道的独立平滑
#[derive(Debug, Clone)]
pub struct FilterSet {
    degrees: [(ChannelKind, Channel<Degrees>); 4],
    ratios: [(ChannelKind, Channel<Ratio>); 3],
}

impl FilterSet {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            degrees: DEGREE_CHANNELS
                .map(|kind| (kind, Channel::new(config.angle_alpha, config.angle_deadzone))),
            ratios: RATIO_CHANNELS.map(|kind| {
                (
                    kind,
                    Channel::new(config.ratio_alpha, ratio_deadzone(config, kind)),
                )
            }),
        }
    }

    /// 平滑 `raw` 中存在的每个通道，缺失的可选通道保持缺失
    pub fn apply(&mut self, raw: &PostureAngles) -> PostureAngles {
        let mut out = PostureAngles::default();
        for (kind, channel) in &mut self.degrees {
            smooth_into(*kind, channel, raw, &mut out);
        }
        for (kind, channel) in &mut self.ratios {
            smooth_into(*kind, channel, raw, &mut out);
        }
        out
    }

    pub fn reset(&mut self) {
        self.degrees.iter_mut().for_each(|(_, ch)| ch.reset());
        self.ratios.iter_mut().for_each(|(_, ch)| ch.reset());
    }
}

impl Default for FilterSet {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}
