//! 校准向导绑定
//!
//! 页面传入原始帧，角度提取和屏幕信号计算都在此完成，浏览器端无需重复实现几何计算。

use posture_engine::posture::config::CalibrationConfig;
use posture_engine::posture::geometry::extract_angles;
use posture_engine::posture::screen_angle::ScreenAngleEstimator;
use posture_engine::posture::{CalibrationProgress, CalibrationService, DetectionFrame};
use wasm_bindgen::prelude::*;

use crate::{js_error, to_js};

#[wasm_bindgen]
pub struct WasmCalibrationService {
    inner: CalibrationService,
    estimator: ScreenAngleEstimator,
}

#[wasm_bindgen]
impl WasmCalibrationService {
    /// `total_samples` 默认为 30
    #[wasm_bindgen(constructor)]
    pub fn new(total_samples: Option<u32>) -> Self {
        let config = match total_samples {
            Some(n) => CalibrationConfig {
                total_samples: n as usize,
            },
            None => CalibrationConfig::default(),
        };
        Self {
            inner: CalibrationService::new(&config),
            estimator: ScreenAngleEstimator::default(),
        }
    }

    /// 添加一帧，返回 `{progress, complete, sampleCount, totalSamples}`
    #[wasm_bindgen(js_name = "addSample")]
    pub fn add_sample(&mut self, frame: JsValue) -> Result<JsValue, JsValue> {
        let frame: DetectionFrame = serde_wasm_bindgen::from_value(frame).map_err(js_error)?;
        Ok(to_js(&self.add_frame(&frame)))
    }

    /// 返回 `{calibration, stdDev}`，无样本时抛出
    #[wasm_bindgen(js_name = "computeBaseline")]
    pub fn compute_baseline(&self) -> Result<JsValue, JsValue> {
        let result = self.inner.compute_baseline().map_err(js_error)?;
        Ok(to_js(&result))
    }

    #[wasm_bindgen(js_name = "startAngleCollection")]
    pub fn start_angle_collection(&mut self, lid_angle: Option<f64>) {
        self.inner.start_angle_collection(lid_angle);
    }

    /// 提交当前采集，返回已采集的角度数量
    #[wasm_bindgen(js_name = "completeCurrentAngle")]
    pub fn complete_current_angle(&mut self) -> Result<u32, JsValue> {
        let count = self.inner.complete_current_angle().map_err(js_error)?;
        Ok(count as u32)
    }

    #[wasm_bindgen(js_name = "computeMultiAngleBaseline")]
    pub fn compute_multi_angle_baseline(&self) -> Result<JsValue, JsValue> {
        let result = self.inner.compute_multi_angle_baseline().map_err(js_error)?;
        Ok(to_js(&result))
    }

    #[wasm_bindgen(js_name = "angleCount")]
    pub fn angle_count(&self) -> u32 {
        self.inner.angle_count() as u32
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }
}

impl WasmCalibrationService {
    fn add_frame(&mut self, frame: &DetectionFrame) -> CalibrationProgress {
        let signals = self.estimator.signals(&frame.landmarks);
        self.inner.add_sample(&extract_angles(frame), Some(&signals))
    }
}
