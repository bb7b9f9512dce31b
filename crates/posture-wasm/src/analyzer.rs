//! 逐帧分析模块
//!
//! 格式错误的帧不会抛出异常：`analyze` 返回 `null`，轮询循环继续运行。
//! 配置更新遇到非法输入则会抛出。

use std::sync::mpsc::{self, Receiver};

use posture_engine::posture::{
    AnalysisResult, AnalyzerOptions, CalibrationData, DetectionFrame, DiagnosticsEvent,
    PostureAnalyzer, RuleThresholdOverrides, RuleToggles, ScreenAngleReference,
    ScreenAngleSignals,
};
use wasm_bindgen::prelude::*;

use crate::{js_error, to_js};

#[wasm_bindgen]
pub struct WasmPostureAnalyzer {
    inner: PostureAnalyzer,
    diagnostics: Option<Receiver<DiagnosticsEvent>>,
}

#[wasm_bindgen]
impl WasmPostureAnalyzer {
    /// `options` 可为 `undefined`，缺失字段取默认值
    #[wasm_bindgen(constructor)]
    pub fn new(calibration: JsValue, options: JsValue) -> Result<WasmPostureAnalyzer, JsValue> {
        let calibration: CalibrationData =
            serde_wasm_bindgen::from_value(calibration).map_err(js_error)?;
        let options: AnalyzerOptions = if options.is_undefined() || options.is_null() {
            AnalyzerOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options).map_err(js_error)?
        };
        let debug_mode = options.debug_mode;
        let mut analyzer = Self {
            inner: PostureAnalyzer::new(calibration, options),
            diagnostics: None,
        };
        analyzer.set_debug_mode(debug_mode);
        Ok(analyzer)
    }

    /// 分析一帧，无法解码时返回 `null`
    pub fn analyze(&mut self, frame: JsValue) -> JsValue {
        match serde_wasm_bindgen::from_value::<DetectionFrame>(frame) {
            Ok(frame) => to_js(&self.analyze_frame(&frame)),
            Err(_) => JsValue::NULL,
        }
    }

    #[wasm_bindgen(js_name = "updateCalibration")]
    pub fn update_calibration(&mut self, calibration: JsValue) -> Result<(), JsValue> {
        let calibration: CalibrationData =
            serde_wasm_bindgen::from_value(calibration).map_err(js_error)?;
        self.inner.update_calibration(calibration);
        Ok(())
    }

    /// 传入 `null` 清除单参考
    #[wasm_bindgen(js_name = "updateScreenAngleReference")]
    pub fn update_screen_angle_reference(&mut self, signals: JsValue) -> Result<(), JsValue> {
        let signals: Option<ScreenAngleSignals> =
            serde_wasm_bindgen::from_value(signals).map_err(js_error)?;
        self.inner.update_screen_angle_reference(signals);
        Ok(())
    }

    #[wasm_bindgen(js_name = "updateScreenAngleReferences")]
    pub fn update_screen_angle_references(&mut self, references: JsValue) -> Result<(), JsValue> {
        let references: Vec<ScreenAngleReference> =
            serde_wasm_bindgen::from_value(references).map_err(js_error)?;
        self.inner.update_screen_angle_references(references);
        Ok(())
    }

    #[wasm_bindgen(js_name = "updateSensitivity")]
    pub fn update_sensitivity(&mut self, sensitivity: f64) {
        self.inner.update_sensitivity(sensitivity);
    }

    #[wasm_bindgen(js_name = "updateRuleToggles")]
    pub fn update_rule_toggles(&mut self, toggles: JsValue) -> Result<(), JsValue> {
        let toggles: RuleToggles = serde_wasm_bindgen::from_value(toggles).map_err(js_error)?;
        self.inner.update_rule_toggles(toggles);
        Ok(())
    }

    #[wasm_bindgen(js_name = "updateThresholdOverrides")]
    pub fn update_threshold_overrides(&mut self, overrides: JsValue) -> Result<(), JsValue> {
        let overrides: RuleThresholdOverrides =
            serde_wasm_bindgen::from_value(overrides).map_err(js_error)?;
        self.inner.update_threshold_overrides(overrides);
        Ok(())
    }

    /// 开启调试模式后每帧缓存一个诊断事件
    #[wasm_bindgen(js_name = "setDebugMode")]
    pub fn set_debug_mode(&mut self, enabled: bool) {
        self.inner.set_debug_mode(enabled);
        if enabled && self.diagnostics.is_none() {
            let (tx, rx) = mpsc::channel();
            self.inner.set_diagnostics_sink(tx);
            self.diagnostics = Some(rx);
        } else if !enabled {
            self.inner.clear_diagnostics_sink();
            self.diagnostics = None;
        }
    }

    /// 上次读取以来缓存的诊断事件，按时间先后排列
    #[wasm_bindgen(js_name = "drainDiagnostics")]
    pub fn drain_diagnostics(&mut self) -> JsValue {
        to_js(&self.drain_events())
    }

    #[wasm_bindgen(js_name = "currentBaseline")]
    pub fn current_baseline(&self) -> JsValue {
        to_js(&self.inner.current_baseline())
    }

    #[wasm_bindgen(js_name = "goodPostureDuration")]
    pub fn good_posture_duration(&self) -> f64 {
        self.inner.good_posture_duration()
    }

    /// 清空滤波器与漂移，保留校准
    pub fn reset(&mut self) {
        self.inner.reset();
    }
}

impl WasmPostureAnalyzer {
    fn analyze_frame(&mut self, frame: &DetectionFrame) -> AnalysisResult {
        self.inner.analyze(frame)
    }

    fn drain_events(&mut self) -> Vec<DiagnosticsEvent> {
        self.diagnostics
            .as_ref()
            .map(|rx| rx.try_iter().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posture_engine::posture::PostureAngles;

    fn analyzer() -> WasmPostureAnalyzer {
        WasmPostureAnalyzer {
            inner: PostureAnalyzer::new(
                CalibrationData::new(PostureAngles::default()),
                AnalyzerOptions::default(),
            ),
            diagnostics: None,
        }
    }

    #[test]
    fn diagnostics_buffer_follows_debug_mode() {
        let mut analyzer = analyzer();
        analyzer.analyze_frame(&DetectionFrame::default());
        assert!(analyzer.drain_events().is_empty());

        analyzer.set_debug_mode(true);
        analyzer.analyze_frame(&DetectionFrame::default());
        analyzer.analyze_frame(&DetectionFrame::default());
        assert_eq!(analyzer.drain_events().len(), 2);
        assert!(analyzer.drain_events().is_empty());

        analyzer.set_debug_mode(false);
        analyzer.analyze_frame(&DetectionFrame::default());
        assert!(analyzer.drain_events().is_empty());
    }
}
