//! 姿态引擎浏览器绑定
//!
//! 页面负责摄像头、关键点检测和轮询定时器，每帧以普通 JS 对象传入
//! `DetectionFrame`，返回 `AnalysisResult` 对象。两侧字段名均为 camelCase。
//!
//! ## 模块
//! - `analyzer`: 逐帧分析，调试模式下缓存诊断事件
//! - `calibration`: 单角度与多角度校准向导

pub mod analyzer;
pub mod calibration;

pub use analyzer::WasmPostureAnalyzer;
pub use calibration::WasmCalibrationService;

use serde::Serialize;
use wasm_bindgen::JsValue;

pub(crate) fn to_js<T: Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}

pub(crate) fn js_error(message: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&message.to_string())
}
