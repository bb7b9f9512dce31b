//! Posture analysis engine.
//!
//! Turns per-frame body landmarks into graded posture violations while
//! adapting to a slowly changing "normal" posture and to screen-tilt bias.
//!
//! ## Modules
//! - `posture`: the per-frame pipeline and offline calibration
//! - `config`: process settings read from the environment
//! - `logging`: tracing subscriber setup
//! - `error`: calibration sequencing errors

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod posture;

pub use error::CalibrationError;
pub use posture::analyzer::PostureAnalyzer;
pub use posture::calibration::CalibrationService;
