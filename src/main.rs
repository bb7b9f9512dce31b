//! Replay a recorded landmark stream through the analyzer.
//!
//! Reads newline-delimited JSON `DetectionFrame`s from stdin and writes one
//! `AnalysisResult` JSON line per frame to stdout. Without a calibration file
//! the first `calibration.totalSamples` frames calibrate the session.

use std::fs;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::Path;
use std::process::ExitCode;

use posture_engine::config::Config;
use posture_engine::logging::{init_tracing, LoggingError};
use posture_engine::posture::diagnostics::DiagnosticsEvent;
use posture_engine::posture::geometry::extract_angles;
use posture_engine::posture::screen_angle::ScreenAngleEstimator;
use posture_engine::posture::{
    CalibrationData, CalibrationService, DetectionFrame, EngineConfig, PostureAnalyzer,
};
use posture_engine::CalibrationError;

#[derive(Debug, thiserror::Error)]
enum ReplayError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),
    #[error("calibration failed: {0}")]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Logging(#[from] LoggingError),
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    if let Err(e) = init_tracing(&config.log_config()) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match run(&config) {
        Ok(frames) => {
            tracing::info!(frames, "Replay complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Replay failed");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<usize, ReplayError> {
    let engine_config = match &config.engine_config_path {
        Some(path) => read_json::<EngineConfig>(path)?,
        None => EngineConfig::default(),
    };
    engine_config
        .validate()
        .map_err(ReplayError::InvalidConfig)?;

    let stdin = io::stdin();
    let mut frames = stdin
        .lock()
        .lines()
        .enumerate()
        .filter_map(|(line_no, line)| parse_frame(line_no + 1, line).transpose());

    let calibration = match &config.calibration_path {
        Some(path) => read_json::<CalibrationData>(path)?,
        None => calibrate_from_stream(&mut frames, &engine_config)?,
    };
    tracing::info!(
        head_forward = calibration.baseline.head_forward,
        torso = calibration.baseline.torso,
        references = calibration.screen_angle_references.len(),
        "Calibration loaded"
    );

    let mut analyzer =
        PostureAnalyzer::with_config(calibration, config.analyzer_options(), engine_config);
    if config.debug_mode {
        analyzer.set_diagnostics_sink(|event: &DiagnosticsEvent| {
            match serde_json::to_string(event) {
                Ok(json) => tracing::debug!(event = %json, "Frame diagnostics"),
                Err(e) => tracing::warn!(error = %e, "Failed to encode diagnostics"),
            }
        });
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut count = 0usize;
    for frame in frames {
        let frame = frame?;
        let result = analyzer.analyze(&frame);
        serde_json::to_writer(&mut out, &result).map_err(io::Error::from)?;
        out.write_all(b"\n")?;
        count += 1;
    }
    out.flush()?;
    Ok(count)
}

/// Malformed lines are skipped; blank lines are ignored
fn parse_frame(
    line_no: usize,
    line: io::Result<String>,
) -> Result<Option<DetectionFrame>, ReplayError> {
    let line = line?;
    if line.trim().is_empty() {
        return Ok(None);
    }
    match serde_json::from_str::<DetectionFrame>(&line) {
        Ok(frame) => Ok(Some(frame)),
        Err(e) => {
            tracing::warn!(line = line_no, error = %e, "Skipping malformed frame");
            Ok(None)
        }
    }
}

fn calibrate_from_stream<I>(
    frames: &mut I,
    engine_config: &EngineConfig,
) -> Result<CalibrationData, ReplayError>
where
    I: Iterator<Item = Result<DetectionFrame, ReplayError>>,
{
    let mut service = CalibrationService::new(&engine_config.calibration);
    let estimator = ScreenAngleEstimator::new(engine_config.screen_angle.clone());

    for frame in frames.by_ref() {
        let frame = frame?;
        let signals = estimator.signals(&frame.landmarks);
        let progress = service.add_sample(&extract_angles(&frame), Some(&signals));
        if progress.complete {
            break;
        }
    }

    let result = service.compute_baseline()?;
    if !result.is_stable(engine_config.baseline.angle_ceiling_deg / 2.0) {
        tracing::warn!(
            head_forward_std = result.std_dev.head_forward,
            torso_std = result.std_dev.torso,
            "Calibration samples were unsteady"
        );
    }
    Ok(result.calibration)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ReplayError> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|source| ReplayError::Json {
        path: path.display().to_string(),
        source,
    })
}
