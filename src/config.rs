use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::constants::DEFAULT_SENSITIVITY;
use crate::logging::LogConfig;
use crate::posture::analyzer::AnalyzerOptions;
use crate::posture::rules::RuleToggles;

/// Process settings for hosts embedding the engine (the replay binary,
/// desktop shells). The engine itself never reads the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sensitivity: f64,
    pub debug_mode: bool,
    pub calibration_path: Option<PathBuf>,
    pub engine_config_path: Option<PathBuf>,
    pub rule_toggles: RuleToggles,
}

impl Config {
    pub fn from_env() -> Self {
        let sensitivity = env_or_parse("POSTURE_SENSITIVITY", DEFAULT_SENSITIVITY);
        let sensitivity = if (0.0..=1.0).contains(&sensitivity) {
            sensitivity
        } else {
            tracing::warn!(
                sensitivity,
                "POSTURE_SENSITIVITY outside [0,1], using default"
            );
            DEFAULT_SENSITIVITY
        };

        Self {
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sensitivity,
            debug_mode: env_or_bool("POSTURE_DEBUG_MODE", false),
            calibration_path: env_path("POSTURE_CALIBRATION_PATH"),
            engine_config_path: env_path("POSTURE_ENGINE_CONFIG_PATH"),
            rule_toggles: RuleToggles {
                forward_head: env_or_bool("POSTURE_RULE_FORWARD_HEAD", true),
                slouch: env_or_bool("POSTURE_RULE_SLOUCH", true),
                head_tilt: env_or_bool("POSTURE_RULE_HEAD_TILT", true),
                shoulder_asymmetry: env_or_bool("POSTURE_RULE_SHOULDER_ASYMMETRY", true),
            },
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            log_level: self.log_level.clone(),
            enable_file_logs: self.enable_file_logs,
            log_dir: self.log_dir.clone(),
        }
    }

    pub fn analyzer_options(&self) -> AnalyzerOptions {
        AnalyzerOptions {
            sensitivity: self.sensitivity,
            toggles: self.rule_toggles,
            debug_mode: self.debug_mode,
            ..AnalyzerOptions::default()
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

/// Unset or blank means "not configured"
fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use super::*;

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn managed_keys() -> &'static [&'static str] {
        &[
            "RUST_LOG",
            "ENABLE_FILE_LOGS",
            "LOG_DIR",
            "POSTURE_SENSITIVITY",
            "POSTURE_DEBUG_MODE",
            "POSTURE_CALIBRATION_PATH",
            "POSTURE_ENGINE_CONFIG_PATH",
            "POSTURE_RULE_FORWARD_HEAD",
            "POSTURE_RULE_SLOUCH",
            "POSTURE_RULE_HEAD_TILT",
            "POSTURE_RULE_SHOULDER_ASYMMETRY",
        ]
    }

    fn clear_keys(keys: &[&str]) {
        for key in keys {
            env::remove_var(key);
        }
    }

    #[test]
    fn loads_defaults_when_missing() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        let cfg = Config::from_env();
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.sensitivity, DEFAULT_SENSITIVITY);
        assert!(!cfg.debug_mode);
        assert!(cfg.calibration_path.is_none());
        assert_eq!(cfg.rule_toggles, RuleToggles::default());
    }

    #[test]
    fn parses_values() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("POSTURE_SENSITIVITY", "0.8");
        env::set_var("POSTURE_DEBUG_MODE", "yes");
        env::set_var("POSTURE_CALIBRATION_PATH", "/tmp/calibration.json");
        env::set_var("POSTURE_RULE_HEAD_TILT", "off");

        let cfg = Config::from_env();
        assert_eq!(cfg.sensitivity, 0.8);
        assert!(cfg.debug_mode);
        assert_eq!(
            cfg.calibration_path,
            Some(PathBuf::from("/tmp/calibration.json"))
        );
        assert!(!cfg.rule_toggles.head_tilt);
        assert!(cfg.rule_toggles.slouch);

        let options = cfg.analyzer_options();
        assert_eq!(options.sensitivity, 0.8);
        assert!(!options.toggles.head_tilt);
    }

    #[test]
    fn invalid_values_fall_back() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("POSTURE_SENSITIVITY", "loud");
        env::set_var("POSTURE_RULE_SLOUCH", "maybe");
        env::set_var("POSTURE_ENGINE_CONFIG_PATH", "   ");

        let cfg = Config::from_env();
        assert_eq!(cfg.sensitivity, DEFAULT_SENSITIVITY);
        assert!(cfg.rule_toggles.slouch);
        assert!(cfg.engine_config_path.is_none());

        env::set_var("POSTURE_SENSITIVITY", "1.7");
        assert_eq!(Config::from_env().sensitivity, DEFAULT_SENSITIVITY);
    }
}
