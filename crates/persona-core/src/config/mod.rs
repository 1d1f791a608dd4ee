use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::inventory::{AssessmentConfig, AssessmentMode};

/// Distinguishes runtime behavior for different stages of the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub catalog: CatalogConfig,
    pub storage: StorageConfig,
    pub session: SessionDefaults,
    pub assessment: AssessmentConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("PERSONA_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let log_level = env::var("PERSONA_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let catalog_path = env::var("PERSONA_CATALOG_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let snapshot_dir = env::var("PERSONA_SNAPSHOT_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".persona/sessions"));

        let mode_raw = env::var("PERSONA_MODE").unwrap_or_else(|_| "demo".to_string());
        let mode = AssessmentMode::parse(&mode_raw).ok_or(ConfigError::InvalidMode {
            value: mode_raw.clone(),
        })?;

        let seed = match env::var("PERSONA_SEED") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidSeed)?,
            ),
            _ => None,
        };

        let mut assessment = AssessmentConfig::default();
        if let Ok(raw) = env::var("PERSONA_CONFIDENCE_THRESHOLD") {
            let threshold = raw
                .trim()
                .parse::<f64>()
                .map_err(|_| ConfigError::InvalidConfidenceThreshold)?;
            if !(threshold > 0.0 && threshold <= 1.0) {
                return Err(ConfigError::InvalidConfidenceThreshold);
            }
            assessment.confidence_threshold = threshold;
        }
        assessment
            .validate()
            .map_err(|reason| ConfigError::InvalidAssessment { reason })?;

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level },
            catalog: CatalogConfig { path: catalog_path },
            storage: StorageConfig { snapshot_dir },
            session: SessionDefaults { mode, seed },
            assessment,
        })
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where the item catalog comes from; `None` selects the built-in catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogConfig {
    pub path: Option<PathBuf>,
}

/// Location of persisted session snapshots.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub snapshot_dir: PathBuf,
}

/// Defaults applied when a session is started without explicit overrides.
#[derive(Debug, Clone, Copy)]
pub struct SessionDefaults {
    pub mode: AssessmentMode,
    pub seed: Option<u64>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidMode { value: String },
    InvalidSeed,
    InvalidConfidenceThreshold,
    InvalidAssessment { reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidMode { value } => write!(
                f,
                "PERSONA_MODE '{}' must be one of demo, basic, comprehensive",
                value
            ),
            ConfigError::InvalidSeed => write!(f, "PERSONA_SEED must be a valid u64"),
            ConfigError::InvalidConfidenceThreshold => {
                write!(f, "PERSONA_CONFIDENCE_THRESHOLD must be a number in (0, 1]")
            }
            ConfigError::InvalidAssessment { reason } => {
                write!(f, "invalid assessment configuration: {}", reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("PERSONA_ENV");
        env::remove_var("PERSONA_LOG_LEVEL");
        env::remove_var("PERSONA_CATALOG_PATH");
        env::remove_var("PERSONA_SNAPSHOT_DIR");
        env::remove_var("PERSONA_MODE");
        env::remove_var("PERSONA_SEED");
        env::remove_var("PERSONA_CONFIDENCE_THRESHOLD");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.catalog.path.is_none());
        assert_eq!(
            config.storage.snapshot_dir,
            PathBuf::from(".persona/sessions")
        );
        assert_eq!(config.session.mode, AssessmentMode::Demo);
        assert_eq!(config.session.seed, None);
        assert!((config.assessment.confidence_threshold - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn parses_mode_seed_and_threshold_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PERSONA_MODE", "Basic");
        env::set_var("PERSONA_SEED", "42");
        env::set_var("PERSONA_CONFIDENCE_THRESHOLD", "0.65");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.session.mode, AssessmentMode::Basic);
        assert_eq!(config.session.seed, Some(42));
        assert!((config.assessment.confidence_threshold - 0.65).abs() < f64::EPSILON);
        reset_env();
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PERSONA_CONFIDENCE_THRESHOLD", "1.5");
        match AppConfig::load() {
            Err(ConfigError::InvalidConfidenceThreshold) => {}
            other => panic!("expected threshold error, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn rejects_unknown_mode() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PERSONA_MODE", "marathon");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidMode { .. })
        ));
        reset_env();
    }
}
