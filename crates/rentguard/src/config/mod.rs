use std::env;
use std::fmt;
use std::time::Duration;

use reqwest::Url;

type UrlParseError = <Url as std::str::FromStr>::Err;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_PROGRESS_TICK_MS: u64 = 500;
const DEFAULT_REPORT_STEP_MS: u64 = 1200;
const DEFAULT_REPORT_SETTLE_MS: u64 = 800;

/// Distinguishes runtime behavior for different stages of the client.
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

/// Top-level configuration for the screening client.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub remote: RemoteConfig,
    pub pacing: PacingConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let raw_base_url =
            env::var("APP_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        let remote = RemoteConfig::from_base_url(&raw_base_url)?;

        let pacing = PacingConfig {
            progress_tick: duration_var("APP_PROGRESS_TICK_MS", DEFAULT_PROGRESS_TICK_MS)?,
            report_step_interval: duration_var("APP_REPORT_STEP_MS", DEFAULT_REPORT_STEP_MS)?,
            report_settle: duration_var("APP_REPORT_SETTLE_MS", DEFAULT_REPORT_SETTLE_MS)?,
        };

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            remote,
            pacing,
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn duration_var(name: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::InvalidDuration { variable: name }),
        Err(_) => Ok(Duration::from_millis(default_ms)),
    }
}

/// Location of the remote analysis service.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub base_url: Url,
}

impl RemoteConfig {
    pub fn from_base_url(raw: &str) -> Result<Self, ConfigError> {
        let base_url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidBaseUrl {
            value: raw.to_string(),
            source,
        })?;

        if base_url.cannot_be_a_base() {
            return Err(ConfigError::UnsupportedBaseUrl {
                value: raw.to_string(),
            });
        }

        Ok(Self { base_url })
    }
}

/// Timing of the simulated feedback shown while real work is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    pub progress_tick: Duration,
    pub report_step_interval: Duration,
    pub report_settle: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            progress_tick: Duration::from_millis(DEFAULT_PROGRESS_TICK_MS),
            report_step_interval: Duration::from_millis(DEFAULT_REPORT_STEP_MS),
            report_settle: Duration::from_millis(DEFAULT_REPORT_SETTLE_MS),
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidBaseUrl {
        value: String,
        source: UrlParseError,
    },
    UnsupportedBaseUrl {
        value: String,
    },
    InvalidDuration {
        variable: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidBaseUrl { value, .. } => {
                write!(f, "APP_API_BASE_URL '{}' is not a valid URL", value)
            }
            ConfigError::UnsupportedBaseUrl { value } => {
                write!(f, "APP_API_BASE_URL '{}' cannot be used as a base URL", value)
            }
            ConfigError::InvalidDuration { variable } => {
                write!(f, "{} must be a whole number of milliseconds", variable)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidBaseUrl { source, .. } => Some(source),
            ConfigError::UnsupportedBaseUrl { .. } | ConfigError::InvalidDuration { .. } => None,
        }
    }
}
