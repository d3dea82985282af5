use chrono::Datelike;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::matching::{AutoMatchConfig, RankingPolicy};

/// Distinguishes runtime behavior for different stages of the service.
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
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub automatch: AutoMatchSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            automatch: AutoMatchSettings::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Scoring and ranking knobs for AutoMatch runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoMatchSettings {
    /// Year used to pick the underserved-states edition.
    pub reference_year: i32,
    pub top_n: usize,
    pub minimum_score: u8,
    /// Optional CDE roster loaded into the repository at startup.
    pub roster_path: Option<PathBuf>,
}

impl AutoMatchSettings {
    const MIN_YEAR: i32 = 2000;
    const MAX_YEAR: i32 = 2100;

    fn from_env() -> Result<Self, ConfigError> {
        let reference_year = match env::var("AUTOMATCH_REFERENCE_YEAR") {
            Ok(raw) => raw
                .trim()
                .parse::<i32>()
                .ok()
                .filter(|year| (Self::MIN_YEAR..=Self::MAX_YEAR).contains(year))
                .ok_or(ConfigError::InvalidReferenceYear { value: raw })?,
            Err(_) => chrono::Utc::now().year(),
        };

        let top_n = match env::var("AUTOMATCH_TOP_N") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|top_n| *top_n > 0)
                .ok_or(ConfigError::InvalidTopN { value: raw })?,
            Err(_) => RankingPolicy::default().top_n,
        };

        let minimum_score = match env::var("AUTOMATCH_MIN_SCORE") {
            Ok(raw) => raw
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|score| *score <= 100)
                .ok_or(ConfigError::InvalidMinimumScore { value: raw })?,
            Err(_) => RankingPolicy::default().minimum_score,
        };

        let roster_path = env::var("AUTOMATCH_ROSTER_CSV")
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            reference_year,
            top_n,
            minimum_score,
            roster_path,
        })
    }

    pub fn service_config(&self) -> AutoMatchConfig {
        AutoMatchConfig {
            reference_year: self.reference_year,
            ranking: RankingPolicy {
                top_n: self.top_n,
                minimum_score: self.minimum_score,
            },
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidReferenceYear { value: String },
    InvalidTopN { value: String },
    InvalidMinimumScore { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidReferenceYear { value } => write!(
                f,
                "AUTOMATCH_REFERENCE_YEAR must be a year between 2000 and 2100, got '{value}'"
            ),
            ConfigError::InvalidTopN { value } => {
                write!(f, "AUTOMATCH_TOP_N must be a positive integer, got '{value}'")
            }
            ConfigError::InvalidMinimumScore { value } => write!(
                f,
                "AUTOMATCH_MIN_SCORE must be an integer from 0 to 100, got '{value}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidReferenceYear { .. }
            | ConfigError::InvalidTopN { .. }
            | ConfigError::InvalidMinimumScore { .. } => None,
        }
    }
}
