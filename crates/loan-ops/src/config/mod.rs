use crate::workflows::loan::FundingPolicy;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

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
    pub storage: StorageConfig,
    pub funding: FundingPolicy,
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

        let loans_dir = PathBuf::from(
            env::var("LOAN_FILES_DIR").unwrap_or_else(|_| "sample_loans".to_string()),
        );
        let output_dir =
            PathBuf::from(env::var("LOAN_OUTPUT_DIR").unwrap_or_else(|_| "output".to_string()));

        let defaults = FundingPolicy::default();
        let funding = FundingPolicy {
            processing_fee: amount_var("FUNDING_PROCESSING_FEE", defaults.processing_fee)?,
            minimum_disbursement: amount_var(
                "FUNDING_MIN_DISBURSEMENT",
                defaults.minimum_disbursement,
            )?,
            maximum_disbursement: amount_var(
                "FUNDING_MAX_DISBURSEMENT",
                defaults.maximum_disbursement,
            )?,
        };
        if funding.minimum_disbursement > funding.maximum_disbursement {
            return Err(ConfigError::InvertedFundingBounds {
                minimum: funding.minimum_disbursement,
                maximum: funding.maximum_disbursement,
            });
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            storage: StorageConfig {
                loans_dir,
                output_dir,
            },
            funding,
        })
    }
}

fn amount_var(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
            _ => Err(ConfigError::InvalidAmount { name, value: raw }),
        },
        Err(_) => Ok(default),
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

/// Where loan files are read from and reports are written to.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub loans_dir: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidAmount { name: &'static str, value: String },
    InvertedFundingBounds { minimum: f64, maximum: f64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidAmount { name, value } => {
                write!(f, "{name} must be a non-negative amount (found '{value}')")
            }
            ConfigError::InvertedFundingBounds { minimum, maximum } => write!(
                f,
                "FUNDING_MIN_DISBURSEMENT ({minimum:.2}) exceeds FUNDING_MAX_DISBURSEMENT ({maximum:.2})"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidAmount { .. }
            | ConfigError::InvertedFundingBounds { .. } => None,
        }
    }
}

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
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "LOAN_FILES_DIR",
            "LOAN_OUTPUT_DIR",
            "FUNDING_PROCESSING_FEE",
            "FUNDING_MIN_DISBURSEMENT",
            "FUNDING_MAX_DISBURSEMENT",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.storage.loans_dir, PathBuf::from("sample_loans"));
        assert_eq!(config.storage.output_dir, PathBuf::from("output"));
        assert_eq!(config.funding, FundingPolicy::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_funding_policy_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("FUNDING_PROCESSING_FEE", "1250.50");
        env::set_var("FUNDING_MAX_DISBURSEMENT", "500000");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.funding.processing_fee, 1250.50);
        assert_eq!(config.funding.maximum_disbursement, 500_000.0);
        reset_env();
    }

    #[test]
    fn rejects_negative_fee_and_inverted_bounds() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("FUNDING_PROCESSING_FEE", "-5");
        match AppConfig::load() {
            Err(ConfigError::InvalidAmount { name, .. }) => {
                assert_eq!(name, "FUNDING_PROCESSING_FEE")
            }
            other => panic!("expected invalid amount, got {other:?}"),
        }

        reset_env();
        env::set_var("FUNDING_MIN_DISBURSEMENT", "9000");
        env::set_var("FUNDING_MAX_DISBURSEMENT", "100");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvertedFundingBounds { .. })
        ));
        reset_env();
    }
}
