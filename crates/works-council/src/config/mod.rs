use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::council::{BulkAddPolicy, MembershipPolicy, ReorderPolicy};

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
    pub council: CouncilConfig,
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
        let log_format = match env::var("APP_LOG_FORMAT") {
            Ok(value) => LogFormat::parse(&value).ok_or_else(|| ConfigError::InvalidSetting {
                key: "APP_LOG_FORMAT",
                value,
            })?,
            Err(_) => LogFormat::Compact,
        };

        let bulk_add = match env::var("COUNCIL_BULK_ADD_POLICY") {
            Ok(value) => parse_bulk_add_policy(&value).ok_or_else(|| {
                ConfigError::InvalidSetting {
                    key: "COUNCIL_BULK_ADD_POLICY",
                    value,
                }
            })?,
            Err(_) => BulkAddPolicy::default(),
        };
        let reorder = match env::var("COUNCIL_REORDER_UNLISTED") {
            Ok(value) => parse_reorder_policy(&value).ok_or_else(|| {
                ConfigError::InvalidSetting {
                    key: "COUNCIL_REORDER_UNLISTED",
                    value,
                }
            })?,
            Err(_) => ReorderPolicy::default(),
        };
        let employee_roster = env::var("COUNCIL_EMPLOYEE_ROSTER")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            council: CouncilConfig {
                policy: MembershipPolicy { bulk_add, reorder },
                employee_roster,
            },
        })
    }
}

fn parse_bulk_add_policy(value: &str) -> Option<BulkAddPolicy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "skip" => Some(BulkAddPolicy::SkipUnresolved),
        "strict" => Some(BulkAddPolicy::Strict),
        _ => None,
    }
}

fn parse_reorder_policy(value: &str) -> Option<ReorderPolicy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "append" => Some(ReorderPolicy::AppendUnlisted),
        "reject" => Some(ReorderPolicy::RejectUnlisted),
        _ => None,
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Membership rules and directory seeding for the works-council routes.
#[derive(Debug, Clone, Default)]
pub struct CouncilConfig {
    pub policy: MembershipPolicy,
    pub employee_roster: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidSetting { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidSetting { key, value } => {
                write!(f, "{key} has unsupported value '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidSetting { .. } => None,
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
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_LOG_FORMAT",
            "COUNCIL_BULK_ADD_POLICY",
            "COUNCIL_REORDER_UNLISTED",
            "COUNCIL_EMPLOYEE_ROSTER",
        ] {
            env::remove_var(key);
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
        assert_eq!(config.telemetry.log_format, LogFormat::Compact);
        assert_eq!(config.council.policy.bulk_add, BulkAddPolicy::SkipUnresolved);
        assert_eq!(config.council.policy.reorder, ReorderPolicy::AppendUnlisted);
        assert!(config.council.employee_roster.is_none());
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
    fn reads_membership_policies() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("COUNCIL_BULK_ADD_POLICY", "Strict");
        env::set_var("COUNCIL_REORDER_UNLISTED", "reject");
        env::set_var("COUNCIL_EMPLOYEE_ROSTER", "/srv/roster.csv");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.council.policy.bulk_add, BulkAddPolicy::Strict);
        assert_eq!(config.council.policy.reorder, ReorderPolicy::RejectUnlisted);
        assert_eq!(
            config.council.employee_roster,
            Some(PathBuf::from("/srv/roster.csv"))
        );
        reset_env();
    }

    #[test]
    fn rejects_unknown_policy_values() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("COUNCIL_BULK_ADD_POLICY", "sometimes");
        match AppConfig::load() {
            Err(ConfigError::InvalidSetting { key, value }) => {
                assert_eq!(key, "COUNCIL_BULK_ADD_POLICY");
                assert_eq!(value, "sometimes");
            }
            other => panic!("expected invalid setting, got {other:?}"),
        }
        reset_env();
    }
}
