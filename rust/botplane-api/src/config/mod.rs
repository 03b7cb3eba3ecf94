//! Configuration management.
//!
//! Loaded in layers: defaults, then an optional `config/botplane.*` file,
//! then `BOTPLANE__*` environment variables, then a few specific variables
//! (`APP_TZ`) kept for compatibility with the rest of the deployment.
//! [`AppConfig::load`] validates the result; use
//! [`AppConfig::load_unchecked`] to handle validation separately.

pub mod error;

pub use error::{ConfigResult, ConfigurationError};

use std::str::FromStr;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Scheduling rules and dispatcher configuration.
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    /// Gateway configuration (rate limiting).
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load and validate configuration.
    pub fn load() -> anyhow::Result<Self> {
        let config = Self::load_unchecked()?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed:\n\n{e}"))?;
        Ok(config)
    }

    /// Load configuration without validation.
    pub fn load_unchecked() -> anyhow::Result<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/botplane").required(false))
            .add_source(
                config::Environment::with_prefix("BOTPLANE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut app_config: AppConfig = config.try_deserialize().unwrap_or_default();

        // Deployment-wide timezone variable, shared with the other services.
        if let Ok(tz) = std::env::var("APP_TZ") {
            app_config.scheduling.timezone = tz;
        }

        Ok(app_config)
    }

    /// Validate value combinations.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if Tz::from_str(&self.scheduling.timezone).is_err() {
            errors.push(ConfigurationError::invalid(
                format!("unknown timezone {:?}", self.scheduling.timezone),
                "set scheduling.timezone (or APP_TZ) to an IANA name like Europe/Amsterdam",
            ));
        }
        if self.scheduling.dispatch_window_minutes < 1 {
            errors.push(ConfigurationError::invalid(
                "dispatch window must be at least 1 minute",
                "raise scheduling.dispatch_window_minutes",
            ));
        }
        if self.scheduling.tick_interval_secs == 0 {
            errors.push(ConfigurationError::invalid(
                "dispatcher tick interval cannot be 0",
                "raise scheduling.tick_interval_secs",
            ));
        }
        if self.gateway.rate_limit_per_minute == 0 || self.gateway.rate_limit_burst == 0 {
            errors.push(ConfigurationError::invalid(
                "rate limits cannot be 0",
                "raise gateway.rate_limit_per_minute and gateway.rate_limit_burst",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ConfigurationError::Multiple(errors))
        }
    }

    /// The validated reference timezone.
    pub fn timezone(&self) -> ConfigResult<Tz> {
        Tz::from_str(&self.scheduling.timezone).map_err(|_| {
            ConfigurationError::invalid(
                format!("unknown timezone {:?}", self.scheduling.timezone),
                "set scheduling.timezone (or APP_TZ) to an IANA name like Europe/Amsterdam",
            )
        })
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// API port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Scheduling rules and dispatcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// Reference timezone (IANA name). Calendar dates, schedule-time wire
    /// strings, and cron expressions all evaluate in this zone.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Dispatch window: a due schedule fires if its start is at most this
    /// many minutes in the past.
    #[serde(default = "default_dispatch_window")]
    pub dispatch_window_minutes: i64,
    /// Dispatcher tick interval in seconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    /// Seed the registry with demo bots and phases at startup.
    #[serde(default = "default_true")]
    pub seed_demo_data: bool,
}

fn default_timezone() -> String {
    "Europe/Amsterdam".to_string()
}

fn default_dispatch_window() -> i64 {
    schedule_core::policy::DEFAULT_DISPATCH_WINDOW_MINUTES
}

fn default_tick_interval() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            dispatch_window_minutes: default_dispatch_window(),
            tick_interval_secs: default_tick_interval(),
            seed_demo_data: true,
        }
    }
}

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Rate limit: requests per minute per key.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,
    /// Rate limit burst size.
    #[serde(default = "default_rate_burst")]
    pub rate_limit_burst: u32,
}

fn default_rate_limit() -> u32 {
    120
}

fn default_rate_burst() -> u32 {
    30
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_minute: default_rate_limit(),
            rate_limit_burst: default_rate_burst(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON-formatted logs.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timezone().unwrap(), chrono_tz::Europe::Amsterdam);
    }

    #[test]
    fn bad_timezone_is_rejected_with_a_hint() {
        let mut config = AppConfig::default();
        config.scheduling.timezone = "Mars/Olympus_Mons".to_string();
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("APP_TZ"));
    }

    #[test]
    fn several_problems_are_reported_together() {
        let mut config = AppConfig::default();
        config.scheduling.timezone = "nope".to_string();
        config.scheduling.tick_interval_secs = 0;
        let error = config.validate().unwrap_err();
        assert!(matches!(error, ConfigurationError::Multiple(ref e) if e.len() == 2));
    }
}
