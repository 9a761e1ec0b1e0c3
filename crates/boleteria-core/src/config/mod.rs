//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod cart;
pub mod lifecycle;
pub mod locks;
pub mod logging;
pub mod reaper;
pub mod session;

use serde::{Deserialize, Serialize};

use self::cart::CartConfig;
use self::lifecycle::LifecycleConfig;
use self::locks::LocksConfig;
use self::logging::LoggingConfig;
use self::reaper::ReaperConfig;
use self::session::SessionConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Seat/table lock settings.
    #[serde(default)]
    pub locks: LocksConfig,
    /// Cart reservation settings.
    #[serde(default)]
    pub cart: CartConfig,
    /// Session identity settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Page-lifecycle coordinator settings.
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    /// Expired-lock reaper settings.
    #[serde(default)]
    pub reaper: ReaperConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database connection pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL. Empty when running against the in-memory
    /// lock table (tests, single-node demos).
    #[serde(default)]
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// Whether to run embedded migrations on startup.
    #[serde(default = "default_true")]
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_seconds: default_connect_timeout(),
            auto_migrate: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `BOLETERIA_`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("BOLETERIA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let mut parsed: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        parsed.validate()?;
        Ok(parsed)
    }

    /// Enforce hard ranges and surface the soft relationships between the
    /// lock hold, the cart deadline, and the extend sweep.
    pub fn validate(&mut self) -> Result<(), AppError> {
        if self.locks.hold_minutes == 0 {
            return Err(AppError::configuration("locks.hold_minutes must be positive"));
        }
        if self.locks.retry.max_attempts == 0 {
            return Err(AppError::configuration(
                "locks.retry.max_attempts must be at least 1",
            ));
        }

        let clamped = self.cart.clamped_minutes();
        if clamped != self.cart.expiration_minutes {
            tracing::warn!(
                configured = self.cart.expiration_minutes,
                clamped,
                "cart.expiration_minutes outside 1..=120, clamping"
            );
            self.cart.expiration_minutes = clamped;
        }

        // The cart deadline must exceed the lock hold; the extend sweep
        // needs that headroom to refresh locks before they lapse.
        let hold_secs = self.locks.hold_minutes * 60;
        let cart_secs = self.cart.expiration_minutes * 60;
        if cart_secs <= hold_secs {
            tracing::warn!(
                lock_hold_minutes = self.locks.hold_minutes,
                cart_minutes = self.cart.expiration_minutes,
                "Cart deadline does not exceed the lock hold; locks may lapse before the cart expires"
            );
        }
        if self.lifecycle.auto_extend_enabled
            && self.lifecycle.auto_extend_interval_seconds >= hold_secs
        {
            tracing::warn!(
                interval_seconds = self.lifecycle.auto_extend_interval_seconds,
                lock_hold_minutes = self.locks.hold_minutes,
                "Extend sweep interval leaves no headroom under the lock hold"
            );
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            locks: LocksConfig::default(),
            cart: CartConfig::default(),
            session: SessionConfig::default(),
            lifecycle: LifecycleConfig::default(),
            reaper: ReaperConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    2
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}
