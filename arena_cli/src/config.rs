//! Operator tool configuration.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use arena::{
    ScoringRules,
    db::{DatabaseConfig, TimeoutConfig},
};
use std::time::Duration;

/// Complete configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ArenaConfig {
    /// Database configuration
    pub database: DatabaseConfig,
    /// Persistence and directory deadlines
    pub timeouts: TimeoutConfig,
    /// Points per game outcome for the standard prizes
    pub scoring: ScoringRules,
}

impl ArenaConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Returns
    ///
    /// * `Result<ArenaConfig, ConfigError>` - Loaded configuration or error
    ///
    /// # Errors
    ///
    /// Returns error if `DATABASE_URL` is missing and no override was given
    pub fn from_env(database_url_override: Option<String>) -> Result<Self, ConfigError> {
        let mut database = DatabaseConfig::from_env();
        database.database_url = database_url_override
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .ok_or_else(|| ConfigError::MissingRequired {
                var: "DATABASE_URL".to_string(),
                hint: "e.g. postgres://postgres@localhost/arena, or pass --db-url".to_string(),
            })?;

        let defaults = TimeoutConfig::default();
        let timeouts = TimeoutConfig {
            query: parse_millis_or("ARENA_QUERY_TIMEOUT_MS", defaults.query),
            transaction: parse_millis_or("ARENA_TRANSACTION_TIMEOUT_MS", defaults.transaction),
            directory: parse_millis_or("ARENA_DIRECTORY_TIMEOUT_MS", defaults.directory),
        };

        let rules = ScoringRules::default();
        let scoring = ScoringRules {
            win: parse_env_or("ARENA_WIN_POINTS", rules.win),
            draw: parse_env_or("ARENA_DRAW_POINTS", rules.draw),
            loss: parse_env_or("ARENA_LOSS_POINTS", rules.loss),
        };

        Ok(ArenaConfig {
            database,
            timeouts,
            scoring,
        })
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.database_url.is_empty() {
            return Err(ConfigError::Invalid {
                var: "DATABASE_URL".to_string(),
                reason: "Must not be empty".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed max connections ({})",
                    self.database.max_connections
                ),
            });
        }

        for (var, value) in [
            ("ARENA_QUERY_TIMEOUT_MS", self.timeouts.query),
            ("ARENA_TRANSACTION_TIMEOUT_MS", self.timeouts.transaction),
            ("ARENA_DIRECTORY_TIMEOUT_MS", self.timeouts.directory),
        ] {
            if value.is_zero() {
                return Err(ConfigError::Invalid {
                    var: var.to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }
        }

        if self.timeouts.transaction < self.timeouts.query {
            return Err(ConfigError::Invalid {
                var: "ARENA_TRANSACTION_TIMEOUT_MS".to_string(),
                reason: format!(
                    "Must be at least the query timeout ({} ms)",
                    self.timeouts.query.as_millis()
                ),
            });
        }

        // A win must be worth more than a draw, a draw at least a loss
        if self.scoring.win <= self.scoring.draw {
            return Err(ConfigError::Invalid {
                var: "ARENA_WIN_POINTS".to_string(),
                reason: format!("Must be greater than draw points ({})", self.scoring.draw),
            });
        }

        if self.scoring.draw < self.scoring.loss {
            return Err(ConfigError::Invalid {
                var: "ARENA_DRAW_POINTS".to_string(),
                reason: format!("Cannot be less than loss points ({})", self.scoring.loss),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_millis_or(key: &str, default: Duration) -> Duration {
    Duration::from_millis(parse_env_or(key, default.as_millis() as u64))
}
