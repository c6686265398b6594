use std::env;
use std::time::Duration;

/// Document store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// How many conflicting attempts a transaction survives before failing
    pub max_transaction_attempts: u32,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub log_level: String,
    pub environment: String,
    /// Result sweep cadence in seconds; 0 disables the background poller
    pub result_poll_interval_secs: u64,
}

impl StoreConfig {
    /// Create store config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let max_transaction_attempts = env::var("STORE_MAX_TRANSACTION_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(25);

        if max_transaction_attempts == 0 {
            return Err("STORE_MAX_TRANSACTION_ATTEMPTS must be greater than 0".to_string());
        }

        Ok(Self {
            max_transaction_attempts,
        })
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_transaction_attempts: 25,
        }
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let store = StoreConfig::from_env()?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let result_poll_interval_secs = env::var("RESULT_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&environment.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        Ok(Self {
            store,
            log_level: log_level.to_lowercase(),
            environment: environment.to_lowercase(),
            result_poll_interval_secs,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Get the result sweep cadence, or None when the poller is disabled
    pub fn result_poll_interval(&self) -> Option<Duration> {
        if self.result_poll_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.result_poll_interval_secs))
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            log_level: "info".to_string(),
            environment: "development".to_string(),
            result_poll_interval_secs: 30,
        }
    }
}
