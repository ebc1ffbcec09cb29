use crate::config::types::{Config, ScraperConfig, StorageConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraper_config(&config.scraper)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates scraper configuration
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 20 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests must be between 1 and 20, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.retry_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "retry_attempts must be between 0 and 10, got {}",
            config.retry_attempts
        )));
    }

    if config.timeout < 1000 {
        return Err(ConfigError::Validation(format!(
            "timeout must be >= 1000ms, got {}ms",
            config.timeout
        )));
    }

    if let Some(user_agent) = &config.user_agent {
        if user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user_agent cannot be blank when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
