use super::{types::Config, ConfigError};

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    if config.origin.api_token.trim().is_empty() {
        return Err(invalid("origin.api_token cannot be empty"));
    }

    if config.origin.api_url.trim().is_empty() {
        return Err(invalid("origin.api_url cannot be empty"));
    }

    let root_dir = config.library.root_dir.trim();
    if root_dir.is_empty() || root_dir.contains('/') {
        return Err(invalid(
            "library.root_dir must be a single non-empty path segment",
        ));
    }

    if config.library.content_type.trim().is_empty() {
        return Err(invalid("library.content_type cannot be empty"));
    }

    if config.sync.page_size == 0 {
        return Err(invalid("sync.page_size cannot be 0"));
    }

    if config.poller.poll_interval_secs == 0 || config.poller.fallback_interval_secs == 0 {
        return Err(invalid("poller intervals cannot be 0"));
    }

    if config.poller.timeout_secs == 0 {
        return Err(invalid("poller.timeout_secs cannot be 0"));
    }

    if config.poller.poll_url.is_some() && config.poller.element.trim().is_empty() {
        return Err(invalid("poller.element cannot be empty when poll_url is set"));
    }

    if config.gc.enabled && config.gc.interval_secs == 0 {
        return Err(invalid("gc.interval_secs cannot be 0"));
    }

    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}
