//! Error types for the receipt bot.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },
}

/// Upstream forwarding errors.
///
/// Never surfaced to users: the relay logs these and substitutes the
/// `{"status":"error"}` sentinel.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("Upstream request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Upstream request failed: {0}")]
    Transport(String),

    #[error("Upstream returned HTTP {status}")]
    Status { status: u16 },

    #[error("Upstream response is not valid JSON: {0}")]
    InvalidBody(String),
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_into_top_level_error() {
        let err: Error = ConfigError::MissingEnvVar("BOT_TOKEN".into()).into();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required environment variable: BOT_TOKEN"
        );
    }
}
