//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default upstream receipt API base URL.
pub const DEFAULT_API_BASE: &str = "https://pricecrowd.ru/api";

/// Default URL of the scan mini-application.
pub const DEFAULT_WEBAPP_URL: &str = "https://pricecrowd.ru/scan";

/// Bot configuration, read once at startup.
#[derive(Debug)]
pub struct BotConfig {
    /// Telegram bot token.
    pub bot_token: SecretString,
    /// Upstream API base, without a trailing slash.
    pub api_base: String,
    /// Mini-app opened by the scan button.
    pub webapp_url: String,
    /// Upper bound on a single forward to the upstream API.
    pub forward_timeout: Duration,
    /// getUpdates long-poll timeout.
    pub poll_timeout: Duration,
}

impl BotConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = lookup("BOT_TOKEN")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("BOT_TOKEN".into()))?;

        let api_base = lookup("API_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let webapp_url = lookup("WEBAPP_URL")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_WEBAPP_URL.to_string());

        let forward_timeout = secs_var(&lookup, "RECEIPT_API_TIMEOUT_SECS", 10)?;
        let poll_timeout = secs_var(&lookup, "TELEGRAM_POLL_TIMEOUT_SECS", 30)?;

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            api_base,
            webapp_url,
            forward_timeout,
            poll_timeout,
        })
    }
}

fn secs_var<F>(lookup: &F, key: &str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(Duration::from_secs(default));
    };
    let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("expected whole seconds, got {raw:?}"),
    })?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than zero".into(),
        });
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<BotConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "BOT_TOKEN"));
    }

    #[test]
    fn blank_token_is_an_error() {
        assert!(load(&[("BOT_TOKEN", "   ")]).is_err());
    }

    #[test]
    fn defaults_apply() {
        let cfg = load(&[("BOT_TOKEN", "123:ABC")]).unwrap();
        assert_eq!(cfg.bot_token.expose_secret(), "123:ABC");
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
        assert_eq!(cfg.webapp_url, DEFAULT_WEBAPP_URL);
        assert_eq!(cfg.forward_timeout, Duration::from_secs(10));
        assert_eq!(cfg.poll_timeout, Duration::from_secs(30));
    }

    #[test]
    fn api_base_trailing_slash_trimmed() {
        let cfg = load(&[("BOT_TOKEN", "t"), ("API_URL", "http://localhost:8080/api/")]).unwrap();
        assert_eq!(cfg.api_base, "http://localhost:8080/api");
    }

    #[test]
    fn timeouts_are_parsed() {
        let cfg = load(&[
            ("BOT_TOKEN", "t"),
            ("RECEIPT_API_TIMEOUT_SECS", "3"),
            ("TELEGRAM_POLL_TIMEOUT_SECS", "50"),
        ])
        .unwrap();
        assert_eq!(cfg.forward_timeout, Duration::from_secs(3));
        assert_eq!(cfg.poll_timeout, Duration::from_secs(50));
    }

    #[test]
    fn invalid_timeout_rejected() {
        let err = load(&[("BOT_TOKEN", "t"), ("RECEIPT_API_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "RECEIPT_API_TIMEOUT_SECS"));
        assert!(load(&[("BOT_TOKEN", "t"), ("RECEIPT_API_TIMEOUT_SECS", "0")]).is_err());
    }

    #[test]
    fn debug_output_hides_token() {
        let cfg = load(&[("BOT_TOKEN", "123:SECRET")]).unwrap();
        assert!(!format!("{cfg:?}").contains("SECRET"));
    }
}
