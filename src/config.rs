//! Configuration types.
//!
//! Everything is read from the environment (a `.env` file is loaded first by
//! the binary). Lookups go through a closure so tests can supply their own
//! variables.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::gifts::GeneratorConfig;
use crate::llm::LlmConfig;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_FAVORITES_PATH: &str = "favorites.json";

/// A shop offered when the user asks where to buy a gift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shop {
    pub name: String,
    pub url: String,
}

impl Shop {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

pub fn default_shops() -> Vec<Shop> {
    vec![
        Shop::new("Ozon", "https://ozon.ru"),
        Shop::new("Wildberries", "https://wildberries.ru"),
        Shop::new("Yandex.Market", "https://market.yandex.ru"),
    ]
}

/// Telegram transport settings.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    /// Usernames or numeric ids; `*` allows everyone.
    pub allowed_users: Vec<String>,
}

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// `None` runs the bot on the CLI channel.
    pub telegram: Option<TelegramConfig>,
    pub llm: LlmConfig,
    pub generator: GeneratorConfig,
    pub favorites_path: PathBuf,
    /// Directory for daily rolling log files, if any.
    pub log_dir: Option<PathBuf>,
    pub shops: Vec<Shop>,
}

impl BotConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let telegram = get("TELEGRAM_BOT_TOKEN").map(|token| TelegramConfig {
            bot_token: SecretString::from(token),
            allowed_users: parse_allowed_users(
                &get("TELEGRAM_ALLOWED_USERS").unwrap_or_else(|| "*".to_string()),
            ),
        });

        let api_key = get("OPENAI_API_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;

        let timeout_secs = match get("GIFT_ASSIST_LLM_TIMEOUT_SECS") {
            Some(raw) => parse_timeout(&raw)?,
            None => DEFAULT_LLM_TIMEOUT_SECS,
        };

        let llm = LlmConfig {
            base_url: get("GIFT_ASSIST_LLM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            api_key: SecretString::from(api_key),
            model: get("GIFT_ASSIST_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        };

        Ok(Self {
            telegram,
            llm,
            generator: GeneratorConfig::default(),
            favorites_path: get("GIFT_ASSIST_FAVORITES_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FAVORITES_PATH)),
            log_dir: get("GIFT_ASSIST_LOG_DIR").map(PathBuf::from),
            shops: default_shops(),
        })
    }
}

fn parse_allowed_users(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_timeout(raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::InvalidValue {
            key: "GIFT_ASSIST_LLM_TIMEOUT_SECS".to_string(),
            message: format!("expected a positive number of seconds, got {raw:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<BotConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_with_only_api_key() {
        let config = load(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert!(config.telegram.is_none());
        assert_eq!(config.llm.model, DEFAULT_MODEL);
        assert_eq!(config.llm.base_url, DEFAULT_LLM_BASE_URL);
        assert_eq!(config.llm.timeout, Duration::from_secs(60));
        assert_eq!(config.llm.api_key.expose_secret(), "sk-test");
        assert_eq!(config.favorites_path, PathBuf::from("favorites.json"));
        assert!(config.log_dir.is_none());
        assert_eq!(config.shops.len(), 3);
        assert_eq!(config.generator.max_suggestions, 5);
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let err = load(&[("TELEGRAM_BOT_TOKEN", "123:abc")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "OPENAI_API_KEY"));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        assert!(matches!(
            load(&[("OPENAI_API_KEY", "  ")]),
            Err(ConfigError::MissingEnvVar(_))
        ));
    }

    #[test]
    fn telegram_enabled_by_token() {
        let config = load(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_ALLOWED_USERS", "alice, 42 ,,"),
        ])
        .unwrap();
        let telegram = config.telegram.unwrap();
        assert_eq!(telegram.bot_token.expose_secret(), "123:abc");
        assert_eq!(telegram.allowed_users, vec!["alice", "42"]);
    }

    #[test]
    fn telegram_allows_everyone_by_default() {
        let config = load(&[("OPENAI_API_KEY", "k"), ("TELEGRAM_BOT_TOKEN", "t")]).unwrap();
        assert_eq!(config.telegram.unwrap().allowed_users, vec!["*"]);
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            ("OPENAI_API_KEY", "k"),
            ("GIFT_ASSIST_MODEL", "gpt-4o-mini"),
            ("GIFT_ASSIST_LLM_BASE_URL", "http://localhost:11434/v1"),
            ("GIFT_ASSIST_LLM_TIMEOUT_SECS", "15"),
            ("GIFT_ASSIST_FAVORITES_PATH", "/var/lib/gift/favorites.json"),
            ("GIFT_ASSIST_LOG_DIR", "/var/log/gift"),
        ])
        .unwrap();
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.base_url, "http://localhost:11434/v1");
        assert_eq!(config.llm.timeout, Duration::from_secs(15));
        assert_eq!(
            config.favorites_path,
            PathBuf::from("/var/lib/gift/favorites.json")
        );
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/gift")));
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        for bad in ["soon", "0", "-5"] {
            let err = load(&[("OPENAI_API_KEY", "k"), ("GIFT_ASSIST_LLM_TIMEOUT_SECS", bad)])
                .unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "GIFT_ASSIST_LLM_TIMEOUT_SECS")
            );
        }
    }
}
