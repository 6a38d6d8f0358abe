use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::LazyLock;
use url::Url;

use crate::error::RdoError;

/// Process-wide configuration: defaults < `config.toml` < `RDO_*` environment.
/// A broken source is an error for the binary to report, never a silent default.
pub static CONFIG: LazyLock<Result<Config, figment::Error>> = LazyLock::new(Config::load);

/// Service keys that must never guard a running server.
const PLACEHOLDER_SERVICE_KEYS: &[&str] = &["", "change-me"];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub basic: BasicConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub plans: PlanConfig,
    #[serde(default)]
    pub support: SupportConfig,
}

impl Config {
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("RDO_").split("__"))
            .extract()
    }

    /// Startup checks the defaults cannot satisfy on their own.
    pub fn validate(&self) -> Result<(), RdoError> {
        if PLACEHOLDER_SERVICE_KEYS.contains(&self.basic.service_key.trim()) {
            return Err(RdoError::Config(
                "basic.service_key must be set (RDO_BASIC__SERVICE_KEY)".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub loglevel: String,
    /// Shared secret for trusted callers (database webhooks, token issuance).
    pub service_key: String,
    /// Max accepted request body, uploads included.
    pub body_limit_bytes: usize,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            database_url: "sqlite:meu_rdo.sqlite".to_string(),
            loglevel: "info".to_string(),
            service_key: String::new(),
            body_limit_bytes: 20 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory holding one sub-directory per bucket.
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("storage"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    pub api_base: Url,
    pub secret_key: String,
    pub webhook_secret: String,
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
    pub portal_return_url: String,
    /// Accepted clock skew for webhook signatures.
    pub webhook_tolerance_secs: i64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            api_base: Url::parse("https://api.stripe.com/").expect("static url"),
            secret_key: String::new(),
            webhook_secret: String::new(),
            price_id: String::new(),
            success_url: "http://localhost:5173/assinatura?status=sucesso".to_string(),
            cancel_url: "http://localhost:5173/assinatura?status=cancelado".to_string(),
            portal_return_url: "http://localhost:5173/assinatura".to_string(),
            webhook_tolerance_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    pub free_max_obras: i64,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self { free_max_obras: 1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportConfig {
    pub notify_email: String,
    /// Notifications allowed per user per minute.
    pub notify_per_minute: u32,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            notify_email: "suporte@meurdo.com.br".to_string(),
            notify_per_minute: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let cfg = Config::default();
        assert_eq!(cfg.plans.free_max_obras, 1);
        assert_eq!(cfg.billing.webhook_tolerance_secs, 300);
        assert!(cfg.basic.database_url.starts_with("sqlite:"));
    }

    #[test]
    fn placeholder_service_keys_fail_validation() {
        let mut cfg = Config::default();
        assert!(cfg.basic.service_key.is_empty());
        assert!(matches!(cfg.validate(), Err(RdoError::Config(_))));
        cfg.basic.service_key = "change-me".to_string();
        assert!(cfg.validate().is_err());
        cfg.basic.service_key = "a-real-secret".to_string();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[plans]\nfree_max_obras = \"many\"\n")?;
            assert!(Config::load().is_err());
            Ok(())
        });
    }

    #[test]
    fn env_overrides_nested_keys() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("RDO_PLANS__FREE_MAX_OBRAS", "3");
            jail.set_env("RDO_BASIC__SERVICE_KEY", "secret");
            let cfg = Config::load()?;
            assert_eq!(cfg.plans.free_max_obras, 3);
            assert_eq!(cfg.basic.service_key, "secret");
            Ok(())
        });
    }
}
