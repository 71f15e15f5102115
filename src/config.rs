use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const DEFAULT_API_URL: &str = "https://api.tradebridge.app/api";
const DEFAULT_LOGIN_URL: &str = "https://app.tradebridge.app/extension/login";
const DEFAULT_PANEL_URL: &str = "https://app.tradebridge.app/panel";
const DEFAULT_LISTEN_PORT: u16 = 8743;

/// Mediator configuration loaded from ~/.config/tradebridge/config.toml
/// plus env var overrides. No secrets live here; the token has its own store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
    /// Base URL of the backend API (strategies, chat, journal ingestion).
    #[serde(default = "default_api_url")]
    pub api_base_url: String,

    /// Token-verification endpoint. Defaults to `<api>/auth/verify`.
    #[serde(default)]
    pub verify_url: Option<String>,

    /// Login page of the web application, opened for the external sign-in flow.
    #[serde(default = "default_login_url")]
    pub login_url: String,

    /// Dashboard panel opened by the open-side-panel request.
    #[serde(default = "default_panel_url")]
    pub panel_url: String,

    /// Port the surface server listens on (loopback only).
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_login_url() -> String {
    DEFAULT_LOGIN_URL.to_string()
}

fn default_panel_url() -> String {
    DEFAULT_PANEL_URL.to_string()
}

fn default_listen_port() -> u16 {
    DEFAULT_LISTEN_PORT
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_url(),
            verify_url: None,
            login_url: default_login_url(),
            panel_url: default_panel_url(),
            listen_port: default_listen_port(),
        }
    }
}

impl BridgeConfig {
    /// Load config from file + env var overrides.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
            toml::from_str::<BridgeConfig>(&content)
                .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?
        } else {
            BridgeConfig::default()
        };

        if let Ok(val) = std::env::var("TRADEBRIDGE_API_URL") {
            config.api_base_url = val;
        }
        if let Ok(val) = std::env::var("TRADEBRIDGE_VERIFY_URL") {
            config.verify_url = Some(val);
        }
        if let Ok(val) = std::env::var("TRADEBRIDGE_LOGIN_URL") {
            config.login_url = val;
        }
        if let Ok(val) = std::env::var("TRADEBRIDGE_PANEL_URL") {
            config.panel_url = val;
        }
        if let Ok(val) = std::env::var("TRADEBRIDGE_LISTEN_PORT") {
            if let Ok(port) = val.parse() {
                config.listen_port = port;
            }
        }

        Ok(config)
    }

    /// Persist the config to disk.
    pub fn save_to_disk(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config dir: {}", dir.display()))?;
        }
        let content = toml::to_string_pretty(self).with_context(|| "Failed to serialize config")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Get the config directory path: ~/.config/tradebridge/
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tradebridge")
    }

    /// Get the config file path: ~/.config/tradebridge/config.toml
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Resolved verification endpoint.
    pub fn verify_url(&self) -> String {
        self.verify_url
            .clone()
            .unwrap_or_else(|| format!("{}/auth/verify", self.api_base_url.trim_end_matches('/')))
    }

    pub fn display(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("Config file: {}", Self::config_path().display()));
        lines.push(format!("api_base_url: {}", self.api_base_url));
        lines.push(format!("verify_url: {}", self.verify_url()));
        lines.push(format!("login_url: {}", self.login_url));
        lines.push(format!("panel_url: {}", self.panel_url));
        lines.push(format!("listen_port: {}", self.listen_port));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_populated() {
        let config = BridgeConfig::default();
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.login_url, DEFAULT_LOGIN_URL);
        assert_eq!(config.listen_port, DEFAULT_LISTEN_PORT);
    }

    #[test]
    fn verify_url_derives_from_api_base() {
        let config = BridgeConfig {
            api_base_url: "https://api.example.com/v2/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.verify_url(), "https://api.example.com/v2/auth/verify");
    }

    #[test]
    fn explicit_verify_url_takes_precedence() {
        let config = BridgeConfig {
            verify_url: Some("https://verify.example.com/check".to_string()),
            ..Default::default()
        };
        assert_eq!(config.verify_url(), "https://verify.example.com/check");
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: BridgeConfig =
            toml::from_str(r#"api_base_url = "https://api.example.com""#).unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.login_url, DEFAULT_LOGIN_URL);
        assert_eq!(config.panel_url, DEFAULT_PANEL_URL);
    }

    #[test]
    fn toml_roundtrip() {
        let config = BridgeConfig {
            api_base_url: "https://api.example.com".to_string(),
            verify_url: Some("https://verify.example.com".to_string()),
            login_url: "https://app.example.com/login".to_string(),
            panel_url: "https://app.example.com/panel".to_string(),
            listen_port: 9001,
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: BridgeConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.api_base_url, config.api_base_url);
        assert_eq!(parsed.verify_url, config.verify_url);
        assert_eq!(parsed.listen_port, 9001);
    }

    #[test]
    fn display_lists_resolved_endpoints() {
        let config = BridgeConfig::default();
        let out = config.display();
        assert!(out.contains("api_base_url:"));
        assert!(out.contains("/auth/verify"));
    }
}
