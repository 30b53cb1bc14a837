use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    pub api_key: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_url_env")]
    pub url_env: String,
    #[serde(default = "default_key_env")]
    pub key_env: String,
}

fn default_table() -> String {
    "places".to_string()
}

fn default_url_env() -> String {
    "PLACE_LOG_BACKEND_URL".to_string()
}

fn default_key_env() -> String {
    "PLACE_LOG_BACKEND_KEY".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_repaint_ms")]
    pub repaint_ms: u64,
}

fn default_title() -> String {
    "Place Adventure Log".to_string()
}

fn default_repaint_ms() -> u64 {
    250
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            repaint_ms: default_repaint_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

impl AppConfig {
    pub fn load_default() -> anyhow::Result<Self> {
        let default = include_str!("../config/default.toml");
        let cfg: AppConfig = toml::from_str(default)?;
        Ok(cfg)
    }

    pub fn load_from(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let p = path.into();
        let s = fs::read_to_string(&p)?;
        let cfg: AppConfig = toml::from_str(&s)?;
        Ok(cfg)
    }

    /// Overlay backend credentials from the environment variables named in `[backend]`.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(&self.backend.url_env).filter(|v| !v.trim().is_empty()) {
            tracing::debug!("backend url taken from {}", self.backend.url_env);
            self.backend.url = url;
        }
        if let Some(key) = lookup(&self.backend.key_env).filter(|v| !v.trim().is_empty()) {
            tracing::debug!("backend key taken from {}", self.backend.key_env);
            self.backend.api_key = Some(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_parses() {
        let cfg = AppConfig::load_default().unwrap();
        assert_eq!(cfg.backend.table, "places");
        assert_eq!(cfg.backend.url_env, "PLACE_LOG_BACKEND_URL");
        assert!(cfg.backend.api_key.is_none());
        assert_eq!(cfg.ui.repaint_ms, 250);
    }

    #[test]
    fn test_load_from_file_with_defaults() -> anyhow::Result<()> {
        let tmpdir = TempDir::new()?;
        let path = tmpdir.path().join("place_log.toml");
        fs::write(
            &path,
            "[backend]\nurl = \"https://example.supabase.co\"\napi_key = \"anon\"\n",
        )?;

        let cfg = AppConfig::load_from(&path)?;
        assert_eq!(cfg.backend.url, "https://example.supabase.co");
        assert_eq!(cfg.backend.api_key.as_deref(), Some("anon"));
        assert_eq!(cfg.backend.table, "places");
        assert_eq!(cfg.ui.title, "Place Adventure Log");
        Ok(())
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(AppConfig::load_from("/nonexistent/place_log.toml").is_err());
    }

    #[test]
    fn test_env_overrides_backend() {
        let mut cfg = AppConfig::load_default().unwrap();
        let env: HashMap<&str, &str> = [
            ("PLACE_LOG_BACKEND_URL", "https://project.supabase.co"),
            ("PLACE_LOG_BACKEND_KEY", "secret"),
        ]
        .into_iter()
        .collect();

        cfg.apply_overrides(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(cfg.backend.url, "https://project.supabase.co");
        assert_eq!(cfg.backend.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let mut cfg = AppConfig::load_default().unwrap();
        let original = cfg.backend.url.clone();
        cfg.apply_overrides(|_| Some("  ".to_string()));
        assert_eq!(cfg.backend.url, original);
        assert!(cfg.backend.api_key.is_none());
    }
}
