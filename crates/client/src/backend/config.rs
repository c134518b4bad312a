use directories::BaseDirs;
use serde::Deserialize;
use std::{env, fs, path::PathBuf, time::Duration};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Clone, Debug, Deserialize)]
pub struct BackendFileConfig {
    pub base_url: Option<String>,
    pub connect_timeout_ms: Option<u64>,
    pub stream_idle_timeout_ms: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub stream_idle_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_millis(10_000),
            stream_idle_timeout: Duration::from_millis(300_000),
        }
    }
}

impl BackendConfig {
    /// Layered lookup: defaults, then the optional config file, then the
    /// `PAPERCHAT_BASE_URL` environment variable.
    pub fn from_env_and_file() -> Self {
        let mut cfg = Self::default();
        if let Some(path) = Self::config_path() {
            if path.exists() {
                if let Ok(raw) = fs::read_to_string(&path) {
                    if let Ok(file_cfg) = toml::from_str::<BackendFileConfig>(&raw) {
                        if let Some(b) = file_cfg.base_url {
                            cfg.base_url = b;
                        }
                        if let Some(t) = file_cfg.connect_timeout_ms {
                            cfg.connect_timeout = Duration::from_millis(t);
                        }
                        if let Some(idle) = file_cfg.stream_idle_timeout_ms {
                            cfg.stream_idle_timeout = Duration::from_millis(idle);
                        }
                    }
                }
            }
        }
        if let Ok(url) = env::var("PAPERCHAT_BASE_URL") {
            if !url.trim().is_empty() {
                cfg.base_url = url;
            }
        }
        cfg
    }

    fn config_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        let p = if cfg!(target_os = "windows") {
            base.home_dir().join(".paperchat").join("config.toml")
        } else {
            base.config_dir().join("paperchat").join("config.toml")
        };
        Some(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_url_is_the_local_loopback_service() {
        assert_eq!(BackendConfig::default().base_url, "http://localhost:8000");
    }

    #[test]
    fn file_config_fields_are_all_optional() {
        let cfg: BackendFileConfig = toml::from_str("").unwrap();
        assert!(cfg.base_url.is_none());

        let cfg: BackendFileConfig =
            toml::from_str("base_url = \"http://10.0.0.2:8000\"\nstream_idle_timeout_ms = 60000")
                .unwrap();
        assert_eq!(cfg.base_url.as_deref(), Some("http://10.0.0.2:8000"));
        assert_eq!(cfg.stream_idle_timeout_ms, Some(60_000));
        assert!(cfg.connect_timeout_ms.is_none());
    }
}
