use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_SECRET_KEY: &str = "change-this-in-production";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Signs session cookies. Must be changed for any real deployment.
    #[serde(default = "default_secret_key")]
    pub secret_key: String,

    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Write logs to daily-rotated files here instead of journald/stdout.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("gallery.db")
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("static/uploads")
}

fn default_secret_key() -> String {
    DEFAULT_SECRET_KEY.to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_session_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_pool_size() -> u32 {
    8
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            upload_dir: default_upload_dir(),
            secret_key: default_secret_key(),
            debug: false,
            host: default_host(),
            port: default_port(),
            session_ttl_secs: default_session_ttl_secs(),
            pool_size: default_pool_size(),
            log_dir: None,
        }
    }
}

impl Config {
    /// Load from `GALLERY_CONFIG` or the default location, then apply
    /// environment overrides. A missing file means defaults.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os("GALLERY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(Self::config_path);
        Self::load_from(&path)
    }

    /// Load a file named on the command line. Unlike the default location,
    /// it must exist.
    pub fn load_explicit(path: &Path) -> Result<Self> {
        if !path.is_file() {
            anyhow::bail!("Config file {:?} does not exist or is not a regular file", path);
        }
        Self::load_from(path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file {:?}", path))?
        } else {
            Config::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override fields from `GALLERY_*` variables looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("GALLERY_DB_PATH") {
            self.db_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("GALLERY_UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("GALLERY_SECRET_KEY") {
            self.secret_key = v;
        }
        if let Some(v) = lookup("GALLERY_DEBUG") {
            self.debug = parse_flag("GALLERY_DEBUG", &v)?;
        }
        if let Some(v) = lookup("GALLERY_HOST") {
            self.host = v;
        }
        override_parsed(&lookup, "GALLERY_PORT", &mut self.port)?;
        override_parsed(&lookup, "GALLERY_SESSION_TTL", &mut self.session_ttl_secs)?;
        override_parsed(&lookup, "GALLERY_POOL_SIZE", &mut self.pool_size)?;
        if let Some(v) = lookup("GALLERY_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gallery")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {key} value {raw:?}: {e}"))?;
    }
    Ok(())
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("Invalid {key} value {other:?}: expected 1/0 or true/false"),
    }
}
