use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::{info, warn};

use crate::assignments::RemovalPolicy;
use crate::error::{Error, Result};

const DEFAULT_API_URL: &str = "http://localhost/kolektrash/backend/api";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub port: u16,
    pub timeout: Duration,
    pub barangays_path: Option<PathBuf>,
    pub session_file: PathBuf,
    pub session_key: Option<String>,
    pub secure_cookies: bool,
    pub static_dir: Option<PathBuf>,
    pub removal_policy: RemovalPolicy,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, `KOLEKTRASH_*` names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secs: u64 = try_load(&lookup, "KOLEKTRASH_TIMEOUT_SECS", "15")?;
        Ok(Self {
            api_url: try_load(&lookup, "KOLEKTRASH_API_URL", DEFAULT_API_URL)?,
            port: try_load(&lookup, "KOLEKTRASH_PORT", "8080")?,
            timeout: Duration::from_secs(secs),
            barangays_path: optional(&lookup, "KOLEKTRASH_BARANGAYS").map(PathBuf::from),
            session_file: try_load(&lookup, "KOLEKTRASH_SESSION_FILE", "session.json")?,
            session_key: optional(&lookup, "KOLEKTRASH_SESSION_KEY"),
            secure_cookies: try_load(&lookup, "KOLEKTRASH_SECURE_COOKIES", "true")?,
            static_dir: optional(&lookup, "KOLEKTRASH_STATIC_DIR").map(PathBuf::from),
            removal_policy: try_load(&lookup, "KOLEKTRASH_REMOVAL_POLICY", "fire_and_forget")?,
        })
    }
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn try_load<F, T>(lookup: &F, key: &str, default: &str) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let raw = optional(lookup, key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        Error::Config(format!("invalid {key} value {raw:?}: {e}"))
    })
}
