// File: ./src/config.rs
// Handles configuration loading, saving, and defaults.
use crate::context::AppContext;
use crate::reconstruct::{Heuristics, Layout};
use crate::storage::LocalStorage;
use anyhow::{Error, Result, anyhow};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;

pub const FALLBACK_TIMEZONE: &str = "UTC";

fn default_product_id() -> String {
    "Visma InSchool timetable to iCalendar".to_string()
}
fn default_uid_prefix() -> String {
    "fromvisma".to_string()
}
fn default_reminder_minutes() -> u32 {
    15
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Config {
    /// IANA zone written into DTSTART/DTEND. Falls back to `$TZ`, the system zone, then UTC.
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default = "default_product_id")]
    pub product_id: String,
    #[serde(default = "default_uid_prefix")]
    pub uid_prefix: String,
    #[serde(default = "default_reminder_minutes")]
    pub reminder_minutes: u32,
    #[serde(default)]
    pub heuristics: Heuristics,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: None,
            layout: Layout::default(),
            product_id: default_product_id(),
            uid_prefix: default_uid_prefix(),
            reminder_minutes: default_reminder_minutes(),
            heuristics: Heuristics::default(),
        }
    }
}

impl Config {
    /// Load the configuration from disk using an explicit context.
    pub fn load(ctx: &dyn AppContext) -> Result<Self> {
        let path = ctx.get_config_file_path()?;

        if !path.exists() {
            return Err(anyhow!("Config file not found"));
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;

        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(ctx: &dyn AppContext) -> Result<Self> {
        match Self::load(ctx) {
            Ok(config) => Ok(config),
            Err(e) if Self::is_missing_config_error(&e) => {
                log::debug!("No config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Detects a missing config file, either from our own message or from an
    /// `io::ErrorKind::NotFound` anywhere in the chain.
    pub fn is_missing_config_error(err: &Error) -> bool {
        if err.to_string().contains("Config file not found") {
            return true;
        }

        err.chain().any(|cause| {
            cause
                .downcast_ref::<std::io::Error>()
                .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
        })
    }

    /// Save configuration using an explicit context.
    pub fn save(&self, ctx: &dyn AppContext) -> Result<()> {
        let path = ctx.get_config_file_path()?;
        LocalStorage::with_lock(&path, || {
            let toml_str = toml::to_string_pretty(self)?;
            LocalStorage::atomic_write(&path, toml_str)?;
            Ok(())
        })?;
        Ok(())
    }

    pub fn get_path_string(ctx: &dyn AppContext) -> Result<String> {
        let path = ctx.get_config_file_path()?;
        Ok(path.to_string_lossy().to_string())
    }

    /// Picks the output timezone: explicit override, config, `$TZ`, the
    /// system zone, then UTC. Whatever is chosen must be a known IANA zone.
    pub fn resolve_timezone(&self, cli_override: Option<&str>) -> Result<String> {
        let env_tz = std::env::var("TZ").ok().filter(|tz| !tz.trim().is_empty());
        let chosen = cli_override
            .map(str::to_string)
            .or_else(|| self.timezone.clone())
            .or(env_tz);
        match chosen {
            Some(name) => validate_timezone(name.trim()),
            None => Ok(system_timezone().unwrap_or_else(|| FALLBACK_TIMEZONE.to_string())),
        }
    }
}

/// The machine's local IANA zone, if it can be determined and is known.
pub fn system_timezone() -> Option<String> {
    let name = match iana_time_zone::get_timezone() {
        Ok(name) => name,
        Err(e) => {
            log::debug!("No system timezone: {}", e);
            return None;
        }
    };
    match validate_timezone(&name) {
        Ok(name) => Some(name),
        Err(e) => {
            log::warn!("Ignoring system timezone: {}", e);
            None
        }
    }
}

pub fn validate_timezone(name: &str) -> Result<String> {
    // TZ values like ":Europe/Oslo" point at a zoneinfo file name
    let name = name.trim_start_matches(':');
    name.parse::<Tz>()
        .map(|tz| tz.name().to_string())
        .map_err(|_| anyhow!("Unknown timezone '{}'", name))
}
