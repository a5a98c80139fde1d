//! Runtime configuration.
//!
//! # Responsibility
//! - Collect every tunable (store location, admission limits, grid, room)
//!   into one typed value.
//! - Read it from `STORYWALL_*` environment variables.
//!
//! # Invariants
//! - A missing database location is fatal; everything else has a default.
//! - Zero limits, windows, or grid widths are rejected, never clamped.

use crate::admission::{QuotaConsistency, QuotaPolicy, RateLimitConfig};
use crate::layout::RoomDimensions;
use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::str::FromStr;

pub const ENV_DATABASE_URL: &str = "STORYWALL_DATABASE_URL";
pub const ENV_RATE_LIMIT: &str = "STORYWALL_RATE_LIMIT";
pub const ENV_RATE_WINDOW_MS: &str = "STORYWALL_RATE_WINDOW_MS";
pub const ENV_NOTE_CAP: &str = "STORYWALL_NOTE_CAP";
pub const ENV_QUOTA_MODE: &str = "STORYWALL_QUOTA_MODE";
pub const ENV_GRID_COLUMNS: &str = "STORYWALL_GRID_COLUMNS";
pub const ENV_LOG_LEVEL: &str = "STORYWALL_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "STORYWALL_LOG_DIR";

/// Slots per wall row unless configured otherwise.
pub const DEFAULT_GRID_COLUMNS: NonZeroU32 = match NonZeroU32::new(10) {
    Some(value) => value,
    None => panic!("grid column default must be non-zero"),
};

const SQLITE_URL_PREFIX: &str = "sqlite://";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingDatabaseUrl,
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDatabaseUrl => {
                write!(f, "{ENV_DATABASE_URL} must be set to the note database location")
            }
            Self::InvalidValue { key, value } => write!(f, "invalid value `{value}` for {key}"),
        }
    }
}

impl Error for ConfigError {}

/// Complete service configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryWallConfig {
    pub database_path: PathBuf,
    pub rate_limit: RateLimitConfig,
    pub quota: QuotaPolicy,
    pub grid_columns: NonZeroU32,
    pub room: RoomDimensions,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl StoryWallConfig {
    /// Configuration with defaults around an explicit database path.
    pub fn with_database(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            rate_limit: RateLimitConfig::default(),
            quota: QuotaPolicy::default(),
            grid_columns: DEFAULT_GRID_COLUMNS,
            room: RoomDimensions::default(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }

    /// Reads configuration from process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let database_url = read(ENV_DATABASE_URL).ok_or(ConfigError::MissingDatabaseUrl)?;
        let database_path = database_url
            .strip_prefix(SQLITE_URL_PREFIX)
            .unwrap_or(&database_url);
        if database_path.is_empty() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        let mut config = Self::with_database(database_path);

        if let Some(raw) = read(ENV_RATE_LIMIT) {
            config.rate_limit.limit = parse_positive(ENV_RATE_LIMIT, &raw)?;
        }
        if let Some(raw) = read(ENV_RATE_WINDOW_MS) {
            config.rate_limit.window_ms = parse_positive(ENV_RATE_WINDOW_MS, &raw)?;
        }
        if let Some(raw) = read(ENV_NOTE_CAP) {
            config.quota.cap = parse_positive(ENV_NOTE_CAP, &raw)?;
        }
        if let Some(raw) = read(ENV_QUOTA_MODE) {
            config.quota.consistency =
                QuotaConsistency::parse(&raw).ok_or(ConfigError::InvalidValue {
                    key: ENV_QUOTA_MODE,
                    value: raw.clone(),
                })?;
        }
        if let Some(raw) = read(ENV_GRID_COLUMNS) {
            let columns: u32 = parse_positive(ENV_GRID_COLUMNS, &raw)?;
            config.grid_columns = NonZeroU32::new(columns).ok_or(ConfigError::InvalidValue {
                key: ENV_GRID_COLUMNS,
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = read(ENV_LOG_LEVEL) {
            config.log_level = raw;
        }
        config.log_dir = read(ENV_LOG_DIR).map(PathBuf::from);

        Ok(config)
    }
}

fn parse_number<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

fn parse_positive<T: FromStr + PartialOrd + Default>(
    key: &'static str,
    raw: &str,
) -> Result<T, ConfigError> {
    let value: T = parse_number(key, raw)?;
    if value <= T::default() {
        return Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::{
        ConfigError, StoryWallConfig, ENV_DATABASE_URL, ENV_GRID_COLUMNS, ENV_NOTE_CAP,
        ENV_QUOTA_MODE, ENV_RATE_LIMIT, ENV_RATE_WINDOW_MS,
    };
    use crate::admission::QuotaConsistency;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn load(pairs: &[(&str, &str)]) -> Result<StoryWallConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        StoryWallConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn missing_or_blank_database_url_is_fatal() {
        assert_eq!(load(&[]).unwrap_err(), ConfigError::MissingDatabaseUrl);
        assert_eq!(
            load(&[(ENV_DATABASE_URL, "   ")]).unwrap_err(),
            ConfigError::MissingDatabaseUrl
        );
        assert_eq!(
            load(&[(ENV_DATABASE_URL, "sqlite://")]).unwrap_err(),
            ConfigError::MissingDatabaseUrl
        );
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = load(&[(ENV_DATABASE_URL, "sqlite:///var/lib/storywall.db")]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/var/lib/storywall.db"));
        assert_eq!(config.rate_limit.limit, 10);
        assert_eq!(config.rate_limit.window_ms, 60_000);
        assert_eq!(config.quota.cap, 1);
        assert_eq!(config.quota.consistency, QuotaConsistency::ReadThenWrite);
        assert_eq!(config.grid_columns.get(), 10);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            (ENV_DATABASE_URL, "notes.db"),
            (ENV_RATE_LIMIT, "3"),
            (ENV_RATE_WINDOW_MS, "1000"),
            (ENV_NOTE_CAP, "2"),
            (ENV_QUOTA_MODE, "atomic"),
            (ENV_GRID_COLUMNS, "4"),
        ])
        .unwrap();
        assert_eq!(config.rate_limit.limit, 3);
        assert_eq!(config.rate_limit.window_ms, 1_000);
        assert_eq!(config.quota.cap, 2);
        assert_eq!(config.quota.consistency, QuotaConsistency::Atomic);
        assert_eq!(config.grid_columns.get(), 4);
    }

    #[test]
    fn zero_and_garbage_values_are_rejected() {
        for (key, value) in [
            (ENV_RATE_LIMIT, "0"),
            (ENV_RATE_WINDOW_MS, "soon"),
            (ENV_GRID_COLUMNS, "0"),
            (ENV_QUOTA_MODE, "maybe"),
            (ENV_NOTE_CAP, "-1"),
            (ENV_NOTE_CAP, "0"),
        ] {
            let err = load(&[(ENV_DATABASE_URL, "notes.db"), (key, value)]).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue { key: k, .. } if k == key),
                "{key}={value} should be rejected, got {err}"
            );
        }
    }
}
