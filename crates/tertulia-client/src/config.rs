//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so an embedding application can start with
//! zero configuration.

use std::path::PathBuf;
use std::time::Duration;

use tertulia_shared::constants::{
    DEFAULT_GROUP_PHOTO_URL, HEARTBEAT_INTERVAL_SECS, MAX_UPLOAD_SIZE, ONLINE_WINDOW_SECS,
};
use tertulia_store::database::default_data_dir;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Directory holding the local database and filesystem blobs.
    /// Env: `TERTULIA_DATA_DIR`
    /// Default: the platform data directory.
    pub data_dir: PathBuf,

    /// Interval between presence heartbeats.
    /// Env: `TERTULIA_HEARTBEAT_SECS`
    /// Default: `120`
    pub heartbeat_interval: Duration,

    /// How long after the last heartbeat a user still counts as online.
    /// Env: `TERTULIA_ONLINE_WINDOW_SECS`
    /// Default: `180`
    pub online_window_secs: i64,

    /// Avatar assigned to new groups.
    /// Env: `TERTULIA_GROUP_PHOTO_URL`
    pub group_photo_url: String,

    /// Maximum attachment size in bytes.
    /// Env: `TERTULIA_MAX_UPLOAD_BYTES`
    /// Default: 25 MiB
    pub max_upload_bytes: usize,

    /// Capacity of the client event channel.
    /// Env: `TERTULIA_EVENT_CAPACITY`
    /// Default: `256`
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().unwrap_or_else(|_| PathBuf::from("./tertulia-data")),
            heartbeat_interval: Duration::from_secs(HEARTBEAT_INTERVAL_SECS),
            online_window_secs: ONLINE_WINDOW_SECS,
            group_photo_url: DEFAULT_GROUP_PHOTO_URL.to_string(),
            max_upload_bytes: MAX_UPLOAD_SIZE,
            event_capacity: 256,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("TERTULIA_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }

        if let Some(secs) = parse_var::<u64>(&lookup, "TERTULIA_HEARTBEAT_SECS") {
            if secs > 0 {
                config.heartbeat_interval = Duration::from_secs(secs);
            } else {
                tracing::warn!("TERTULIA_HEARTBEAT_SECS must be positive, using default");
            }
        }

        if let Some(secs) = parse_var::<i64>(&lookup, "TERTULIA_ONLINE_WINDOW_SECS") {
            config.online_window_secs = secs.max(0);
        }

        if let Some(url) = lookup("TERTULIA_GROUP_PHOTO_URL") {
            if !url.is_empty() {
                config.group_photo_url = url;
            }
        }

        if let Some(max) = parse_var::<usize>(&lookup, "TERTULIA_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = max;
        }

        if let Some(capacity) = parse_var::<usize>(&lookup, "TERTULIA_EVENT_CAPACITY") {
            // broadcast channels panic on zero capacity
            config.event_capacity = capacity.max(1);
        }

        config
    }

    pub fn online_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.online_window_secs)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("tertulia.db")
    }

    pub fn blob_dir(&self) -> PathBuf {
        self.data_dir.join("blobs")
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Invalid value, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::from_lookup(lookup(&[]));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(120));
        assert_eq!(config.online_window_secs, 180);
        assert_eq!(config.group_photo_url, DEFAULT_GROUP_PHOTO_URL);
        assert_eq!(config.event_capacity, 256);
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("TERTULIA_DATA_DIR", "/tmp/tertulia"),
            ("TERTULIA_HEARTBEAT_SECS", "30"),
            ("TERTULIA_MAX_UPLOAD_BYTES", "1024"),
        ]));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/tertulia"));
        assert_eq!(config.database_path(), PathBuf::from("/tmp/tertulia/tertulia.db"));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.max_upload_bytes, 1024);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("TERTULIA_HEARTBEAT_SECS", "soon"),
            ("TERTULIA_EVENT_CAPACITY", "0"),
            ("TERTULIA_ONLINE_WINDOW_SECS", "-"),
        ]));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(120));
        assert_eq!(config.event_capacity, 1);
        assert_eq!(config.online_window_secs, 180);
    }
}
