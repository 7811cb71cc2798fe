use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};

/// Connection settings for the ledger store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// sqlx connection URL, e.g. `sqlite:ledger.db`
    pub database_url: String,
    pub max_connections: u32,
    /// How long a writer waits for the database lock before giving up
    #[serde(with = "millis")]
    pub busy_timeout: Duration,
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:ledgerline.db".to_string(),
            max_connections: 8,
            busy_timeout: Duration::from_secs(5),
            create_if_missing: false,
        }
    }
}

impl StoreConfig {
    /// Config for a database file on disk.
    pub fn for_path(path: &str) -> Self {
        Self {
            database_url: format!("sqlite:{}", path),
            ..Self::default()
        }
    }

    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Build sqlx connect options: WAL journal, foreign keys enforced, busy timeout applied.
    pub fn connect_options(&self) -> Result<SqliteConnectOptions> {
        let options = SqliteConnectOptions::from_str(&self.database_url)
            .with_context(|| format!("Invalid database URL: {}", self.database_url))?
            .create_if_missing(self.create_if_missing)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout);
        Ok(options)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_path() {
        let config = StoreConfig::for_path("/tmp/ledger.db").with_create_if_missing(true);
        assert_eq!(config.database_url, "sqlite:/tmp/ledger.db");
        assert!(config.create_if_missing);
        assert_eq!(config.max_connections, 8);
    }

    #[test]
    fn test_max_connections_floor() {
        let config = StoreConfig::default().with_max_connections(0);
        assert_eq!(config.max_connections, 1);
    }

    #[test]
    fn test_connect_options_accepts_url() {
        let config = StoreConfig::for_path("ledger.db");
        assert!(config.connect_options().is_ok());
    }

    #[test]
    fn test_busy_timeout_serializes_as_millis() {
        let config = StoreConfig::default().with_busy_timeout(Duration::from_millis(1500));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["busy_timeout"], 1500);

        let back: StoreConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back.busy_timeout, Duration::from_millis(1500));
    }
}
