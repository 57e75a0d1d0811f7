//! Configuration loading and management.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Collector ingestion endpoint.
    pub collector_url: String,
    /// Seconds between flush attempts.
    pub flush_interval_secs: u64,
    /// Per-request timeout for collector calls, in seconds.
    pub request_timeout_secs: u64,
    /// Path to the ledger database file.
    pub ledger_path: PathBuf,
    /// Domain aliases applied before accumulation (e.g. "github.com" = "GitHub").
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("collector_url", &self.collector_url)
            .field("flush_interval_secs", &self.flush_interval_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("ledger_path", &self.ledger_path)
            .field("aliases", &self.aliases.len())
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            collector_url: "http://localhost:8080/usage".to_string(),
            flush_interval_secs: 30,
            request_timeout_secs: 10,
            ledger_path: data_dir.join("ledger.db"),
            aliases: HashMap::new(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Precedence, lowest first: built-in defaults, `config.toml` in the
    /// platform config dir, the explicit file, then `FT_*` environment
    /// variables.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("FT_"));

        figment.extract()
    }

    /// The flush interval as a [`Duration`], clamped to at least one second.
    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs.max(1))
    }

    /// The collector request timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Returns the platform-specific config directory for ft.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ft"))
}

/// Returns the platform-specific data directory for ft.
///
/// On Linux: `~/.local/share/ft`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("ft"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_data_path_returns_some() {
        assert!(dirs_data_path().is_some());
    }

    #[test]
    fn test_dirs_data_path_ends_with_ft() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "ft");
    }

    #[test]
    fn test_default_flush_interval_is_thirty_seconds() {
        let config = Config::default();
        assert_eq!(config.flush_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_flush_interval_clamps_to_one_second() {
        let config = Config {
            flush_interval_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.flush_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_default_config_uses_data_dir_for_ledger() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.ledger_path, data_dir.join("ledger.db"));
    }
}
