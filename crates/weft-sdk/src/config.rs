use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use weft_posts::PostStoreConfig;
use weft_profile::ProfileConfig;
use weft_query::QueryConfig;
use weft_refs::IndexConfig;

use crate::error::{SdkError, SdkResult};

/// Client configuration, usually read from a TOML file.
///
/// ```toml
/// wait_ms = 4000
/// timeline_window_days = 7
/// read_repair = true
/// enrich_wait_ms = 1500
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeftConfig {
    /// Bounded wait before silence is reported as not found.
    pub wait_ms: u64,
    /// Daily shards covered by the global timeline.
    pub timeline_window_days: usize,
    /// Re-issue missing edge halves on read.
    pub read_repair: bool,
    /// How long a feed waits for an author profile before delivering.
    pub enrich_wait_ms: u64,
}

impl Default for WeftConfig {
    fn default() -> Self {
        Self {
            wait_ms: 4000,
            timeline_window_days: 7,
            read_repair: true,
            enrich_wait_ms: 1500,
        }
    }
}

impl WeftConfig {
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path`, or fall back to defaults if it does not exist.
    pub fn load(path: &Path) -> SdkResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    fn validate(&self) -> SdkResult<()> {
        if self.wait_ms == 0 {
            return Err(SdkError::Config("wait_ms must be positive".into()));
        }
        if self.timeline_window_days == 0 {
            return Err(SdkError::Config(
                "timeline_window_days must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }

    pub fn index_config(&self) -> IndexConfig {
        IndexConfig {
            wait: self.wait(),
            read_repair: self.read_repair,
        }
    }

    pub fn post_store_config(&self) -> PostStoreConfig {
        PostStoreConfig { wait: self.wait() }
    }

    pub fn profile_config(&self) -> ProfileConfig {
        ProfileConfig { wait: self.wait() }
    }

    pub fn query_config(&self) -> QueryConfig {
        QueryConfig {
            window_days: self.timeline_window_days,
            enrich_wait: Duration::from_millis(self.enrich_wait_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = WeftConfig::default();
        assert_eq!(c.wait(), Duration::from_secs(4));
        assert_eq!(c.timeline_window_days, 7);
        assert!(c.read_repair);
        assert_eq!(c.query_config().enrich_wait, Duration::from_millis(1500));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = WeftConfig::from_toml_str("wait_ms = 250\nread_repair = false\n").unwrap();
        assert_eq!(c.wait_ms, 250);
        assert!(!c.read_repair);
        assert_eq!(c.timeline_window_days, 7);
        assert!(!c.index_config().read_repair);
    }

    #[test]
    fn rejects_zero_wait() {
        assert!(WeftConfig::from_toml_str("wait_ms = 0").is_err());
        assert!(WeftConfig::from_toml_str("timeline_window_days = 0").is_err());
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = WeftConfig::from_toml_str("wait_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));
    }

    #[test]
    fn toml_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weft.toml");
        let config = WeftConfig {
            wait_ms: 900,
            ..WeftConfig::default()
        };
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();
        assert_eq!(WeftConfig::load(&path).unwrap(), config);
        assert_eq!(
            WeftConfig::load(&dir.path().join("missing.toml")).unwrap(),
            WeftConfig::default()
        );
    }
}
