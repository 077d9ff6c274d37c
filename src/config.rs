use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-request timeout for the root page and every asset.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Assets (and pages) larger than this are rejected.
pub const DEFAULT_MAX_ASSET_SIZE: u64 = 50 * 1024 * 1024;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

pub const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Tunables for a mirror operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorOptions {
    /// Timeout applied to each individual fetch.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    pub max_asset_size: u64,
    pub user_agent: String,
    /// Upper bound on asset fetches in flight at once. Zero is treated as one.
    pub max_concurrent: usize,
    /// Remove earlier output before mirroring instead of accumulating
    /// `_1`, `_2` variants next to it.
    pub clean_before_mirror: bool,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_asset_size: DEFAULT_MAX_ASSET_SIZE,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            clean_before_mirror: false,
        }
    }
}

impl MirrorOptions {
    pub(crate) fn concurrency(&self) -> usize {
        self.max_concurrent.max(1)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = MirrorOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.max_asset_size, 52_428_800);
        assert!(options.user_agent.starts_with("Mozilla/5.0"));
        assert!(!options.clean_before_mirror);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let options = MirrorOptions { max_concurrent: 0, ..MirrorOptions::default() };
        assert_eq!(options.concurrency(), 1);
    }

    #[test]
    fn test_json_round_trip_keeps_timeout() {
        let options = MirrorOptions { timeout: Duration::from_millis(1500), ..MirrorOptions::default() };
        let json = serde_json::to_string(&options).unwrap();
        assert!(json.contains("\"timeout\":1.5"));
        let back: MirrorOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, options);
    }
}
