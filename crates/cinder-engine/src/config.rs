use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::Duration;
use serde::Deserialize;

/// Limits at or above this are treated as "no quota". Preserved from the
/// source system's observed behavior rather than an explicit flag.
pub const UNLIMITED_THRESHOLD: u32 = 1000;

/// What a subscription tier entitles. Capability-based: nothing in the
/// engine compares tier names.
#[derive(Debug, Clone, Deserialize)]
pub struct TierPolicy {
    pub daily_limit: u32,
    #[serde(default)]
    pub boost: bool,
}

/// Tier-to-policy mapping. External configuration — loaded from a JSON
/// file in production, built-in defaults otherwise.
#[derive(Debug, Clone)]
pub struct TierRegistry {
    tiers: HashMap<String, TierPolicy>,
}

impl TierRegistry {
    pub fn new(tiers: HashMap<String, TierPolicy>) -> Self {
        Self { tiers }
    }

    /// Parse a `{"tier_name": {"daily_limit": N, "boost": bool}, ...}` file.
    pub fn from_json(json: &str) -> Result<Self> {
        let tiers: HashMap<String, TierPolicy> =
            serde_json::from_str(json).context("invalid tier configuration")?;
        Ok(Self { tiers })
    }

    pub fn builtin() -> Self {
        let mut tiers = HashMap::new();
        tiers.insert(
            "free".to_string(),
            TierPolicy {
                daily_limit: 25,
                boost: false,
            },
        );
        tiers.insert(
            "plus".to_string(),
            TierPolicy {
                daily_limit: 100,
                boost: true,
            },
        );
        tiers.insert(
            "infinite".to_string(),
            TierPolicy {
                daily_limit: UNLIMITED_THRESHOLD,
                boost: true,
            },
        );
        Self { tiers }
    }

    pub fn policy(&self, tier: &str) -> Option<&TierPolicy> {
        self.tiers.get(tier)
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub tiers: TierRegistry,
    pub boost_duration: Duration,
    /// Bounded retry budget for busy/locked storage conflicts.
    pub max_txn_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tiers: TierRegistry::builtin(),
            boost_duration: Duration::minutes(30),
            max_txn_attempts: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tier_file() {
        let reg = TierRegistry::from_json(
            r#"{"free": {"daily_limit": 10}, "gold": {"daily_limit": 200, "boost": true}}"#,
        )
        .unwrap();

        assert_eq!(reg.policy("free").unwrap().daily_limit, 10);
        assert!(!reg.policy("free").unwrap().boost);
        assert!(reg.policy("gold").unwrap().boost);
        assert!(reg.policy("missing").is_none());
    }

    #[test]
    fn rejects_malformed_tier_file() {
        assert!(TierRegistry::from_json(r#"{"free": {"boost": true}}"#).is_err());
    }
}
