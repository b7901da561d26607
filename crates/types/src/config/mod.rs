// Path: crates/types/src/config/mod.rs

//! Registry configuration.
use serde::{Deserialize, Serialize};

/// Tunables of the registry and its cache manager.
///
/// Every field has a default, so an empty TOML document is a valid config.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// A full snapshot is written every `snapshot_period` blocks.
    #[serde(default = "default_snapshot_period")]
    pub snapshot_period: u32,
    /// Number of snapshots kept on disk (and the number of periods of diffs).
    #[serde(default = "default_snapshots_retained")]
    pub snapshots_retained: u32,
    /// Lower bound of the dynamic PoSe ban threshold.
    #[serde(default = "default_min_max_pose_penalty")]
    pub min_max_pose_penalty: u32,
    /// Percentage of the ban threshold charged to a member that failed a quorum commitment.
    #[serde(default = "default_commitment_penalty_percent")]
    pub commitment_penalty_percent: u32,
    /// First height the registry tracks. Blocks below it are ignored.
    #[serde(default)]
    pub activation_height: i64,
    /// Interval of the background maintenance task.
    #[serde(default = "default_maintenance_interval_ms")]
    pub maintenance_interval_ms: u64,
}

fn default_snapshot_period() -> u32 {
    576
}
fn default_snapshots_retained() -> u32 {
    3
}
fn default_min_max_pose_penalty() -> u32 {
    100
}
fn default_commitment_penalty_percent() -> u32 {
    66
}
fn default_maintenance_interval_ms() -> u64 {
    1000
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            snapshot_period: default_snapshot_period(),
            snapshots_retained: default_snapshots_retained(),
            min_max_pose_penalty: default_min_max_pose_penalty(),
            commitment_penalty_percent: default_commitment_penalty_percent(),
            activation_height: 0,
            maintenance_interval_ms: default_maintenance_interval_ms(),
        }
    }
}

impl RegistryConfig {
    /// Checks that the values are usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.snapshot_period == 0 {
            return Err("snapshot_period must be greater than zero".into());
        }
        if self.snapshots_retained == 0 {
            return Err("snapshots_retained must be greater than zero".into());
        }
        if self.min_max_pose_penalty == 0 {
            return Err("min_max_pose_penalty must be greater than zero".into());
        }
        if !(1..=100).contains(&self.commitment_penalty_percent) {
            return Err(format!(
                "commitment_penalty_percent must be within 1..=100, got {}",
                self.commitment_penalty_percent
            ));
        }
        if self.maintenance_interval_ms == 0 {
            return Err("maintenance_interval_ms must be greater than zero".into());
        }
        Ok(())
    }

    /// Number of blocks of history kept in memory and on disk as diffs.
    pub fn cache_window(&self) -> i64 {
        i64::from(self.snapshot_period) * i64::from(self.snapshots_retained)
    }

    /// Returns true if a snapshot is due at `height`.
    pub fn is_snapshot_height(&self, height: i64) -> bool {
        height % i64::from(self.snapshot_period.max(1)) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: RegistryConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, RegistryConfig::default());
        assert_eq!(cfg.cache_window(), 576 * 3);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_percent() {
        let cfg: RegistryConfig = toml::from_str("commitment_penalty_percent = 0").unwrap();
        assert!(cfg.validate().is_err());
        let cfg = RegistryConfig {
            commitment_penalty_percent: 101,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn snapshot_heights_follow_the_period() {
        let cfg = RegistryConfig {
            snapshot_period: 10,
            ..Default::default()
        };
        assert!(cfg.is_snapshot_height(0));
        assert!(cfg.is_snapshot_height(20));
        assert!(!cfg.is_snapshot_height(21));
    }
}
