//! Configuration types for ledgers and quorum.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{BridgeError, LedgerId, Result, constants};

/// Configuration for one ledger's ghost program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// This ledger's own id. Mirror instructions must target it.
    pub ledger_id: LedgerId,
    /// Reclaim eligibility, measured from creation.
    #[serde(default = "default_ghost_timeout")]
    pub ghost_timeout_secs: u64,
    /// Mint eligibility, measured from burn.
    #[serde(default = "default_atomic_window")]
    pub atomic_window_secs: u64,
    /// How many recent ghost ids are kept for relayer re-scans.
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,
}

fn default_ghost_timeout() -> u64 {
    constants::DEFAULT_GHOST_TIMEOUT_SECS
}

fn default_atomic_window() -> u64 {
    constants::DEFAULT_ATOMIC_WINDOW_SECS
}

fn default_recent_window() -> usize {
    constants::DEFAULT_RECENT_WINDOW
}

impl LedgerConfig {
    /// Default deadlines for the given ledger.
    #[must_use]
    pub fn for_ledger(ledger_id: LedgerId) -> Self {
        Self {
            ledger_id,
            ghost_timeout_secs: default_ghost_timeout(),
            atomic_window_secs: default_atomic_window(),
            recent_window: default_recent_window(),
        }
    }

    #[must_use]
    pub fn ghost_timeout(&self) -> Duration {
        secs_to_duration(self.ghost_timeout_secs)
    }

    #[must_use]
    pub fn atomic_window(&self) -> Duration {
        secs_to_duration(self.atomic_window_secs)
    }

    /// Reject configurations the ledger cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.ghost_timeout_secs == 0 {
            return Err(BridgeError::Configuration(
                "ghost_timeout_secs must be > 0".to_string(),
            ));
        }
        if self.atomic_window_secs == 0 {
            return Err(BridgeError::Configuration(
                "atomic_window_secs must be > 0".to_string(),
            ));
        }
        if self.recent_window == 0 {
            return Err(BridgeError::Configuration(
                "recent_window must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn secs_to_duration(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

/// Quorum and validator-set configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumConfig {
    /// Distinct agreeing validators needed to execute a step.
    pub threshold: usize,
    /// Upper bound on enabled validators.
    pub max_validators: usize,
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self {
            threshold: constants::DEFAULT_QUORUM_THRESHOLD,
            max_validators: constants::DEFAULT_MAX_VALIDATORS,
        }
    }
}

impl QuorumConfig {
    pub fn validate(&self) -> Result<()> {
        if self.threshold == 0 {
            return Err(BridgeError::InvalidThreshold(self.threshold));
        }
        if self.max_validators == 0 {
            return Err(BridgeError::Configuration(
                "max_validators must be > 0".to_string(),
            ));
        }
        if self.threshold > self.max_validators {
            return Err(BridgeError::Configuration(format!(
                "threshold {} exceeds max_validators {}",
                self.threshold, self.max_validators
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_config_defaults() {
        let cfg = LedgerConfig::for_ledger(LedgerId(1));
        assert_eq!(cfg.ghost_timeout().num_seconds(), 86_400);
        assert_eq!(cfg.atomic_window().num_seconds(), 3_600);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn ledger_config_serde_fills_defaults() {
        let cfg: LedgerConfig = serde_json::from_str(r#"{"ledger_id": 7}"#).unwrap();
        assert_eq!(cfg.ledger_id, LedgerId(7));
        assert_eq!(cfg.recent_window, constants::DEFAULT_RECENT_WINDOW);
    }

    #[test]
    fn zero_window_rejected() {
        let mut cfg = LedgerConfig::for_ledger(LedgerId(1));
        cfg.atomic_window_secs = 0;
        assert!(matches!(
            cfg.validate(),
            Err(BridgeError::Configuration(_))
        ));
    }

    #[test]
    fn quorum_threshold_minimum_one() {
        let cfg = QuorumConfig {
            threshold: 0,
            max_validators: 4,
        };
        assert_eq!(cfg.validate(), Err(BridgeError::InvalidThreshold(0)));
        assert!(QuorumConfig::default().validate().is_ok());
    }

    #[test]
    fn quorum_threshold_above_cap_rejected() {
        let cfg = QuorumConfig {
            threshold: 5,
            max_validators: 4,
        };
        assert!(matches!(cfg.validate(), Err(BridgeError::Configuration(_))));
    }
}
