//! Relayer configuration.
//!
//! Loaded from a JSON file; every field has a default so a partial file (or
//! none at all, for the devnet) is enough.

use std::{path::Path, time::Duration};

use ghostbridge_types::{BridgeError, LedgerId, Result, constants};
use serde::{Deserialize, Serialize};

/// How the delay between proof attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed,
    /// Delay doubles per retry, capped at `max_delay_ms`.
    Exponential { max_delay_ms: u64 },
}

/// Bounded retry around the proof oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: constants::DEFAULT_PROOF_MAX_ATTEMPTS,
            delay_ms: constants::DEFAULT_PROOF_RETRY_DELAY_MS,
            backoff: Backoff::Fixed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayerConfig {
    /// Ledger whose transfers this relayer drives.
    pub origin_ledger: LedgerId,
    /// Ledger that receives mirrored transfers.
    pub target_ledger: LedgerId,
    /// Period of the re-scan sweep over the origin's recent history.
    pub scan_interval_ms: u64,
    /// How many recent origin ids each sweep inspects.
    pub scan_window: usize,
    /// Upper bound on transfers reconciled in parallel.
    pub max_concurrent_pipelines: usize,
    /// Capacity of the in-memory processed set.
    pub processed_cache_size: usize,
    pub proof_retry: RetryConfig,
    /// How long to wait for the destination mint vote to land.
    pub mint_confirm_timeout_ms: u64,
    /// Hex-encoded 32-byte ed25519 seed. A fresh key is generated if absent.
    pub validator_key_hex: Option<String>,
    /// Emit logs as JSON lines.
    pub json_logs: bool,
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            origin_ledger: LedgerId(1),
            target_ledger: LedgerId(2),
            scan_interval_ms: constants::DEFAULT_SCAN_INTERVAL_MS,
            scan_window: constants::DEFAULT_SCAN_WINDOW,
            max_concurrent_pipelines: constants::DEFAULT_MAX_CONCURRENT_PIPELINES,
            processed_cache_size: constants::DEFAULT_PROCESSED_CACHE_SIZE,
            proof_retry: RetryConfig::default(),
            mint_confirm_timeout_ms: constants::DEFAULT_MINT_CONFIRM_TIMEOUT_MS,
            validator_key_hex: None,
            json_logs: false,
        }
    }
}

impl RelayerConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    #[must_use]
    pub fn mint_confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.mint_confirm_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.origin_ledger == self.target_ledger {
            return Err(BridgeError::Configuration(format!(
                "origin and target ledger are both {}",
                self.origin_ledger
            )));
        }
        if self.scan_interval_ms == 0 {
            return Err(BridgeError::Configuration(
                "scan_interval_ms must be > 0".to_string(),
            ));
        }
        if self.scan_window == 0 {
            return Err(BridgeError::Configuration(
                "scan_window must be > 0".to_string(),
            ));
        }
        if self.max_concurrent_pipelines == 0 {
            return Err(BridgeError::Configuration(
                "max_concurrent_pipelines must be > 0".to_string(),
            ));
        }
        if self.processed_cache_size == 0 {
            return Err(BridgeError::Configuration(
                "processed_cache_size must be > 0".to_string(),
            ));
        }
        if self.proof_retry.max_attempts == 0 {
            return Err(BridgeError::Configuration(
                "proof_retry.max_attempts must be > 0".to_string(),
            ));
        }
        if let Backoff::Exponential { max_delay_ms } = self.proof_retry.backoff {
            if max_delay_ms < self.proof_retry.delay_ms {
                return Err(BridgeError::Configuration(
                    "proof_retry.backoff.max_delay_ms must be >= delay_ms".to_string(),
                ));
            }
        }
        if self.mint_confirm_timeout_ms == 0 {
            return Err(BridgeError::Configuration(
                "mint_confirm_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = RelayerConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.proof_retry.max_attempts, 5);
        assert_eq!(cfg.scan_interval(), Duration::from_secs(15));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: RelayerConfig = serde_json::from_str(
            r#"{
                "target_ledger": 9,
                "proof_retry": { "max_attempts": 3, "backoff": { "kind": "exponential", "max_delay_ms": 10000 } }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.origin_ledger, LedgerId(1));
        assert_eq!(cfg.target_ledger, LedgerId(9));
        assert_eq!(cfg.proof_retry.max_attempts, 3);
        assert_eq!(cfg.proof_retry.delay_ms, constants::DEFAULT_PROOF_RETRY_DELAY_MS);
        assert_eq!(
            cfg.proof_retry.backoff,
            Backoff::Exponential { max_delay_ms: 10_000 }
        );
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn same_origin_and_target_rejected() {
        let cfg = RelayerConfig {
            target_ledger: LedgerId(1),
            ..RelayerConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(BridgeError::Configuration(_))));
    }

    #[test]
    fn zero_attempts_rejected() {
        let mut cfg = RelayerConfig::default();
        cfg.proof_retry.max_attempts = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn backoff_cap_below_delay_rejected() {
        let mut cfg = RelayerConfig::default();
        cfg.proof_retry.backoff = Backoff::Exponential { max_delay_ms: 10 };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = RelayerConfig::load("/nonexistent/ghostbridge/relayer.json").unwrap_err();
        assert!(matches!(err, BridgeError::Io(_)));
    }
}
