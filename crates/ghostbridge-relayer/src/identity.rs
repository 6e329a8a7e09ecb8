//! Relayer validator identity.
//!
//! Validator addresses are raw ed25519 public keys. The relayer holds the
//! signing key and votes / binds proofs as the matching address.

use ed25519_dalek::{SigningKey, VerifyingKey};
use ghostbridge_types::{Address, BridgeError, Result};
use rand::rngs::OsRng;

pub struct RelayerIdentity {
    signing: SigningKey,
}

impl RelayerIdentity {
    /// Fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    /// Key from a hex-encoded 32-byte seed (optional `0x` prefix).
    pub fn from_hex_seed(seed: &str) -> Result<Self> {
        let bytes = hex::decode(seed.trim().trim_start_matches("0x"))
            .map_err(|err| BridgeError::Configuration(format!("invalid validator key encoding: {err}")))?;
        let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            BridgeError::Configuration(format!(
                "validator key must be 32 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self {
            signing: SigningKey::from_bytes(&seed),
        })
    }

    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }

    /// On-ledger validator address.
    #[must_use]
    pub fn address(&self) -> Address {
        Address::from_pubkey(self.verifying_key().to_bytes())
    }

    /// Hex seed, for writing back into a config file.
    #[must_use]
    pub fn seed_hex(&self) -> String {
        hex::encode(self.signing.to_bytes())
    }
}

impl std::fmt::Debug for RelayerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayerIdentity")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
