//! Identifiers used throughout GhostBridge.
//!
//! Transfer ids are content-derived 32-byte hashes so any observer can
//! recompute them from public inputs. Validator and holder addresses are
//! raw ed25519 public keys, like the ledgers themselves use.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{BridgeError, Result, constants};

// ---------------------------------------------------------------------------
// GhostId
// ---------------------------------------------------------------------------

/// Unique 32-byte identifier of one cross-ledger transfer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct GhostId(pub [u8; 32]);

impl GhostId {
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for GhostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ghost:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A ledger account: raw ed25519 public key (32 bytes).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct Address(pub [u8; 32]);

impl Address {
    #[must_use]
    pub fn from_pubkey(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "addr:{}", hex::encode(&self.0[..8]))
    }
}

/// Random addresses for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Address {
    /// A fresh random address.
    #[must_use]
    pub fn random() -> Self {
        Self(rand::random::<[u8; 32]>())
    }
}

// ---------------------------------------------------------------------------
// TokenId
// ---------------------------------------------------------------------------

/// Identifier of a token (mint) on one ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TokenId(pub [u8; 32]);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// LedgerId
// ---------------------------------------------------------------------------

/// Numeric identifier of a ledger (chain id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct LedgerId(pub u64);

impl fmt::Display for LedgerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ledger:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ProofRef
// ---------------------------------------------------------------------------

/// Opaque reference to a proof held by a proof oracle, or the hash of an
/// accepted proof payload stored as stage evidence.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct ProofRef(pub [u8; 32]);

impl ProofRef {
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for ProofRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proof:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// DestinationAddress
// ---------------------------------------------------------------------------

/// Opaque destination account bytes. The destination ledger's address
/// format may differ from the source's, so no structure is assumed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>")]
pub struct DestinationAddress(Vec<u8>);

impl DestinationAddress {
    /// Wrap raw destination bytes.
    ///
    /// # Errors
    /// `InvalidTransfer` if empty or wider than
    /// [`constants::MAX_DESTINATION_ADDRESS_LEN`].
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(BridgeError::InvalidTransfer {
                reason: "missing destination address".to_string(),
            });
        }
        if bytes.len() > constants::MAX_DESTINATION_ADDRESS_LEN {
            return Err(BridgeError::InvalidTransfer {
                reason: format!(
                    "destination address is {} bytes, max {}",
                    bytes.len(),
                    constants::MAX_DESTINATION_ADDRESS_LEN
                ),
            });
        }
        Ok(Self(bytes))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Interpret the leading 32 bytes as an ed25519-style account, if present.
    #[must_use]
    pub fn leading_address(&self) -> Option<Address> {
        let head: [u8; 32] = self.0.get(..32)?.try_into().ok()?;
        Some(Address(head))
    }
}

impl TryFrom<Vec<u8>> for DestinationAddress {
    type Error = BridgeError;

    fn try_from(bytes: Vec<u8>) -> Result<Self> {
        Self::new(bytes)
    }
}

impl From<Address> for DestinationAddress {
    fn from(addr: Address) -> Self {
        Self(addr.0.to_vec())
    }
}

impl fmt::Display for DestinationAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ghost_id_display_is_prefixed_hex() {
        let id = GhostId([0xAB; 32]);
        assert_eq!(format!("{id}"), "ghost:abababababababab");
        assert_eq!(id.short(), "abababab");
    }

    #[test]
    fn random_addresses_differ() {
        assert_ne!(Address::random(), Address::random());
    }

    #[test]
    fn destination_address_rejects_empty() {
        let err = DestinationAddress::new(Vec::new()).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidTransfer { .. }));
    }

    #[test]
    fn destination_address_rejects_oversized() {
        let err = DestinationAddress::new(vec![1u8; 65]).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidTransfer { .. }));
        assert!(DestinationAddress::new(vec![1u8; 64]).is_ok());
    }

    #[test]
    fn destination_address_deserialize_is_checked() {
        assert!(serde_json::from_str::<DestinationAddress>("[]").is_err());
        let oversized = serde_json::to_string(&vec![1u8; 65]).unwrap();
        assert!(serde_json::from_str::<DestinationAddress>(&oversized).is_err());

        let addr = DestinationAddress::new(vec![7u8; 20]).unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(serde_json::from_str::<DestinationAddress>(&json).unwrap(), addr);
    }

    #[test]
    fn leading_address_needs_32_bytes() {
        let short = DestinationAddress::new(vec![9u8; 20]).unwrap();
        assert_eq!(short.leading_address(), None);

        let addr = Address([5u8; 32]);
        let wide = DestinationAddress::from(addr);
        assert_eq!(wide.leading_address(), Some(addr));
    }

    #[test]
    fn proof_ref_zero() {
        assert!(ProofRef::default().is_zero());
        assert!(!ProofRef([1u8; 32]).is_zero());
    }

    #[test]
    fn serde_roundtrips() {
        let id = GhostId([4u8; 32]);
        let json = serde_json::to_string(&id).unwrap();
        let back: GhostId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
