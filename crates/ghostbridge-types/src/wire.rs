//! Cross-ledger mirror instruction codec.
//!
//! The destination program decodes this positionally, so the layout is
//! frozen. Schema changes get a new discriminant, never a new layout.
//!
//! ```text
//! offset  len  field
//!      0    1  discriminant (0x05)
//!      1   32  transfer id
//!     33    8  source ledger id   (little-endian u64)
//!     41    8  amount             (little-endian u64)
//!     49   32  burn-proof reference
//!     81   32  source token
//!    113   32  destination token
//!    145       end
//! ```

use crate::{BridgeError, GhostId, LedgerId, MirrorRequest, ProofRef, Result, TokenId};

/// Discriminant of the mirror operation in the destination program's
/// instruction set.
pub const MIRROR_DISCRIMINANT: u8 = 0x05;

const OFF_GHOST_ID: usize = 1;
const OFF_SOURCE_LEDGER: usize = 33;
const OFF_AMOUNT: usize = 41;
const OFF_BURN_PROOF: usize = 49;
const OFF_SOURCE_TOKEN: usize = 81;
const OFF_DEST_TOKEN: usize = 113;

/// Encoded size of a [`MirrorInstruction`].
pub const MIRROR_INSTRUCTION_LEN: usize = 145;

/// "Materialize this burned transfer on your ledger."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorInstruction {
    pub ghost_id: GhostId,
    pub source_ledger: LedgerId,
    pub amount: u64,
    pub burn_proof: ProofRef,
    pub source_token: TokenId,
    pub dest_token: TokenId,
}

impl MirrorInstruction {
    #[must_use]
    pub fn encode(&self) -> [u8; MIRROR_INSTRUCTION_LEN] {
        let mut out = [0u8; MIRROR_INSTRUCTION_LEN];
        out[0] = MIRROR_DISCRIMINANT;
        out[OFF_GHOST_ID..OFF_SOURCE_LEDGER].copy_from_slice(&self.ghost_id.0);
        out[OFF_SOURCE_LEDGER..OFF_AMOUNT].copy_from_slice(&self.source_ledger.0.to_le_bytes());
        out[OFF_AMOUNT..OFF_BURN_PROOF].copy_from_slice(&self.amount.to_le_bytes());
        out[OFF_BURN_PROOF..OFF_SOURCE_TOKEN].copy_from_slice(&self.burn_proof.0);
        out[OFF_SOURCE_TOKEN..OFF_DEST_TOKEN].copy_from_slice(&self.source_token.0);
        out[OFF_DEST_TOKEN..].copy_from_slice(&self.dest_token.0);
        out
    }

    /// # Errors
    /// - `MalformedInstruction` if `bytes` is not exactly 145 bytes
    /// - `UnknownDiscriminant` if the leading byte is not the mirror tag
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let Some(&tag) = bytes.first() else {
            return Err(BridgeError::MalformedInstruction {
                expected: MIRROR_INSTRUCTION_LEN,
                actual: 0,
            });
        };
        if tag != MIRROR_DISCRIMINANT {
            return Err(BridgeError::UnknownDiscriminant(tag));
        }
        if bytes.len() != MIRROR_INSTRUCTION_LEN {
            return Err(BridgeError::MalformedInstruction {
                expected: MIRROR_INSTRUCTION_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            ghost_id: GhostId(array32(&bytes[OFF_GHOST_ID..OFF_SOURCE_LEDGER])),
            source_ledger: LedgerId(u64_le(&bytes[OFF_SOURCE_LEDGER..OFF_AMOUNT])),
            amount: u64_le(&bytes[OFF_AMOUNT..OFF_BURN_PROOF]),
            burn_proof: ProofRef(array32(&bytes[OFF_BURN_PROOF..OFF_SOURCE_TOKEN])),
            source_token: TokenId(array32(&bytes[OFF_SOURCE_TOKEN..OFF_DEST_TOKEN])),
            dest_token: TokenId(array32(&bytes[OFF_DEST_TOKEN..])),
        })
    }

    /// Build the typed mirror request this instruction asks `dest_ledger` to run.
    ///
    /// The wire layout carries neither the destination ledger (it is implied
    /// by who decodes it) nor the origin burn time.
    #[must_use]
    pub fn into_request(self, dest_ledger: LedgerId) -> MirrorRequest {
        MirrorRequest {
            ghost_id: self.ghost_id,
            source_token: self.source_token,
            dest_token: self.dest_token,
            source_ledger: self.source_ledger,
            dest_ledger,
            dest_address: None,
            amount: self.amount,
            burn_proof: self.burn_proof,
            burned_at_on_origin: None,
        }
    }
}

fn array32(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(bytes);
    out
}

fn u64_le(bytes: &[u8]) -> u64 {
    let mut out = [0u8; 8];
    out.copy_from_slice(bytes);
    u64::from_le_bytes(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MirrorInstruction {
        MirrorInstruction {
            ghost_id: GhostId([0x11; 32]),
            source_ledger: LedgerId(0x0102_0304_0506_0708),
            amount: 100,
            burn_proof: ProofRef([0x22; 32]),
            source_token: TokenId([0x33; 32]),
            dest_token: TokenId([0x44; 32]),
        }
    }

    #[test]
    fn field_offsets_are_fixed() {
        let bytes = sample().encode();
        assert_eq!(bytes.len(), 145);
        assert_eq!(bytes[0], 0x05);
        assert_eq!(&bytes[1..33], &[0x11; 32]);
        // Little-endian: least significant byte first.
        assert_eq!(&bytes[33..41], &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(&bytes[41..49], &100u64.to_le_bytes());
        assert_eq!(&bytes[49..81], &[0x22; 32]);
        assert_eq!(&bytes[81..113], &[0x33; 32]);
        assert_eq!(&bytes[113..145], &[0x44; 32]);
    }

    #[test]
    fn decode_reads_what_encode_wrote() {
        let ix = sample();
        assert_eq!(MirrorInstruction::decode(&ix.encode()).unwrap(), ix);
    }

    #[test]
    fn unknown_discriminant_rejected() {
        let mut bytes = sample().encode();
        bytes[0] = 0x06;
        assert_eq!(
            MirrorInstruction::decode(&bytes),
            Err(BridgeError::UnknownDiscriminant(0x06))
        );
    }

    #[test]
    fn truncated_rejected() {
        let bytes = sample().encode();
        let err = MirrorInstruction::decode(&bytes[..144]).unwrap_err();
        assert_eq!(
            err,
            BridgeError::MalformedInstruction {
                expected: 145,
                actual: 144
            }
        );
        assert!(matches!(
            MirrorInstruction::decode(&[]),
            Err(BridgeError::MalformedInstruction { actual: 0, .. })
        ));
    }

    #[test]
    fn into_request_targets_decoder() {
        let req = sample().into_request(LedgerId(42));
        assert_eq!(req.dest_ledger, LedgerId(42));
        assert_eq!(req.amount, 100);
        assert!(req.dest_address.is_none());
        assert!(req.burned_at_on_origin.is_none());
    }
}
