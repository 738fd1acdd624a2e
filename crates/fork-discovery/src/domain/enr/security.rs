//! Record keys and signatures.
//!
//! SECURITY-CRITICAL: all record verification goes through `verify_signature`.

use k256::ecdsa::signature::Verifier;
use k256::ecdsa::{Signature as EcdsaSignature, VerifyingKey};

use crate::domain::SigningError;

/// Compressed secp256k1 public key (33 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; 33]);

impl PublicKey {
    /// Create from bytes.
    pub fn new(bytes: [u8; 33]) -> Self {
        Self(bytes)
    }

    /// Get as bytes.
    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }
}

/// ECDSA signature (64 bytes: r ‖ s).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// Placeholder carried by unsigned records.
    pub fn empty() -> Self {
        Self([0u8; 64])
    }

    /// Get as bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

/// Holder of the node's private key.
///
/// Implementations may be backed by a remote key manager, so signing is
/// fallible.
pub trait RecordSigner: Send + Sync {
    /// Public key records signed by this signer carry.
    fn public_key(&self) -> PublicKey;

    /// Sign a record payload.
    fn sign(&self, payload: &[u8]) -> Result<Signature, SigningError>;
}

/// Check an ECDSA-SHA256 signature over `payload`.
///
/// Malformed keys or signatures verify as `false`.
pub fn verify_signature(pubkey: &PublicKey, payload: &[u8], signature: &Signature) -> bool {
    let Ok(key) = VerifyingKey::from_sec1_bytes(&pubkey.0) else {
        return false;
    };
    let Ok(sig) = EcdsaSignature::from_slice(&signature.0) else {
        return false;
    };
    key.verify(payload, &sig).is_ok()
}
