//! secp256k1 record signer.

use k256::ecdsa::signature::Signer;
use k256::ecdsa::{Signature as EcdsaSignature, SigningKey};

use crate::domain::{PublicKey, RecordSigner, Signature, SigningError};

/// In-process secp256k1 key used to sign the local record.
///
/// Signatures are RFC 6979 deterministic ECDSA over SHA-256.
pub struct Secp256k1Signer {
    signing_key: SigningKey,
    public_key: PublicKey,
}

impl Secp256k1Signer {
    /// Fresh random key.
    pub fn random() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self::from_signing_key(signing_key)
    }

    /// Load a key from its 32 secret bytes.
    ///
    /// # Errors
    ///
    /// `SigningError::Backend` if the bytes are not a valid scalar.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, SigningError> {
        let signing_key = SigningKey::from_bytes((&bytes).into())
            .map_err(|e| SigningError::Backend(format!("invalid secret key: {e}")))?;
        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let point = signing_key.verifying_key().to_encoded_point(true);
        let mut compressed = [0u8; 33];
        // A compressed SEC1 point is always 33 bytes.
        compressed.copy_from_slice(point.as_bytes());
        Self {
            signing_key,
            public_key: PublicKey(compressed),
        }
    }
}

impl RecordSigner for Secp256k1Signer {
    fn public_key(&self) -> PublicKey {
        self.public_key
    }

    fn sign(&self, payload: &[u8]) -> Result<Signature, SigningError> {
        let sig: EcdsaSignature = self
            .signing_key
            .try_sign(payload)
            .map_err(|e| SigningError::Backend(e.to_string()))?;
        let mut bytes = [0u8; 64];
        bytes.copy_from_slice(&sig.to_bytes());
        Ok(Signature(bytes))
    }
}

impl std::fmt::Debug for Secp256k1Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secp256k1Signer")
            .field("public_key", &hex::encode(self.public_key.0))
            .finish_non_exhaustive()
    }
}
