use std::fmt;

use serde::{Deserialize, Serialize};

use opal_types::ByteString;

/// Ed25519 signing key (private). Test and tooling helper; the validating
/// process itself never holds client keys.
pub struct SigningKey(ed25519_dalek::SigningKey);

impl SigningKey {
    /// Generate a new random signing key.
    pub fn generate() -> Self {
        let mut csprng = rand::thread_rng();
        Self(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Create from a raw 32-byte secret.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&bytes))
    }

    /// The public key bytes identifying this signer.
    pub fn public_key(&self) -> ByteString {
        ByteString::new(self.0.verifying_key().to_bytes().to_vec())
    }

    /// Sign a message and package the result as submission evidence.
    pub fn sign(&self, message: &[u8]) -> SignatureEvidence {
        use ed25519_dalek::Signer;
        let signature = self.0.sign(message);
        SignatureEvidence {
            public_key: self.public_key(),
            signature: ByteString::new(signature.to_bytes().to_vec()),
        }
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKey(<redacted>)")
    }
}

/// A (public key, signature) pair attached to a submitted mutation.
///
/// The signature is verified against the double-SHA-256 hash of the raw
/// mutation bytes. Serializes with the wire field names of the submission
/// endpoint (`pub_key` / `signature`, hex-encoded).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEvidence {
    #[serde(rename = "pub_key")]
    pub public_key: ByteString,
    pub signature: ByteString,
}

impl SignatureEvidence {
    pub fn new(public_key: ByteString, signature: ByteString) -> Self {
        Self {
            public_key,
            signature,
        }
    }

    /// Verify this evidence against a message.
    ///
    /// Malformed key or signature bytes verify `false`, never panic.
    pub fn verify(&self, message: &[u8]) -> bool {
        use ed25519_dalek::Verifier;

        let Ok(key_bytes) = <[u8; 32]>::try_from(self.public_key.as_bytes()) else {
            return false;
        };
        let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; 64]>::try_from(self.signature.as_bytes()) else {
            return false;
        };
        let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);

        key.verify(message, &signature).is_ok()
    }
}
