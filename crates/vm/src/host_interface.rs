use std::fmt::Debug;
use std::sync::Arc;

use k256::ecdsa::{signature::hazmat::PrehashVerifier, Signature, VerifyingKey};
use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use state::Blockchain;
use storage::Store;
use types::{UInt160, UInt256};

use crate::interop::InteropRegistry;

/// Hash and signature primitives used by the crypto opcodes and by
/// `CheckWitness`. Implementations must be pure functions of their input.
pub trait Crypto: Debug + Send + Sync {
    fn sha1(&self, data: &[u8]) -> [u8; 20];

    fn sha256(&self, data: &[u8]) -> [u8; 32];

    /// RIPEMD-160 of SHA-256; the script-hash function.
    fn hash160(&self, data: &[u8]) -> UInt160;

    /// Double SHA-256.
    fn hash256(&self, data: &[u8]) -> UInt256;

    /// `false` for malformed keys or signatures as well as for mismatches.
    fn verify_signature(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool;
}

/// RustCrypto-backed primitives. Signatures are 64-byte `r || s` ECDSA over
/// secp256k1, checked against the SHA-256 digest of the message.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCrypto;

impl Crypto for DefaultCrypto {
    fn sha1(&self, data: &[u8]) -> [u8; 20] {
        Sha1::digest(data).into()
    }

    fn sha256(&self, data: &[u8]) -> [u8; 32] {
        Sha256::digest(data).into()
    }

    fn hash160(&self, data: &[u8]) -> UInt160 {
        let inner = Sha256::digest(data);
        UInt160(Ripemd160::digest(inner).into())
    }

    fn hash256(&self, data: &[u8]) -> UInt256 {
        let inner = Sha256::digest(data);
        UInt256(Sha256::digest(inner).into())
    }

    fn verify_signature(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_sec1_bytes(public_key) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        let digest = self.sha256(message);
        verifying_key.verify_prehash(&digest, &signature).is_ok()
    }
}

/// The collaborators an engine talks to, bundled so one set can be handed to
/// every engine validating the same block.
#[derive(Debug, Clone)]
pub struct Host {
    pub blockchain: Arc<dyn Blockchain>,
    pub store: Arc<dyn Store>,
    pub crypto: Arc<dyn Crypto>,
    pub interop: Arc<InteropRegistry>,
}

impl Host {
    /// Default crypto and the standard interop table.
    pub fn new(blockchain: Arc<dyn Blockchain>, store: Arc<dyn Store>) -> Self {
        Self {
            blockchain,
            store,
            crypto: Arc::new(DefaultCrypto),
            interop: Arc::new(InteropRegistry::standard()),
        }
    }

    pub fn with_crypto(mut self, crypto: Arc<dyn Crypto>) -> Self {
        self.crypto = crypto;
        self
    }
}
