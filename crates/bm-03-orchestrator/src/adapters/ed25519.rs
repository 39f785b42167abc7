//! # Ed25519 Signing Service
//!
//! One Ed25519 key per [`KeyPurpose`]. Messages are prefixed with the purpose
//! label before signing, so a signature made for gossip never verifies as a
//! block-graph signature and vice versa.
//!
//! The signer also carries the author registry: the block-graph public key of
//! every cluster member. With an empty registry any key is accepted.

use crate::error::SignerError;
use crate::ports::outbound::{Signature, SigningService};
use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use shared_types::{KeyPurpose, NodeId};
use std::collections::HashMap;
use zeroize::Zeroize;

/// Ed25519 signer holding one key per purpose.
pub struct Ed25519Signer {
    keys: HashMap<KeyPurpose, SigningKey>,
    authors: HashMap<NodeId, [u8; 32]>,
}

impl Ed25519Signer {
    /// Signer without keys. Add them with [`with_key`](Self::with_key).
    pub fn empty() -> Self {
        Self {
            keys: HashMap::new(),
            authors: HashMap::new(),
        }
    }

    /// Same secret seed for every purpose.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self::empty()
            .with_key(KeyPurpose::BlockGraph, seed)
            .with_key(KeyPurpose::Gossip, seed)
    }

    /// Random keys for every purpose.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let keys = [KeyPurpose::BlockGraph, KeyPurpose::Gossip]
            .into_iter()
            .map(|purpose| (purpose, SigningKey::generate(&mut rng)))
            .collect();
        Self {
            keys,
            authors: HashMap::new(),
        }
    }

    /// `SigningKey` wipes itself on drop; the seed copy is wiped here.
    pub fn with_key(mut self, purpose: KeyPurpose, mut seed: [u8; 32]) -> Self {
        self.keys.insert(purpose, SigningKey::from_bytes(&seed));
        seed.zeroize();
        self
    }

    /// Register the block-graph public key `author` signs with.
    pub fn with_author(mut self, author: NodeId, public_key: [u8; 32]) -> Self {
        self.authors.insert(author, public_key);
        self
    }

    pub fn public_key(&self, purpose: KeyPurpose) -> Option<[u8; 32]> {
        self.keys
            .get(&purpose)
            .map(|key| key.verifying_key().to_bytes())
    }
}

fn domain_separated(message: &[u8], purpose: KeyPurpose) -> Vec<u8> {
    let label = purpose.label().as_bytes();
    let mut bytes = Vec::with_capacity(label.len() + 1 + message.len());
    bytes.extend_from_slice(label);
    bytes.push(0);
    bytes.extend_from_slice(message);
    bytes
}

#[async_trait]
impl SigningService for Ed25519Signer {
    async fn sign(&self, message: &[u8], purpose: KeyPurpose) -> Result<Signature, SignerError> {
        let key = self
            .keys
            .get(&purpose)
            .ok_or(SignerError::KeyUnavailable(purpose))?;
        let signature = key.sign(&domain_separated(message, purpose));
        Ok(Signature {
            public_key: key.verifying_key().to_bytes().to_vec(),
            signature: signature.to_bytes().to_vec(),
        })
    }

    fn verify(
        &self,
        message: &[u8],
        public_key: &[u8],
        signature: &[u8],
        purpose: KeyPurpose,
    ) -> bool {
        let Ok(public_key) = <[u8; 32]>::try_from(public_key) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key) else {
            return false;
        };
        let Ok(signature) = ed25519_dalek::Signature::from_slice(signature) else {
            return false;
        };
        verifying_key
            .verify(&domain_separated(message, purpose), &signature)
            .is_ok()
    }

    fn authorizes(&self, author: &NodeId, public_key: &[u8]) -> bool {
        if self.authors.is_empty() {
            return true;
        }
        self.authors
            .get(author)
            .is_some_and(|known| known.as_slice() == public_key)
    }
}
