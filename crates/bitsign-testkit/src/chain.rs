//! Ed25519 reference keychain.
//!
//! A small signing chain for exercising the signed path end to end. The
//! chain sits at the start of the signature region, little-endian:
//!
//! ```text
//! root entry    ROOT_ENTRY_MAGIC u32 | root public key (32)
//! CSK entry     CSK_ENTRY_MAGIC u32 | CSK public key (32) | permission u32
//!   (0..n)      | cancellation ID u32 | signature (64) by the previous key
//! Block0 entry  BLOCK0_ENTRY_MAGIC u32 | signature (64) by the last key
//! ```
//!
//! Each CSK signature covers its entry up to the signature. The Block0
//! signature covers the 128-byte descriptor block. Granted permission is the
//! intersection of every CSK's permission word; a chain with no CSK entry
//! grants everything. Everything after the chain must stay zero.

use std::collections::BTreeSet;

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};

use bitsign_core::layout::{BLOCK0_ENTRY_MAGIC, CSK_ENTRY_MAGIC, ROOT_ENTRY_MAGIC};
use bitsign_core::{
    AuthError, AuthenticatedBitstream, FamilyPolicy, HashProvider, HashSize, Keychain,
    Sha2Provider, SigningChainResult, BLOCK0_SIZE,
};

/// Cancellation ID of a CSK that can never be cancelled.
pub const NO_CANCELLATION: u32 = u32::MAX;

const ROOT_ENTRY_LEN: usize = 4 + 32;
const CSK_BODY_LEN: usize = 4 + 32 + 4 + 4;
const CSK_ENTRY_LEN: usize = CSK_BODY_LEN + 64;
const BLOCK0_ENTRY_LEN: usize = 4 + 64;

/// Encoded length of a chain with `csk_entries` code signing keys.
pub const fn chain_len(csk_entries: usize) -> usize {
    ROOT_ENTRY_LEN + csk_entries * CSK_ENTRY_LEN + BLOCK0_ENTRY_LEN
}

/// A code signing key and the entry fields that go with it.
#[derive(Clone)]
struct CodeSigningKey {
    key: SigningKey,
    permission: u32,
    cancellation_id: u32,
}

impl CodeSigningKey {
    fn body(&self) -> [u8; CSK_BODY_LEN] {
        let mut body = [0u8; CSK_BODY_LEN];
        body[..4].copy_from_slice(&CSK_ENTRY_MAGIC.to_le_bytes());
        body[4..36].copy_from_slice(&self.key.verifying_key().to_bytes());
        body[36..40].copy_from_slice(&self.permission.to_le_bytes());
        body[40..44].copy_from_slice(&self.cancellation_id.to_le_bytes());
        body
    }
}

/// Builds chains from a root key through code signing keys.
#[derive(Clone)]
pub struct Ed25519ChainSigner {
    root: SigningKey,
    csks: Vec<CodeSigningKey>,
}

impl Ed25519ChainSigner {
    /// Random root key with one CSK granting `permission`.
    pub fn generate(permission: u32) -> Self {
        let mut rng = rand::thread_rng();
        let root = SigningKey::generate(&mut rng);
        let csk = SigningKey::generate(&mut rng);
        Self::from_keys(root, csk, permission)
    }

    /// Deterministic root key and CSK from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32], permission: u32) -> Self {
        let csk_seed: [u8; 32] = Sha2Provider
            .sha(seed, HashSize::Sha256)
            .try_into()
            .expect("SHA-256 digest is 32 bytes");
        Self::from_keys(
            SigningKey::from_bytes(seed),
            SigningKey::from_bytes(&csk_seed),
            permission,
        )
    }

    fn from_keys(root: SigningKey, csk: SigningKey, permission: u32) -> Self {
        Self {
            root,
            csks: vec![CodeSigningKey {
                key: csk,
                permission,
                cancellation_id: 0,
            }],
        }
    }

    /// Give the last CSK a different cancellation ID.
    pub fn with_cancellation_id(mut self, cancellation_id: u32) -> Self {
        if let Some(csk) = self.csks.last_mut() {
            csk.cancellation_id = cancellation_id;
        }
        self
    }

    /// Append another CSK under the current last one.
    pub fn with_extra_csk(mut self, seed: &[u8; 32], permission: u32) -> Self {
        self.csks.push(CodeSigningKey {
            key: SigningKey::from_bytes(seed),
            permission,
            cancellation_id: 0,
        });
        self
    }

    /// Sign Block0 with the root key directly, without any CSK.
    pub fn without_csk(mut self) -> Self {
        self.csks.clear();
        self
    }

    pub fn root_public_key(&self) -> [u8; 32] {
        self.root.verifying_key().to_bytes()
    }

    /// Permission the chain grants: every CSK's bits intersected.
    pub fn permission(&self) -> u32 {
        self.csks
            .iter()
            .fold(u32::MAX, |granted, csk| granted & csk.permission)
    }

    /// A keychain that trusts this signer's root key under `policy`.
    pub fn keychain(&self, policy: &FamilyPolicy) -> Ed25519Keychain {
        Ed25519Keychain {
            root: self.root.verifying_key(),
            policy: policy.clone(),
            cancelled: BTreeSet::new(),
        }
    }

    /// Encode a chain over `block0`.
    pub fn sign_block0(&self, block0: &[u8; BLOCK0_SIZE]) -> Vec<u8> {
        let mut chain = Vec::with_capacity(chain_len(self.csks.len()));
        chain.extend_from_slice(&ROOT_ENTRY_MAGIC.to_le_bytes());
        chain.extend_from_slice(&self.root_public_key());

        let mut signer = &self.root;
        for csk in &self.csks {
            let body = csk.body();
            chain.extend_from_slice(&body);
            chain.extend_from_slice(&signer.sign(&body).to_bytes());
            signer = &csk.key;
        }

        chain.extend_from_slice(&BLOCK0_ENTRY_MAGIC.to_le_bytes());
        chain.extend_from_slice(&signer.sign(block0).to_bytes());
        chain
    }

    /// Encode a chain over the Block0 of an existing bitstream.
    pub fn sign(&self, bitstream: &AuthenticatedBitstream) -> bitsign_core::Result<Vec<u8>> {
        let descriptor = bitstream.descriptor()?;
        Ok(self.sign_block0(descriptor.as_bytes()))
    }
}

impl std::fmt::Debug for Ed25519ChainSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Ed25519ChainSigner({}, csks={}, permission=0x{:X})",
            &hex::encode(self.root_public_key())[..16],
            self.csks.len(),
            self.permission()
        )
    }
}

/// Validates chains rooted in one trusted Ed25519 key, under a family's
/// chain-length bounds and cancellation IDs.
#[derive(Debug, Clone)]
pub struct Ed25519Keychain {
    root: VerifyingKey,
    policy: FamilyPolicy,
    cancelled: BTreeSet<u32>,
}

impl Ed25519Keychain {
    /// Trust `root_public_key` for bitstreams of `policy`'s family.
    pub fn new(root_public_key: &[u8; 32], policy: &FamilyPolicy) -> bitsign_core::Result<Self> {
        let root = VerifyingKey::from_bytes(root_public_key).map_err(|_| {
            AuthError::InvalidConfiguration("root key is not a valid Ed25519 public key".into())
        })?;
        Ok(Self {
            root,
            policy: policy.clone(),
            cancelled: BTreeSet::new(),
        })
    }

    /// Revoke every CSK carrying `cancellation_id`.
    ///
    /// Fails if the family does not accept that ID.
    pub fn cancel(&mut self, cancellation_id: u32) -> bitsign_core::Result<()> {
        if !self.policy.supports_cancellation(cancellation_id) {
            return Err(AuthError::InvalidConfiguration(format!(
                "family {} does not support cancellation ID {cancellation_id}",
                self.policy.id()
            )));
        }
        self.cancelled.insert(cancellation_id);
        Ok(())
    }

    /// Fuse info reported for chains rooted in this key.
    pub fn fuse_info(&self) -> String {
        let hash = Sha2Provider.sha(self.root.as_bytes(), HashSize::Sha256);
        format!("root key hash: {}", hex::encode(hash))
    }

    /// Granted permission, or `None` if the chain does not validate.
    fn check(&self, region: &[u8], block0: &[u8; BLOCK0_SIZE]) -> Option<u32> {
        let mut reader = Reader { data: region };

        if reader.u32()? != ROOT_ENTRY_MAGIC || reader.take(32)? != self.root.as_bytes() {
            tracing::debug!("chain is not rooted in the trusted key");
            return None;
        }

        let mut signer = self.root;
        let mut granted = u32::MAX;
        let mut entries = 0u32;
        while reader.peek_u32()? == CSK_ENTRY_MAGIC {
            let body = reader.take(CSK_BODY_LEN)?;
            verify(&signer, body, reader.take(64)?)?;

            let key: [u8; 32] = body[4..36].try_into().ok()?;
            let permission = read_u32(body, 36)?;
            let cancellation_id = read_u32(body, 40)?;
            if !self.accepts_cancellation_id(cancellation_id) {
                return None;
            }

            signer = VerifyingKey::from_bytes(&key).ok()?;
            granted &= permission;
            entries += 1;
        }

        if !self.policy.accepts_chain_len(entries) {
            tracing::debug!(entries, family = self.policy.id(), "CSK entry count out of bounds");
            return None;
        }

        if reader.u32()? != BLOCK0_ENTRY_MAGIC {
            return None;
        }
        verify(&signer, block0, reader.take(64)?)?;

        if reader.data.iter().any(|&b| b != 0) {
            return None;
        }
        Some(granted)
    }

    fn accepts_cancellation_id(&self, id: u32) -> bool {
        if id == NO_CANCELLATION {
            return true;
        }
        if !self.policy.supports_cancellation(id) {
            tracing::debug!(id, family = self.policy.id(), "cancellation ID not supported");
            return false;
        }
        if self.cancelled.contains(&id) {
            tracing::debug!(id, "code signing key is cancelled");
            return false;
        }
        true
    }
}

impl Keychain for Ed25519Keychain {
    fn validate(
        &self,
        signature_region: &[u8],
        block0: &[u8; BLOCK0_SIZE],
    ) -> bitsign_core::Result<SigningChainResult> {
        Ok(match self.check(signature_region, block0) {
            Some(granted_permission) => SigningChainResult {
                complete: true,
                granted_permission,
                fuse_info: self.fuse_info(),
            },
            None => SigningChainResult {
                complete: false,
                granted_permission: 0,
                fuse_info: String::new(),
            },
        })
    }
}

struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.data.len() < n {
            return None;
        }
        let (head, rest) = self.data.split_at(n);
        self.data = rest;
        Some(head)
    }

    fn u32(&mut self) -> Option<u32> {
        read_u32(self.take(4)?, 0)
    }

    fn peek_u32(&self) -> Option<u32> {
        read_u32(self.data, 0)
    }
}

fn verify(key: &VerifyingKey, message: &[u8], signature: &[u8]) -> Option<()> {
    let signature: [u8; 64] = signature.try_into().ok()?;
    key.verify_strict(message, &Signature::from_bytes(&signature))
        .ok()
}

fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes: [u8; 4] = data.get(offset..offset + 4)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitsign_core::{FamilyPolicySpec, FamilyRegistry, FamilyKind, PAC_CARD};

    fn pac_card() -> FamilyPolicy {
        FamilyRegistry::builtin()
            .unwrap()
            .lookup(PAC_CARD)
            .unwrap()
            .clone()
    }

    fn region_with(chain: &[u8]) -> Vec<u8> {
        let mut region = vec![0u8; 880];
        region[..chain.len()].copy_from_slice(chain);
        region
    }

    fn validate(signer: &Ed25519ChainSigner, keychain: &Ed25519Keychain) -> SigningChainResult {
        let block0 = [0x33; BLOCK0_SIZE];
        keychain
            .validate(&region_with(&signer.sign_block0(&block0)), &block0)
            .unwrap()
    }

    #[test]
    fn test_chain_validates() {
        let signer = Ed25519ChainSigner::from_seed(&[7; 32], 0x4);
        let block0 = [0x33; BLOCK0_SIZE];
        let chain = signer.sign_block0(&block0);
        assert_eq!(chain.len(), chain_len(1));

        let result = validate(&signer, &signer.keychain(&pac_card()));
        assert!(result.complete);
        assert_eq!(result.granted_permission, 0x4);
        assert!(result.fuse_info.starts_with("root key hash: "));
    }

    #[test]
    fn test_other_block0_rejected() {
        let signer = Ed25519ChainSigner::from_seed(&[7; 32], 0x1);
        let chain = signer.sign_block0(&[0x33; BLOCK0_SIZE]);

        let result = signer
            .keychain(&pac_card())
            .validate(&region_with(&chain), &[0x34; BLOCK0_SIZE])
            .unwrap();
        assert!(!result.complete);
    }

    #[test]
    fn test_untrusted_root_rejected() {
        let signer = Ed25519ChainSigner::from_seed(&[7; 32], 0x1);
        let other = Ed25519ChainSigner::from_seed(&[8; 32], 0x1);
        assert!(!validate(&signer, &other.keychain(&pac_card())).complete);
    }

    #[test]
    fn test_raised_permission_rejected() {
        let signer = Ed25519ChainSigner::from_seed(&[7; 32], 0x1);
        let block0 = [0x33; BLOCK0_SIZE];
        let mut chain = signer.sign_block0(&block0);
        let offset = ROOT_ENTRY_LEN + 36;
        chain[offset..offset + 4].copy_from_slice(&0x7u32.to_le_bytes());

        let result = signer
            .keychain(&pac_card())
            .validate(&region_with(&chain), &block0)
            .unwrap();
        assert!(!result.complete);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let signer = Ed25519ChainSigner::from_seed(&[7; 32], 0x1);
        let block0 = [0x33; BLOCK0_SIZE];
        let mut region = region_with(&signer.sign_block0(&block0));
        region[879] = 1;

        let result = signer.keychain(&pac_card()).validate(&region, &block0).unwrap();
        assert!(!result.complete);
    }

    #[test]
    fn test_chain_len_follows_policy() {
        let keychain = Ed25519ChainSigner::from_seed(&[7; 32], 0x1).keychain(&pac_card());

        // PAC_CARD takes exactly one CSK entry.
        let none = Ed25519ChainSigner::from_seed(&[7; 32], 0x1).without_csk();
        assert!(!validate(&none, &keychain).complete);

        let two = Ed25519ChainSigner::from_seed(&[7; 32], 0x3).with_extra_csk(&[9; 32], 0x1);
        assert_eq!(two.permission(), 0x1);
        assert!(!validate(&two, &keychain).complete);

        let relaxed = FamilyPolicy::from_spec(FamilyPolicySpec {
            id: "RELAXED".into(),
            content_types: None,
            min_chain_entries: 0,
            max_chain_entries: 2,
            signature_max_size: 880,
            cancellation_ids: None,
            extension: FamilyKind::PacCard,
        })
        .unwrap();
        let keychain = none.keychain(&relaxed);
        let result = validate(&none, &keychain);
        assert!(result.complete);
        assert_eq!(result.granted_permission, u32::MAX);
    }

    #[test]
    fn test_cancellation_ids_follow_policy() {
        let signer = Ed25519ChainSigner::from_seed(&[7; 32], 0x1).with_cancellation_id(5);
        let mut keychain = signer.keychain(&pac_card());
        assert!(validate(&signer, &keychain).complete);

        keychain.cancel(5).unwrap();
        assert!(!validate(&signer, &keychain).complete);

        assert!(keychain.cancel(128).is_err());
        let out_of_range = Ed25519ChainSigner::from_seed(&[7; 32], 0x1).with_cancellation_id(128);
        assert!(!validate(&out_of_range, &keychain).complete);

        let uncancellable =
            Ed25519ChainSigner::from_seed(&[7; 32], 0x1).with_cancellation_id(NO_CANCELLATION);
        assert!(validate(&uncancellable, &keychain).complete);
    }

    #[test]
    fn test_keychain_from_public_key() {
        let signer = Ed25519ChainSigner::generate(0x2);
        let policy = pac_card();
        let keychain = Ed25519Keychain::new(&signer.root_public_key(), &policy).unwrap();
        assert_eq!(keychain.fuse_info(), signer.keychain(&policy).fuse_info());
        assert!(validate(&signer, &keychain).complete);
    }
}
