//! Test fixtures and helpers.
//!
//! Common setup code for unit and integration tests.

use std::cell::{Cell, RefCell};

use bitsign_core::{
    generate, AuthenticatedBitstream, FamilyPolicy, FamilyRegistry, Keychain, Sha2Provider,
    SigningChainResult, BLOCK0_SIZE, PAC_CARD,
};

/// Built-in registry with the `PAC_CARD` policy selected.
pub struct TestFixture {
    pub registry: FamilyRegistry,
    pub policy: FamilyPolicy,
    pub hasher: Sha2Provider,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::for_family(PAC_CARD)
    }

    /// Select a built-in family by id.
    pub fn for_family(family: &str) -> Self {
        let registry = FamilyRegistry::builtin().expect("built-in families are valid");
        let policy = registry
            .lookup(family)
            .expect("family is built in")
            .clone();
        Self {
            registry,
            policy,
            hasher: Sha2Provider,
        }
    }

    /// Frame `payload` as an unsigned bitstream.
    pub fn unsigned(&self, payload: &[u8], content_type: Option<&str>) -> AuthenticatedBitstream {
        generate(payload, content_type, &self.policy, &self.hasher)
            .expect("payload is framable")
    }

    /// Unsigned bitstream around `blocks` 128-byte blocks of `fill`.
    pub fn unsigned_filled(
        &self,
        fill: u8,
        blocks: usize,
        content_type: Option<&str>,
    ) -> AuthenticatedBitstream {
        self.unsigned(&block_payload(fill, blocks), content_type)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// `blocks` 128-byte blocks of `fill`.
pub fn block_payload(fill: u8, blocks: usize) -> Vec<u8> {
    vec![fill; blocks * 128]
}

/// Arguments a [`ScriptedKeychain`] was called with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub signature_region: Vec<u8>,
    pub block0: Vec<u8>,
}

/// Keychain that returns a fixed result and records every call.
pub struct ScriptedKeychain {
    result: SigningChainResult,
    calls: RefCell<Vec<RecordedCall>>,
    call_count: Cell<usize>,
}

impl ScriptedKeychain {
    pub fn new(result: SigningChainResult) -> Self {
        Self {
            result,
            calls: RefCell::new(Vec::new()),
            call_count: Cell::new(0),
        }
    }

    /// A complete chain granting `granted_permission`.
    pub fn granting(granted_permission: u32) -> Self {
        Self::new(SigningChainResult {
            complete: true,
            granted_permission,
            fuse_info: "root key hash: scripted".to_string(),
        })
    }

    /// A chain that never validates.
    pub fn incomplete() -> Self {
        Self::new(SigningChainResult {
            complete: false,
            granted_permission: 0,
            fuse_info: String::new(),
        })
    }

    pub fn call_count(&self) -> usize {
        self.call_count.get()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }
}

impl Keychain for ScriptedKeychain {
    fn validate(
        &self,
        signature_region: &[u8],
        block0: &[u8; BLOCK0_SIZE],
    ) -> bitsign_core::Result<SigningChainResult> {
        self.call_count.set(self.call_count.get() + 1);
        self.calls.borrow_mut().push(RecordedCall {
            signature_region: signature_region.to_vec(),
            block0: block0.to_vec(),
        });
        Ok(self.result.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitsign_core::{verify, SignatureStatus, HEADER_SIZE};

    #[test]
    fn test_fixture_unsigned() {
        let fixture = TestFixture::new();
        let bitstream = fixture.unsigned_filled(0x41, 1, Some("BBS"));
        assert_eq!(bitstream.len(), HEADER_SIZE + 128);

        let keychain = ScriptedKeychain::incomplete();
        let report = verify(
            bitstream.as_bytes(),
            false,
            &fixture.policy,
            &fixture.hasher,
            &keychain,
        )
        .unwrap();
        assert_eq!(report.status, SignatureStatus::Unsigned);
        assert_eq!(keychain.call_count(), 0);
    }

    #[test]
    fn test_scripted_keychain_records_calls() {
        let keychain = ScriptedKeychain::granting(1);
        let result = keychain.validate(&[1, 2, 3], &[0x55; BLOCK0_SIZE]).unwrap();

        assert!(result.complete);
        assert_eq!(keychain.call_count(), 1);
        let calls = keychain.calls();
        assert_eq!(calls[0].signature_region, vec![1, 2, 3]);
        assert_eq!(calls[0].block0, vec![0x55; BLOCK0_SIZE]);
    }
}
