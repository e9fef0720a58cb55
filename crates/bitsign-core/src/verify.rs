//! Verification Engine: check an existing authenticated bitstream.
//!
//! Checks run in a fixed order and the first failure is returned:
//!
//! 1. length is above 1024 and a multiple of 128
//! 2. Block0 magic
//! 3. declared payload size equals the trailing payload length
//! 4. content type byte resolves under the family policy
//! 5. SHA-256 and SHA-384 of the payload match the header
//! 6. Block1 magic
//! 7. signature region: all zero means unsigned, anything else goes to the
//!    keychain and then the permission gate
//! 8. family extension checks (reserved ranges)

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::buffer::SecureBuffer;
use crate::error::{AuthError, Result};
use crate::extension::FamilyExtension;
use crate::framing::AuthenticatedBitstream;
use crate::hash::{digest, HashProvider, HashSize};
use crate::keychain::Keychain;
use crate::layout::{
    DescriptorBlock, SignatureBlock, BLOCK0_MAGIC, BLOCK1_MAGIC, BLOCK_ALIGN, HEADER_SIZE,
};
use crate::permission::is_permitted;
use crate::policy::FamilyPolicy;

/// Whether a verified bitstream carried a signing chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    /// Signature region is all zero; only integrity was checked.
    Unsigned,
    /// A complete, permitted signing chain was found.
    Signed,
}

impl fmt::Display for SignatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureStatus::Unsigned => f.write_str("unsigned, integrity verified"),
            SignatureStatus::Signed => {
                f.write_str("signed, integrity and authenticity verified")
            }
        }
    }
}

/// Successful verification outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub family: String,
    /// Resolved content type, `None` for typeless families.
    pub content_type: Option<String>,
    pub payload_size: u32,
    pub status: SignatureStatus,
    /// Present only when signed.
    pub fuse_info: Option<String>,
}

impl VerificationReport {
    pub fn is_signed(&self) -> bool {
        self.status == SignatureStatus::Signed
    }
}

/// Verify a full bitstream (header followed by payload).
///
/// `might_be_signed` only changes what is logged when the signature region
/// is all zero; signed and unsigned are told apart by a full-region zero
/// check either way.
pub fn verify<H, K>(
    bitstream: &[u8],
    might_be_signed: bool,
    policy: &FamilyPolicy,
    hasher: &H,
    keychain: &K,
) -> Result<VerificationReport>
where
    H: HashProvider + ?Sized,
    K: Keychain + ?Sized,
{
    let result = verify_inner(bitstream, might_be_signed, policy, hasher, keychain);
    if let Err(e) = &result {
        warn!(family = policy.id(), error = %e, "bitstream rejected");
    }
    result
}

/// Verify `data` and take ownership of it as an [`AuthenticatedBitstream`].
///
/// On failure the buffer is dropped, and wiped, before the error returns.
pub fn open<H, K>(
    data: SecureBuffer,
    might_be_signed: bool,
    policy: &FamilyPolicy,
    hasher: &H,
    keychain: &K,
) -> Result<(AuthenticatedBitstream, VerificationReport)>
where
    H: HashProvider + ?Sized,
    K: Keychain + ?Sized,
{
    let report = verify(&data, might_be_signed, policy, hasher, keychain)?;
    Ok((AuthenticatedBitstream::from_verified(data), report))
}

fn verify_inner<H, K>(
    bitstream: &[u8],
    might_be_signed: bool,
    policy: &FamilyPolicy,
    hasher: &H,
    keychain: &K,
) -> Result<VerificationReport>
where
    H: HashProvider + ?Sized,
    K: Keychain + ?Sized,
{
    // 1. Overall shape
    if bitstream.len() <= HEADER_SIZE || bitstream.len() % BLOCK_ALIGN != 0 {
        return Err(AuthError::MalformedHeader(format!(
            "data size must be more than {HEADER_SIZE} bytes and a multiple of {BLOCK_ALIGN} bytes, but found {} bytes",
            bitstream.len()
        )));
    }
    let (header, payload) = bitstream.split_at(HEADER_SIZE);
    let header: &[u8; HEADER_SIZE] = header
        .try_into()
        .map_err(|_| AuthError::MalformedHeader("truncated header".into()))?;

    let content_type = verify_descriptor_block(header, payload, policy, hasher)?;
    let (status, fuse_info) = verify_signature_block(
        header,
        might_be_signed,
        content_type.as_deref(),
        policy,
        keychain,
    )?;

    // 8. Family-specific reserved fields
    policy.extension().on_verify(header)?;
    debug!("family extension checks passed");

    Ok(VerificationReport {
        family: policy.id().to_string(),
        content_type,
        payload_size: payload.len() as u32,
        status,
        fuse_info,
    })
}

/// Steps 2-5. Returns the resolved content type name.
fn verify_descriptor_block<H: HashProvider + ?Sized>(
    header: &[u8; HEADER_SIZE],
    payload: &[u8],
    policy: &FamilyPolicy,
    hasher: &H,
) -> Result<Option<String>> {
    let block0 = DescriptorBlock::parse(header)?;

    if block0.magic() != BLOCK0_MAGIC {
        return Err(AuthError::MalformedHeader(format!(
            "Block0 magic num should be 0x{BLOCK0_MAGIC:08X}, but found 0x{:08X}",
            block0.magic()
        )));
    }

    if block0.payload_size() as usize != payload.len() {
        return Err(AuthError::MalformedHeader(format!(
            "content size should be {} bytes, but found {} bytes in file",
            payload.len(),
            block0.payload_size()
        )));
    }

    let code = block0.type_code();
    let content_type = if policy.is_typed() {
        let name = policy.type_name_for_enum(code).ok_or_else(|| {
            AuthError::UnsupportedType(format!(
                "type enum {code} is not supported by family {}",
                policy.id()
            ))
        })?;
        Some(name.to_string())
    } else {
        if code != 0 {
            return Err(AuthError::UnsupportedType(format!(
                "family {} does not support content types, type byte should be 0x00, but found 0x{code:02X}",
                policy.id()
            )));
        }
        None
    };
    debug!(content_type = ?content_type, "descriptor block header fields valid");

    check_digest(hasher, payload, block0.sha256(), HashSize::Sha256)?;
    check_digest(hasher, payload, block0.sha384(), HashSize::Sha384)?;
    debug!("payload hashes match");

    Ok(content_type)
}

/// Steps 6-7.
fn verify_signature_block<K: Keychain + ?Sized>(
    header: &[u8; HEADER_SIZE],
    might_be_signed: bool,
    content_type: Option<&str>,
    policy: &FamilyPolicy,
    keychain: &K,
) -> Result<(SignatureStatus, Option<String>)> {
    let block1 = SignatureBlock::parse(header)?;

    if block1.magic() != BLOCK1_MAGIC {
        return Err(AuthError::MalformedHeader(format!(
            "Block1 magic num should be 0x{BLOCK1_MAGIC:08X}, but found 0x{:08X}",
            block1.magic()
        )));
    }

    let region = block1.signature_region(policy.signature_max_size())?;

    // The hint never short-circuits this check.
    if region.iter().all(|&b| b == 0) {
        if might_be_signed {
            info!("file is not signed");
        } else {
            debug!("signature region is empty, bitstream is unsigned");
        }
        return Ok((SignatureStatus::Unsigned, None));
    }

    let block0 = DescriptorBlock::parse(header)?;
    let chain = keychain.validate(region, block0.as_bytes())?;

    if !chain.complete {
        return Err(AuthError::ChainIncomplete);
    }

    if !is_permitted(policy, content_type, chain.granted_permission) {
        return Err(AuthError::PermissionDenied {
            granted: chain.granted_permission,
            content_type: content_type.unwrap_or("<none>").to_string(),
        });
    }

    info!("file is signed");
    info!(fuse_info = %chain.fuse_info, "fuse info");
    Ok((SignatureStatus::Signed, Some(chain.fuse_info)))
}

fn check_digest<H: HashProvider + ?Sized>(
    hasher: &H,
    payload: &[u8],
    stored: &[u8],
    size: HashSize,
) -> Result<()> {
    let computed = digest(hasher, payload, size)?;
    if computed != stored {
        return Err(AuthError::IntegrityMismatch {
            algorithm: size.name(),
            expected: hex::encode(&computed),
            found: hex::encode(stored),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::framing::{embed_signature_chain, generate};
    use crate::hash::Sha2Provider;
    use crate::keychain::SigningChainResult;
    use crate::layout::{BLOCK0_SIZE, SIGNATURE_OFFSET, TYPE_OFFSET};
    use crate::extension::FamilyKind;
    use crate::policy::{FamilyPolicySpec, FamilyRegistry, PAC_CARD};

    struct FixedKeychain {
        result: SigningChainResult,
        calls: Cell<usize>,
        region_len: Cell<usize>,
    }

    impl FixedKeychain {
        fn new(complete: bool, granted_permission: u32) -> Self {
            Self {
                result: SigningChainResult {
                    complete,
                    granted_permission,
                    fuse_info: "root hash 00".into(),
                },
                calls: Cell::new(0),
                region_len: Cell::new(0),
            }
        }
    }

    impl Keychain for FixedKeychain {
        fn validate(
            &self,
            signature_region: &[u8],
            _block0: &[u8; BLOCK0_SIZE],
        ) -> Result<SigningChainResult> {
            self.calls.set(self.calls.get() + 1);
            self.region_len.set(signature_region.len());
            Ok(self.result.clone())
        }
    }

    fn pac_card() -> FamilyPolicy {
        FamilyRegistry::builtin()
            .unwrap()
            .lookup(PAC_CARD)
            .unwrap()
            .clone()
    }

    fn unsigned(ty: &str) -> Vec<u8> {
        generate(&[0x41; 128], Some(ty), &pac_card(), &Sha2Provider)
            .unwrap()
            .as_bytes()
            .to_vec()
    }

    fn signed(ty: &str) -> Vec<u8> {
        let policy = pac_card();
        let mut bitstream = generate(&[0x41; 128], Some(ty), &policy, &Sha2Provider).unwrap();
        embed_signature_chain(&mut bitstream, &[0xC3; 96], &policy).unwrap();
        bitstream.as_bytes().to_vec()
    }

    #[test]
    fn test_verify_unsigned() {
        let keychain = FixedKeychain::new(true, 1);
        let report =
            verify(&unsigned("BBS"), false, &pac_card(), &Sha2Provider, &keychain).unwrap();

        assert_eq!(report.status, SignatureStatus::Unsigned);
        assert_eq!(report.content_type.as_deref(), Some("BBS"));
        assert_eq!(report.payload_size, 128);
        assert_eq!(report.fuse_info, None);
        assert_eq!(keychain.calls.get(), 0);
    }

    #[test]
    fn test_verify_signed() {
        let keychain = FixedKeychain::new(true, 1);
        let report = verify(&signed("BBS"), true, &pac_card(), &Sha2Provider, &keychain).unwrap();

        assert!(report.is_signed());
        assert_eq!(report.fuse_info.as_deref(), Some("root hash 00"));
        assert_eq!(keychain.calls.get(), 1);
    }

    #[test]
    fn test_too_short_or_misaligned() {
        let keychain = FixedKeychain::new(true, 1);
        let policy = pac_card();
        for len in [0, 128, 1024, 1025, 1100] {
            let result = verify(&vec![0u8; len], false, &policy, &Sha2Provider, &keychain);
            assert!(matches!(result, Err(AuthError::MalformedHeader(_))), "len {len}");
        }
    }

    #[test]
    fn test_size_field_mismatch() {
        let mut data = unsigned("BBS");
        data[4..8].copy_from_slice(&256u32.to_le_bytes());
        let result = verify(&data, false, &pac_card(), &Sha2Provider, &FixedKeychain::new(true, 1));
        assert!(matches!(result, Err(AuthError::MalformedHeader(_))));
    }

    #[test]
    fn test_unmapped_type_byte() {
        let mut data = unsigned("BBS");
        data[TYPE_OFFSET] = 9;
        let result = verify(&data, false, &pac_card(), &Sha2Provider, &FixedKeychain::new(true, 1));
        assert!(matches!(result, Err(AuthError::UnsupportedType(_))));
    }

    #[test]
    fn test_hash_field_tamper() {
        let mut data = unsigned("BBS");
        data[0x30] ^= 0x01;
        let result = verify(&data, false, &pac_card(), &Sha2Provider, &FixedKeychain::new(true, 1));
        match result {
            Err(AuthError::IntegrityMismatch { algorithm, .. }) => assert_eq!(algorithm, "SHA-384"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_chain_incomplete() {
        let keychain = FixedKeychain::new(false, 1);
        let result = verify(&signed("BBS"), true, &pac_card(), &Sha2Provider, &keychain);
        assert!(matches!(result, Err(AuthError::ChainIncomplete)));
    }

    #[test]
    fn test_permission_denied() {
        let keychain = FixedKeychain::new(true, 1);
        let result = verify(&signed("GBS"), true, &pac_card(), &Sha2Provider, &keychain);
        assert!(matches!(
            result,
            Err(AuthError::PermissionDenied { granted: 1, .. })
        ));
    }

    #[test]
    fn test_hint_does_not_change_signed_branch() {
        // A non-zero region is handed to the keychain even when the caller
        // said the file is not expected to be signed.
        let keychain = FixedKeychain::new(true, 1);
        let report = verify(&signed("BBS"), false, &pac_card(), &Sha2Provider, &keychain).unwrap();
        assert!(report.is_signed());
        assert_eq!(keychain.calls.get(), 1);

        // And a zero region is unsigned whatever the hint.
        for hint in [false, true] {
            let report =
                verify(&unsigned("BBS"), hint, &pac_card(), &Sha2Provider, &keychain).unwrap();
            assert_eq!(report.status, SignatureStatus::Unsigned);
        }
    }

    #[test]
    fn test_nonzero_tail_of_region_counts_as_signed() {
        let mut data = unsigned("BBS");
        data[SIGNATURE_OFFSET + 879] = 1;
        let keychain = FixedKeychain::new(false, 0);
        let result = verify(&data, true, &pac_card(), &Sha2Provider, &keychain);
        assert!(matches!(result, Err(AuthError::ChainIncomplete)));
        assert_eq!(keychain.calls.get(), 1);
    }

    #[test]
    fn test_open_takes_ownership() {
        let data = SecureBuffer::from(unsigned("BMC_FW"));
        let (bitstream, report) = open(
            data,
            false,
            &pac_card(),
            &Sha2Provider,
            &FixedKeychain::new(true, 1),
        )
        .unwrap();
        assert_eq!(bitstream.payload(), &[0x41; 128][..]);
        assert_eq!(report.content_type.as_deref(), Some("BMC_FW"));

        let mut bad = unsigned("BBS");
        bad[0] = 0;
        assert!(open(
            SecureBuffer::from(bad),
            false,
            &pac_card(),
            &Sha2Provider,
            &FixedKeychain::new(true, 1)
        )
        .is_err());
    }

    fn typeless() -> FamilyPolicy {
        FamilyPolicy::from_spec(FamilyPolicySpec {
            id: "TYPELESS".into(),
            content_types: None,
            min_chain_entries: 0,
            max_chain_entries: 2,
            signature_max_size: 64,
            cancellation_ids: None,
            extension: FamilyKind::PacCard,
        })
        .unwrap()
    }

    fn typeless_unsigned() -> Vec<u8> {
        generate(&[0x5A; 256], None, &typeless(), &Sha2Provider)
            .unwrap()
            .as_bytes()
            .to_vec()
    }

    #[test]
    fn test_typeless_unsigned() {
        let keychain = FixedKeychain::new(true, 0);
        let report =
            verify(&typeless_unsigned(), true, &typeless(), &Sha2Provider, &keychain).unwrap();

        assert_eq!(report.status, SignatureStatus::Unsigned);
        assert_eq!(report.family, "TYPELESS");
        assert_eq!(report.content_type, None);
        assert_eq!(report.payload_size, 256);
        assert_eq!(keychain.calls.get(), 0);
    }

    #[test]
    fn test_typeless_type_byte_must_be_zero() {
        let mut data = typeless_unsigned();
        data[TYPE_OFFSET] = 1;
        let result = verify(&data, false, &typeless(), &Sha2Provider, &FixedKeychain::new(true, 0));
        assert!(matches!(result, Err(AuthError::UnsupportedType(_))));
    }

    #[test]
    fn test_typeless_signed_without_permission_bits() {
        let policy = typeless();
        let mut bitstream = generate(&[0x5A; 256], None, &policy, &Sha2Provider).unwrap();
        embed_signature_chain(&mut bitstream, &[0xC3; 40], &policy).unwrap();

        let keychain = FixedKeychain::new(true, 0);
        let report = verify(bitstream.as_bytes(), true, &policy, &Sha2Provider, &keychain).unwrap();

        assert_eq!(report.status, SignatureStatus::Signed);
        assert_eq!(report.content_type, None);
        assert_eq!(keychain.calls.get(), 1);
        assert_eq!(keychain.region_len.get(), 64);
    }

    #[test]
    fn test_typeless_region_is_policy_sized() {
        // Bytes past the family's region are not part of the signature.
        let mut data = typeless_unsigned();
        data[SIGNATURE_OFFSET + 64] = 0xFF;
        let keychain = FixedKeychain::new(true, 0);
        let report = verify(&data, true, &typeless(), &Sha2Provider, &keychain).unwrap();
        assert_eq!(report.status, SignatureStatus::Unsigned);
        assert_eq!(keychain.calls.get(), 0);
    }

    #[test]
    fn test_keychain_sees_full_region() {
        let keychain = FixedKeychain::new(true, 1);
        verify(&signed("BBS"), true, &pac_card(), &Sha2Provider, &keychain).unwrap();
        assert_eq!(keychain.region_len.get(), 880);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SignatureStatus::Unsigned.to_string(), "unsigned, integrity verified");
        assert_eq!(
            SignatureStatus::Signed.to_string(),
            "signed, integrity and authenticity verified"
        );
    }
}
