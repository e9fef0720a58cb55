//! Framing Engine: wrap a payload in a new authenticated header.

use bytes::BufMut;

use crate::buffer::SecureBuffer;
use crate::error::{AuthError, Result};
use crate::extension::FamilyExtension;
use crate::hash::{digest, HashProvider, HashSize};
use crate::layout::{
    DescriptorBlock, BLOCK0_MAGIC, BLOCK0_RESERVED_LOW, BLOCK0_SIZE, BLOCK1_MAGIC, BLOCK_ALIGN, HEADER_SIZE,
    SHA256_OFFSET, SIGNATURE_OFFSET,
};
use crate::policy::{ContentType, FamilyPolicy};

/// Block0 ‖ Block1 ‖ padded payload, owned and wiped on drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedBitstream {
    data: SecureBuffer,
}

impl AuthenticatedBitstream {
    /// Wrap bytes that already passed verification.
    pub(crate) fn from_verified(data: SecureBuffer) -> Self {
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The 1024-byte authenticated header.
    pub fn header(&self) -> &[u8] {
        &self.data[..HEADER_SIZE]
    }

    pub fn descriptor(&self) -> Result<DescriptorBlock<'_>> {
        DescriptorBlock::parse(&self.data)
    }

    /// The padded payload following the header.
    pub fn payload(&self) -> &[u8] {
        &self.data[HEADER_SIZE..]
    }

    /// Total length, header included.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The signature region as sized by `policy`.
    pub fn signature_region(&self, policy: &FamilyPolicy) -> &[u8] {
        &self.data[SIGNATURE_OFFSET..SIGNATURE_OFFSET + policy.signature_max_size()]
    }

    pub fn into_buffer(self) -> SecureBuffer {
        self.data
    }
}

impl AsRef<[u8]> for AuthenticatedBitstream {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Build a new authenticated bitstream around `payload`.
///
/// `payload` must already be padded to a multiple of 128 bytes. Typed
/// families require a `content_type` from their table; typeless families
/// require none. The signature region is left all zero (unsigned).
pub fn generate<H: HashProvider + ?Sized>(
    payload: &[u8],
    content_type: Option<&str>,
    policy: &FamilyPolicy,
    hasher: &H,
) -> Result<AuthenticatedBitstream> {
    if payload.is_empty() || payload.len() % BLOCK_ALIGN != 0 {
        return Err(AuthError::InvalidPayload(format!(
            "content size should be a non-zero multiple of {BLOCK_ALIGN} bytes, but found {} bytes",
            payload.len()
        )));
    }
    let size = u32::try_from(payload.len()).map_err(|_| {
        AuthError::InvalidPayload(format!(
            "content size {} does not fit the 32-bit size field",
            payload.len()
        ))
    })?;

    let type_code = resolve_type(policy, content_type)?.map_or(0, |t| t.code);

    let sha256 = digest(hasher, payload, HashSize::Sha256)?;
    let sha384 = digest(hasher, payload, HashSize::Sha384)?;

    let mut header = [0u8; HEADER_SIZE];
    {
        let mut out = &mut header[..];

        // Block0
        out.put_u32_le(BLOCK0_MAGIC);
        out.put_u32_le(size);
        out.put_u8(type_code);
        // Cancellation certificate placeholder.
        out.put_u8(0);
        out.put_bytes(0, SHA256_OFFSET - BLOCK0_RESERVED_LOW.start);
        out.put_slice(&sha256);
        out.put_slice(&sha384);
        out.put_bytes(0, BLOCK0_SIZE - SHA256_OFFSET - sha256.len() - sha384.len());

        // Block1: the signature region starts unsigned.
        out.put_u32_le(BLOCK1_MAGIC);
        debug_assert_eq!(out.remaining_mut(), HEADER_SIZE - BLOCK0_SIZE - 4);
    }

    policy.extension().on_generate(&mut header)?;

    let mut data = SecureBuffer::with_capacity(HEADER_SIZE + payload.len());
    data.extend_from_slice(&header);
    data.extend_from_slice(payload);

    tracing::debug!(
        family = policy.id(),
        content_type = content_type.unwrap_or("-"),
        payload_size = size,
        "generated descriptor and signature blocks"
    );

    Ok(AuthenticatedBitstream { data })
}

/// Copy a pre-built signing chain into an unsigned bitstream.
///
/// The chain must be non-empty, fit the family's signature region, and the
/// region must still be all zero.
pub fn embed_signature_chain(
    bitstream: &mut AuthenticatedBitstream,
    chain: &[u8],
    policy: &FamilyPolicy,
) -> Result<()> {
    let max = policy.signature_max_size();
    if chain.is_empty() || chain.len() > max {
        return Err(AuthError::SignatureRegion(format!(
            "signing chain of {} bytes does not fit the {max}-byte region of family {}",
            chain.len(),
            policy.id()
        )));
    }

    let region = &mut bitstream.data[SIGNATURE_OFFSET..SIGNATURE_OFFSET + max];
    if region.iter().any(|&b| b != 0) {
        return Err(AuthError::SignatureRegion(
            "bitstream is already signed".into(),
        ));
    }
    region[..chain.len()].copy_from_slice(chain);

    tracing::debug!(chain_len = chain.len(), "embedded signing chain");
    Ok(())
}

fn resolve_type<'p>(
    policy: &'p FamilyPolicy,
    content_type: Option<&str>,
) -> Result<Option<&'p ContentType>> {
    match (policy.is_typed(), content_type) {
        (false, None) => Ok(None),
        (false, Some(name)) => Err(AuthError::UnsupportedType(format!(
            "family {} does not support content types, however {name} is specified",
            policy.id()
        ))),
        (true, None) => Err(AuthError::UnsupportedType(format!(
            "family {} requires a content type",
            policy.id()
        ))),
        (true, Some(name)) => policy.content_type(name).map(Some).ok_or_else(|| {
            let supported: Vec<_> = policy
                .content_types()
                .unwrap_or_default()
                .iter()
                .map(|t| t.name.as_str())
                .collect();
            AuthError::UnsupportedType(format!(
                "invalid type ({name}), supported types are {supported:?}"
            ))
        }),
    }
}
