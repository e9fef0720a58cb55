//! The Authenticator: unified API for inserting, signing and checking
//! authenticated bitstreams.
//!
//! It brings together a family policy, a hash provider and a keychain so the
//! caller (usually a CLI) can drive whole operations in one call.

use std::path::Path;

use bitsign_core::{
    embed_signature_chain, generate, open, pad_to_block, verify, AuthError,
    AuthenticatedBitstream, FamilyPolicy, FamilyRegistry, HashProvider, Keychain,
    SecureBuffer, SignatureBlock, VerificationReport,
};

use crate::config::AuthConfig;
use crate::error::Result;
use crate::file::{read_file, write_file};

/// Framing and verification bound to one family.
pub struct Authenticator<H: HashProvider, K: Keychain> {
    registry: FamilyRegistry,
    policy: FamilyPolicy,
    config: AuthConfig,
    hasher: H,
    keychain: K,
}

impl<H: HashProvider, K: Keychain> Authenticator<H, K> {
    /// Build the registry from `config` and select its family.
    ///
    /// Fails with `InvalidConfiguration` or `UnknownFamily` at startup,
    /// before any bitstream is touched.
    pub fn new(config: AuthConfig, hasher: H, keychain: K) -> Result<Self> {
        let registry = config.registry()?;
        let policy = registry.lookup(&config.family)?.clone();
        tracing::debug!(family = policy.id(), "authenticator ready");
        Ok(Self {
            registry,
            policy,
            config,
            hasher,
            keychain,
        })
    }

    pub fn policy(&self) -> &FamilyPolicy {
        &self.policy
    }

    pub fn registry(&self) -> &FamilyRegistry {
        &self.registry
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn keychain(&self) -> &K {
        &self.keychain
    }

    // ─────────────────────────────────────────────────────────────────────────
    // In-memory Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Frame a raw payload with a new, unsigned header.
    ///
    /// The payload is zero-padded to 128 bytes first when `pad_payload` is set.
    pub fn insert_data(
        &self,
        payload: impl Into<SecureBuffer>,
        content_type: Option<&str>,
    ) -> Result<AuthenticatedBitstream> {
        let mut payload = payload.into();
        if self.config.pad_payload {
            pad_to_block(&mut payload)?;
        }
        let bitstream = generate(&payload, content_type, &self.policy, &self.hasher)?;
        tracing::info!(
            family = self.policy.id(),
            size = bitstream.len(),
            "inserted descriptor and signature blocks"
        );
        Ok(bitstream)
    }

    /// Verify a bitstream.
    pub fn verify(&self, bitstream: &[u8], might_be_signed: bool) -> Result<VerificationReport> {
        Ok(verify(
            bitstream,
            might_be_signed,
            &self.policy,
            &self.hasher,
            &self.keychain,
        )?)
    }

    /// Verify a bitstream that may or may not carry a signing chain.
    pub fn check_integrity(&self, bitstream: &[u8]) -> Result<VerificationReport> {
        self.verify(bitstream, true)
    }

    /// Put `chain` into the signature region of an unsigned bitstream.
    ///
    /// A non-zero signature region is refused before the keychain sees it.
    /// Otherwise the input is fully verified, and the signed result is
    /// verified again, so a chain the keychain rejects, or one without
    /// permission for the content type, never leaves this call.
    pub fn sign(
        &self,
        bitstream: impl Into<SecureBuffer>,
        chain: &[u8],
    ) -> Result<(AuthenticatedBitstream, VerificationReport)> {
        let bitstream = bitstream.into();
        let already_signed = SignatureBlock::parse(&bitstream)
            .and_then(|block1| block1.signature_region(self.policy.signature_max_size()))
            .is_ok_and(|region| region.iter().any(|&b| b != 0));
        if already_signed {
            return Err(AuthError::SignatureRegion("bitstream is already signed".into()).into());
        }

        let (mut bitstream, _) = open(
            bitstream,
            false,
            &self.policy,
            &self.hasher,
            &self.keychain,
        )?;

        embed_signature_chain(&mut bitstream, chain, &self.policy)?;
        let report = self.verify(bitstream.as_bytes(), true)?;
        Ok((bitstream, report))
    }

    /// `insert_data` followed by `sign`.
    pub fn insert_data_and_sign(
        &self,
        payload: impl Into<SecureBuffer>,
        content_type: Option<&str>,
        chain: &[u8],
    ) -> Result<(AuthenticatedBitstream, VerificationReport)> {
        let unsigned = self.insert_data(payload, content_type)?;
        self.sign(unsigned.into_buffer(), chain)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // File Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Read `input`, frame it and write the unsigned bitstream to `output`.
    pub fn insert_data_file(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        content_type: Option<&str>,
    ) -> Result<()> {
        let bitstream = self.insert_data(read_file(input)?, content_type)?;
        write_file(output, bitstream.as_bytes())
    }

    /// Read an unsigned bitstream, embed `chain` and write it to `output`.
    pub fn sign_file(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        chain: &[u8],
    ) -> Result<VerificationReport> {
        let (bitstream, report) = self.sign(read_file(input)?, chain)?;
        write_file(output, bitstream.as_bytes())?;
        Ok(report)
    }

    /// Check the integrity (and authenticity, if signed) of a file.
    pub fn check_integrity_file(&self, path: impl AsRef<Path>) -> Result<VerificationReport> {
        let data = read_file(path)?;
        self.check_integrity(&data)
    }
}
