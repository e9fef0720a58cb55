//! Keychain collaborator.
//!
//! Walking and cryptographically validating a signing chain happens outside
//! this crate. The verification engine hands the signature region and Block0
//! to a [`Keychain`] and only consumes the [`SigningChainResult`].

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layout::BLOCK0_SIZE;

/// Outcome of validating a signing chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningChainResult {
    /// Whether the chain is complete, from fused root down to Block0.
    pub complete: bool,
    /// Union of the permission bits granted along the chain.
    pub granted_permission: u32,
    /// Human-readable fuse settings implied by the chain's root.
    pub fuse_info: String,
}

/// Validates signing chains found in a bitstream's signature region.
pub trait Keychain {
    /// Validate the chain in `signature_region` against `block0`.
    ///
    /// An `Err` aborts verification as is; an incomplete chain should be
    /// reported through [`SigningChainResult::complete`].
    fn validate(
        &self,
        signature_region: &[u8],
        block0: &[u8; BLOCK0_SIZE],
    ) -> Result<SigningChainResult>;
}

impl<K: Keychain + ?Sized> Keychain for &K {
    fn validate(
        &self,
        signature_region: &[u8],
        block0: &[u8; BLOCK0_SIZE],
    ) -> Result<SigningChainResult> {
        (**self).validate(signature_region, block0)
    }
}
