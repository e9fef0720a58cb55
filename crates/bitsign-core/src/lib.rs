//! # bitsign core
//!
//! Framing and verification of authenticated FPGA/CPLD bitstreams.
//!
//! An authenticated bitstream is a 1024-byte header followed by a payload
//! padded to 128 bytes. The header holds a descriptor block (size, content
//! type, SHA-256 and SHA-384 of the payload) and a signature block whose
//! signature region is either all zero or a signing chain.
//!
//! This crate contains no I/O and implements no cryptographic primitives of
//! its own: digests come from a [`HashProvider`] and signing chains are
//! judged by a [`Keychain`].
//!
//! ## Key Types
//!
//! - [`FamilyRegistry`] / [`FamilyPolicy`] - per-family configuration
//! - [`generate`] - the framing engine
//! - [`verify`] - the verification engine
//! - [`is_permitted`] - the permission gate
//! - [`FamilyExtension`] - family-specific header behaviour
//!
//! ## Usage
//!
//! ```rust
//! use bitsign_core::{generate, FamilyRegistry, Sha2Provider, PAC_CARD};
//!
//! let registry = FamilyRegistry::builtin().unwrap();
//! let policy = registry.lookup(PAC_CARD).unwrap();
//! let bitstream = generate(&[0x41; 128], Some("BBS"), policy, &Sha2Provider).unwrap();
//! assert_eq!(bitstream.len(), 1024 + 128);
//! ```

pub mod buffer;
pub mod error;
pub mod extension;
pub mod framing;
pub mod hash;
pub mod keychain;
pub mod layout;
pub mod permission;
pub mod policy;
pub mod verify;

pub use buffer::{pad_to_block, SecureBuffer};
pub use error::{AuthError, ErrorKind, Result};
pub use extension::{FamilyExtension, FamilyKind, PacCardExtension};
pub use framing::{embed_signature_chain, generate, AuthenticatedBitstream};
pub use hash::{HashProvider, HashSize, Sha2Provider};
pub use keychain::{Keychain, SigningChainResult};
pub use layout::{DescriptorBlock, SignatureBlock, BLOCK0_SIZE, BLOCK1_SIZE, HEADER_SIZE};
pub use permission::is_permitted;
pub use policy::{ContentType, FamilyPolicy, FamilyPolicySpec, FamilyRegistry, PAC_CARD};
pub use verify::{open, verify, SignatureStatus, VerificationReport};
