//! # bitsign
//!
//! Insert, sign and check authenticated FPGA/CPLD bitstreams.
//!
//! ## Overview
//!
//! An authenticated bitstream is a payload prefixed with a 1024-byte header:
//!
//! - **Block0** (descriptor): magic, payload size, content type and the
//!   SHA-256/SHA-384 digests of the payload
//! - **Block1** (signature): magic and a signature region that is either all
//!   zero (unsigned) or holds a signing chain judged by a [`Keychain`]
//!
//! Per-family rules (content types, permission masks, chain limits) come from
//! a [`FamilyRegistry`], built from the built-in families plus any listed in
//! the [`AuthConfig`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bitsign::{AuthConfig, Authenticator, Sha2Provider, SignatureStatus};
//! # struct RejectAll;
//! # impl bitsign::Keychain for RejectAll {
//! #     fn validate(
//! #         &self,
//! #         _: &[u8],
//! #         _: &[u8; bitsign::BLOCK0_SIZE],
//! #     ) -> bitsign::core::Result<bitsign::SigningChainResult> {
//! #         Ok(bitsign::SigningChainResult {
//! #             complete: false,
//! #             granted_permission: 0,
//! #             fuse_info: String::new(),
//! #         })
//! #     }
//! # }
//!
//! let auth = Authenticator::new(AuthConfig::default(), Sha2Provider, RejectAll).unwrap();
//!
//! auth.insert_data_file("gbs.bin", "gbs_unsigned.bin", Some("GBS")).unwrap();
//! let report = auth.check_integrity_file("gbs_unsigned.bin").unwrap();
//! assert_eq!(report.status, SignatureStatus::Unsigned);
//! ```
//!
//! ## Re-exports
//!
//! - `bitsign::core` - framing and verification engines, layout, policy

pub mod authenticator;
pub mod config;
pub mod error;
pub mod file;

pub use bitsign_core as core;

pub use authenticator::Authenticator;
pub use config::AuthConfig;
pub use error::{BitsignError, Result};
pub use file::{read_file, write_file};

pub use bitsign_core::{
    AuthError, AuthenticatedBitstream, ErrorKind, FamilyPolicy, FamilyRegistry, HashProvider,
    Keychain, SecureBuffer, Sha2Provider, SignatureStatus, SigningChainResult, VerificationReport,
    BLOCK0_SIZE, HEADER_SIZE, PAC_CARD,
};
