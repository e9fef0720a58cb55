//! # bitsign testkit
//!
//! Testing utilities for bitsign.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: fixed payloads with the digests their headers must carry
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: a ready-made `PAC_CARD` policy and a scripted keychain
//! - **Reference keychain**: an Ed25519 root → CSK → Block0 signing chain
//!
//! ## Golden Vectors
//!
//! ```rust
//! use bitsign_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches) in verify_all_vectors() {
//!     assert!(matches, "{name}");
//! }
//! ```
//!
//! ## Signing End to End
//!
//! ```rust
//! use bitsign_core::{embed_signature_chain, verify};
//! use bitsign_testkit::{Ed25519ChainSigner, TestFixture};
//!
//! let fixture = TestFixture::new();
//! let signer = Ed25519ChainSigner::from_seed(&[1; 32], 0x1);
//!
//! let mut bitstream = fixture.unsigned_filled(0x41, 1, Some("BBS"));
//! let chain = signer.sign(&bitstream).unwrap();
//! embed_signature_chain(&mut bitstream, &chain, &fixture.policy).unwrap();
//!
//! let report = verify(
//!     bitstream.as_bytes(),
//!     true,
//!     &fixture.policy,
//!     &fixture.hasher,
//!     &signer.keychain(&fixture.policy),
//! )
//! .unwrap();
//! assert!(report.is_signed());
//! ```

pub mod chain;
pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use chain::{chain_len, Ed25519ChainSigner, Ed25519Keychain, NO_CANCELLATION};
pub use fixtures::{block_payload, RecordedCall, ScriptedKeychain, TestFixture};
pub use generators::{aligned_payload, pac_card_type, reserved_offset, BitstreamParams};
pub use vectors::{all_vectors, generate_from_vector, verify_all_vectors, GoldenVector};
