//! Family extension hook.
//!
//! The framing and verification engines are shared by every family. A family
//! that gives meaning to reserved header bytes does so here, through a
//! [`FamilyExtension`] implementation selected by [`FamilyKind`]. Adding a
//! family means adding a variant and a policy entry; the engines stay as they
//! are.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layout::{
    check_reserved, BLOCK0_RESERVED_HIGH, BLOCK0_RESERVED_LOW, BLOCK1_RESERVED, HEADER_SIZE,
};

/// Family-specific header behaviour.
pub trait FamilyExtension {
    /// Called once the shared fields of a new header are written.
    fn on_generate(&self, header: &mut [u8; HEADER_SIZE]) -> Result<()>;

    /// Called after the shared verification steps have passed.
    fn on_verify(&self, header: &[u8; HEADER_SIZE]) -> Result<()>;
}

/// Closed set of family implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FamilyKind {
    /// PAC card: all reserved bytes must stay zero.
    PacCard,
}

impl FamilyExtension for FamilyKind {
    fn on_generate(&self, header: &mut [u8; HEADER_SIZE]) -> Result<()> {
        match self {
            FamilyKind::PacCard => PacCardExtension.on_generate(header),
        }
    }

    fn on_verify(&self, header: &[u8; HEADER_SIZE]) -> Result<()> {
        match self {
            FamilyKind::PacCard => PacCardExtension.on_verify(header),
        }
    }
}

/// Extension for the PAC card family.
#[derive(Debug, Clone, Copy, Default)]
pub struct PacCardExtension;

impl FamilyExtension for PacCardExtension {
    fn on_generate(&self, _header: &mut [u8; HEADER_SIZE]) -> Result<()> {
        Ok(())
    }

    fn on_verify(&self, header: &[u8; HEADER_SIZE]) -> Result<()> {
        // Other families may repurpose these ranges; PAC cards keep them zero.
        check_reserved(header, BLOCK0_RESERVED_LOW)?;
        check_reserved(header, BLOCK0_RESERVED_HIGH)?;
        check_reserved(header, BLOCK1_RESERVED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;

    #[test]
    fn test_pac_card_generate_leaves_header_untouched() {
        let mut header = [0u8; HEADER_SIZE];
        header[0] = 0x19;
        let before = header;
        FamilyKind::PacCard.on_generate(&mut header).unwrap();
        assert_eq!(header, before);
    }

    #[test]
    fn test_pac_card_verify_checks_every_reserved_range() {
        let header = [0u8; HEADER_SIZE];
        assert!(FamilyKind::PacCard.on_verify(&header).is_ok());

        for offset in [0x0A, 0x0F, 0x60, 0x7F, 0x84, 0x8F] {
            let mut bad = header;
            bad[offset] = 1;
            assert!(
                matches!(
                    FamilyKind::PacCard.on_verify(&bad),
                    Err(AuthError::ReservedFieldViolation { offset: o, value: 1 }) if o == offset
                ),
                "offset 0x{offset:03X} not rejected"
            );
        }
    }

    #[test]
    fn test_pac_card_ignores_non_reserved_bytes() {
        let mut header = [0u8; HEADER_SIZE];
        header[0x09] = 0x01;
        header[0x10] = 0xFF;
        header[0x90] = 0xFF;
        assert!(FamilyKind::PacCard.on_verify(&header).is_ok());
    }

    #[test]
    fn test_family_kind_serde_name() {
        let kind: FamilyKind = serde_json::from_str("\"pac_card\"").unwrap();
        assert_eq!(kind, FamilyKind::PacCard);
    }
}
