//! Golden test vectors for deterministic framing.
//!
//! Each vector pins the digests written into Block0 for a fixed payload.

use bitsign_core::{generate, AuthenticatedBitstream, FamilyRegistry, Sha2Provider, PAC_CARD};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Byte the payload is filled with.
    pub fill: u8,
    /// Payload length in bytes.
    pub len: usize,
    /// `PAC_CARD` content type.
    pub content_type: &'static str,
    /// Expected type byte at offset 0x08.
    pub type_code: u8,
    /// Expected SHA-256 of the payload (hex).
    pub sha256: &'static str,
    /// Expected SHA-384 of the payload (hex).
    pub sha384: &'static str,
}

impl GoldenVector {
    pub fn payload(&self) -> Vec<u8> {
        vec![self.fill; self.len]
    }
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "one block of 'A' as BBS",
            fill: 0x41,
            len: 128,
            content_type: "BBS",
            type_code: 0,
            sha256: "b6ac3cc10386331c765f04f041c147d0f278f2aed8eaa021e2d0057fc6f6ff9e",
            sha384: "ef54e6d1cf5ad6043eb20f682df1e28aab50b6745f061b8a16460ab8d928f26b041ded5e0ea673c5b03dbb5548e82c07",
        },
        GoldenVector {
            name: "two zero blocks as GBS",
            fill: 0x00,
            len: 256,
            content_type: "GBS",
            type_code: 2,
            sha256: "5341e6b2646979a70e57653007a1f310169421ec9bdd9f1a5648f75ade005af1",
            sha384: "983980373213482dd5c9a5a424db89418e3344c459fa31a356e42eaa28544ca01b9839f6593c9e5d79fd439b5da6ebef",
        },
    ]
}

/// Frame a golden vector's payload under the built-in `PAC_CARD` family.
pub fn generate_from_vector(vector: &GoldenVector) -> bitsign_core::Result<AuthenticatedBitstream> {
    let registry = FamilyRegistry::builtin()?;
    let policy = registry.lookup(PAC_CARD)?;
    generate(
        &vector.payload(),
        Some(vector.content_type),
        policy,
        &Sha2Provider,
    )
}

/// Check every vector against this implementation.
///
/// Returns `(name, matches)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool)> {
    all_vectors()
        .iter()
        .map(|v| {
            let matches = generate_from_vector(v)
                .and_then(|bitstream| {
                    let block0 = bitstream.descriptor()?;
                    Ok(block0.type_code() == v.type_code
                        && block0.payload_size() as usize == v.len
                        && hex::encode(block0.sha256()) == v.sha256
                        && hex::encode(block0.sha384()) == v.sha384)
                })
                .unwrap_or(false);
            (v.name.to_string(), matches)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_match() {
        for (name, matches) in verify_all_vectors() {
            assert!(matches, "vector '{name}' does not match");
        }
    }

    #[test]
    fn test_vector_header_fields() {
        let vector = &all_vectors()[0];
        let bitstream = generate_from_vector(vector).unwrap();
        let header = bitstream.header();

        assert_eq!(&header[0x00..0x04], &0xB6EA_FD19u32.to_le_bytes());
        assert_eq!(&header[0x04..0x08], &128u32.to_le_bytes());
        assert_eq!(header[0x08], 0);
        assert_eq!(&header[0x80..0x84], &0xF27F_28D7u32.to_le_bytes());
        assert!(header[0x90..].iter().all(|&b| b == 0));
    }
}
