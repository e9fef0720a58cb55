//! Hash provider collaborator.
//!
//! The engines never compute digests themselves; they ask a [`HashProvider`].
//! [`Sha2Provider`] is the default backed by the `sha2` crate.

use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::error::{AuthError, Result};

/// Digest sizes a hash provider must support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashSize {
    Sha256,
    Sha384,
    Sha512,
}

impl HashSize {
    /// Digest length in bytes.
    pub const fn digest_len(self) -> usize {
        match self {
            HashSize::Sha256 => 32,
            HashSize::Sha384 => 48,
            HashSize::Sha512 => 64,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            HashSize::Sha256 => "SHA-256",
            HashSize::Sha384 => "SHA-384",
            HashSize::Sha512 => "SHA-512",
        }
    }
}

impl TryFrom<usize> for HashSize {
    type Error = AuthError;

    fn try_from(len: usize) -> Result<Self> {
        match len {
            32 => Ok(HashSize::Sha256),
            48 => Ok(HashSize::Sha384),
            64 => Ok(HashSize::Sha512),
            other => Err(AuthError::InvalidConfiguration(format!(
                "only SHA256, SHA384 and SHA512 are supported, found SHA{}",
                other * 8
            ))),
        }
    }
}

/// Computes SHA-2 digests for the engines.
pub trait HashProvider {
    /// Digest `data`, returning exactly `size.digest_len()` bytes.
    fn sha(&self, data: &[u8], size: HashSize) -> Vec<u8>;
}

impl<H: HashProvider + ?Sized> HashProvider for &H {
    fn sha(&self, data: &[u8], size: HashSize) -> Vec<u8> {
        (**self).sha(data, size)
    }
}

/// Software SHA-2 from the `sha2` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha2Provider;

impl HashProvider for Sha2Provider {
    fn sha(&self, data: &[u8], size: HashSize) -> Vec<u8> {
        match size {
            HashSize::Sha256 => Sha256::digest(data).to_vec(),
            HashSize::Sha384 => Sha384::digest(data).to_vec(),
            HashSize::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

/// Digest `data` and check the provider honoured the requested length.
pub(crate) fn digest<H: HashProvider + ?Sized>(
    hasher: &H,
    data: &[u8],
    size: HashSize,
) -> Result<Vec<u8>> {
    let out = hasher.sha(data, size);
    if out.len() != size.digest_len() {
        return Err(AuthError::InvalidConfiguration(format!(
            "hash provider returned {} bytes for {}, expected {}",
            out.len(),
            size.name(),
            size.digest_len()
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha2_lengths() {
        let provider = Sha2Provider;
        for size in [HashSize::Sha256, HashSize::Sha384, HashSize::Sha512] {
            assert_eq!(provider.sha(b"data", size).len(), size.digest_len());
        }
    }

    #[test]
    fn test_sha256_known_answer() {
        let digest = Sha2Provider.sha(&[0x41; 128], HashSize::Sha256);
        assert_eq!(
            hex::encode(digest),
            "b6ac3cc10386331c765f04f041c147d0f278f2aed8eaa021e2d0057fc6f6ff9e"
        );
    }

    #[test]
    fn test_hash_size_from_len() {
        assert_eq!(HashSize::try_from(48).unwrap(), HashSize::Sha384);
        assert!(matches!(
            HashSize::try_from(20),
            Err(AuthError::InvalidConfiguration(_))
        ));
    }

    struct ShortProvider;

    impl HashProvider for ShortProvider {
        fn sha(&self, _data: &[u8], _size: HashSize) -> Vec<u8> {
            vec![0; 4]
        }
    }

    #[test]
    fn test_digest_rejects_wrong_length() {
        assert!(digest(&ShortProvider, b"x", HashSize::Sha256).is_err());
        assert!(digest(&Sha2Provider, b"x", HashSize::Sha256).is_ok());
    }
}
