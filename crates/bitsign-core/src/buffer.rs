//! Owned byte buffers that are wiped when dropped.

use std::fmt;
use std::ops::{Deref, DerefMut};

use zeroize::Zeroizing;

use crate::error::{AuthError, Result};
use crate::layout::BLOCK_ALIGN;

/// An exclusively owned byte buffer, zeroized on drop.
///
/// Bitstreams and payloads live in one of these for the whole call so the
/// memory is wiped on success and failure paths alike.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecureBuffer(Zeroizing<Vec<u8>>);

impl SecureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Zeroizing::new(Vec::with_capacity(capacity)))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

}

impl From<Vec<u8>> for SecureBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }
}

impl Deref for SecureBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.0
    }
}

impl DerefMut for SecureBuffer {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.0
    }
}

impl AsRef<[u8]> for SecureBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecureBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureBuffer({} bytes)", self.0.len())
    }
}

/// Zero-pad `data` in place to the next multiple of 128 bytes.
///
/// Empty input is rejected; the padding becomes part of the hashed payload.
pub fn pad_to_block(data: &mut SecureBuffer) -> Result<()> {
    if data.is_empty() {
        return Err(AuthError::InvalidPayload(
            "file size must be greater than zero".into(),
        ));
    }
    let rem = data.len() % BLOCK_ALIGN;
    if rem == 0 {
        return Ok(());
    }
    let padded = data.len() + (BLOCK_ALIGN - rem);

    // Growing the vector in place would free the old allocation unwiped.
    if data.capacity() < padded {
        let mut grown = SecureBuffer::with_capacity(padded);
        grown.extend_from_slice(data.as_slice());
        std::mem::swap(data, &mut grown);
    }
    data.resize(padded, 0);
    Ok(())
}
