//! Binary layout of the authenticated header.
//!
//! Offsets and field widths here are a compatibility contract with the
//! devices and tools that consume these bitstreams. All multi-byte integers
//! are little-endian.
//!
//! ```text
//! 0x000  Block0 magic           4
//! 0x004  payload size           4
//! 0x008  content type enum      1
//! 0x009  cancellation cert      1   (placeholder, 0)
//! 0x00A  reserved               6
//! 0x010  SHA-256 of payload    32
//! 0x030  SHA-384 of payload    48
//! 0x060  reserved              32
//! 0x080  Block1 magic           4
//! 0x084  reserved              12
//! 0x090  signature chain        family signature_max_size
//!        reserved padding       up to 0x400
//! ```

use std::ops::Range;

use bytes::Buf;

use crate::error::{AuthError, Result};

/// Payloads and whole bitstreams are aligned to this many bytes.
pub const BLOCK_ALIGN: usize = 128;

/// Size of the descriptor block (Block0).
pub const BLOCK0_SIZE: usize = 128;

/// Size of the signature block (Block1).
pub const BLOCK1_SIZE: usize = 896;

/// Size of the full authenticated header (Block0 + Block1).
pub const HEADER_SIZE: usize = BLOCK0_SIZE + BLOCK1_SIZE;

/// Upper bound on any family's signature region.
pub const MAX_SIGNATURE_SIZE: usize = HEADER_SIZE - SIGNATURE_OFFSET;

pub const BLOCK0_MAGIC: u32 = 0xB6EA_FD19;
pub const BLOCK1_MAGIC: u32 = 0xF27F_28D7;

/// Magic of the root entry inside a signing chain.
pub const ROOT_ENTRY_MAGIC: u32 = 0xA757_A046;
/// Magic of a code signing key entry inside a signing chain.
pub const CSK_ENTRY_MAGIC: u32 = 0x1471_1C2F;
/// Magic of the final Block0 signature entry inside a signing chain.
pub const BLOCK0_ENTRY_MAGIC: u32 = 0x1536_4367;

pub const BLOCK0_MAGIC_OFFSET: usize = 0x00;
pub const SIZE_OFFSET: usize = 0x04;
pub const TYPE_OFFSET: usize = 0x08;
pub const CANCELLATION_OFFSET: usize = 0x09;
pub const SHA256_OFFSET: usize = 0x10;
pub const SHA384_OFFSET: usize = 0x30;
pub const BLOCK1_MAGIC_OFFSET: usize = 0x80;
pub const SIGNATURE_OFFSET: usize = 0x90;

/// Reserved bytes between the cancellation placeholder and the SHA-256 field.
pub const BLOCK0_RESERVED_LOW: Range<usize> = 0x0A..0x10;
/// Reserved tail of Block0 after the SHA-384 field.
pub const BLOCK0_RESERVED_HIGH: Range<usize> = 0x60..0x80;
/// Reserved bytes between the Block1 magic and the signature region.
pub const BLOCK1_RESERVED: Range<usize> = 0x84..0x90;

/// Find the first non-zero byte of `header` within `range`.
///
/// Returns `ReservedFieldViolation` carrying the absolute offset.
pub fn check_reserved(header: &[u8], range: Range<usize>) -> Result<()> {
    let start = range.start;
    let bytes = header.get(range).ok_or_else(|| {
        AuthError::MalformedHeader(format!(
            "header of {} bytes is too short for reserved range at 0x{start:03X}",
            header.len()
        ))
    })?;
    match bytes.iter().position(|&b| b != 0) {
        Some(i) => Err(AuthError::ReservedFieldViolation {
            offset: start + i,
            value: bytes[i],
        }),
        None => Ok(()),
    }
}

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    let mut field = &bytes[offset..offset + 4];
    field.get_u32_le()
}

/// Read-only view over a 128-byte descriptor block.
#[derive(Clone, Copy)]
pub struct DescriptorBlock<'a> {
    bytes: &'a [u8; BLOCK0_SIZE],
}

impl<'a> DescriptorBlock<'a> {
    /// View the first 128 bytes of `header` as a descriptor block.
    pub fn parse(header: &'a [u8]) -> Result<Self> {
        let bytes = header
            .get(..BLOCK0_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| {
                AuthError::MalformedHeader(format!(
                    "Block0 needs {BLOCK0_SIZE} bytes, found {}",
                    header.len()
                ))
            })?;
        Ok(Self { bytes })
    }

    pub fn magic(&self) -> u32 {
        read_u32_le(self.bytes, BLOCK0_MAGIC_OFFSET)
    }

    /// Declared payload size in bytes (post-padding).
    pub fn payload_size(&self) -> u32 {
        read_u32_le(self.bytes, SIZE_OFFSET)
    }

    pub fn type_code(&self) -> u8 {
        self.bytes[TYPE_OFFSET]
    }

    pub fn cancellation(&self) -> u8 {
        self.bytes[CANCELLATION_OFFSET]
    }

    pub fn sha256(&self) -> &'a [u8] {
        &self.bytes[SHA256_OFFSET..SHA384_OFFSET]
    }

    pub fn sha384(&self) -> &'a [u8] {
        &self.bytes[SHA384_OFFSET..BLOCK0_RESERVED_HIGH.start]
    }

    pub fn as_bytes(&self) -> &'a [u8; BLOCK0_SIZE] {
        self.bytes
    }
}

impl std::fmt::Debug for DescriptorBlock<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorBlock")
            .field("magic", &format_args!("0x{:08X}", self.magic()))
            .field("payload_size", &self.payload_size())
            .field("type_code", &self.type_code())
            .field("sha256", &hex::encode(self.sha256()))
            .field("sha384", &hex::encode(self.sha384()))
            .finish()
    }
}

/// Read-only view over the 896-byte signature block.
///
/// Offsets passed to and returned from this view are absolute header offsets.
#[derive(Debug, Clone, Copy)]
pub struct SignatureBlock<'a> {
    bytes: &'a [u8; BLOCK1_SIZE],
}

impl<'a> SignatureBlock<'a> {
    /// View bytes `0x80..0x400` of a full header as a signature block.
    pub fn parse(header: &'a [u8]) -> Result<Self> {
        let bytes = header
            .get(BLOCK0_SIZE..HEADER_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| {
                AuthError::MalformedHeader(format!(
                    "header needs {HEADER_SIZE} bytes, found {}",
                    header.len()
                ))
            })?;
        Ok(Self { bytes })
    }

    pub fn magic(&self) -> u32 {
        read_u32_le(self.bytes, BLOCK1_MAGIC_OFFSET - BLOCK0_SIZE)
    }

    /// The signature region of `len` bytes starting at 0x90.
    pub fn signature_region(&self, len: usize) -> Result<&'a [u8]> {
        let start = SIGNATURE_OFFSET - BLOCK0_SIZE;
        self.bytes.get(start..start + len).ok_or_else(|| {
            AuthError::InvalidConfiguration(format!(
                "signature region of {len} bytes exceeds {MAX_SIGNATURE_SIZE}"
            ))
        })
    }
}
