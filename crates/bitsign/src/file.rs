//! Byte-buffer collaborator: whole-file reads and writes.
//!
//! All file I/O happens here, before or after the core engines run.

use std::io::Read;
use std::path::Path;

use bitsign_core::layout::BLOCK_ALIGN;
use bitsign_core::SecureBuffer;

use crate::error::{BitsignError, Result};

/// Read a whole file into a wiping buffer.
///
/// Capacity covers the file plus block padding, so neither the read nor a
/// later [`pad_to_block`](bitsign_core::pad_to_block) has to reallocate.
pub fn read_file(path: impl AsRef<Path>) -> Result<SecureBuffer> {
    let path = path.as_ref();
    let mut file = std::fs::File::open(path).map_err(|e| BitsignError::io(path, e))?;
    let len = file
        .metadata()
        .map(|m| m.len() as usize)
        .map_err(|e| BitsignError::io(path, e))?;

    let mut data = SecureBuffer::with_capacity(len.saturating_add(BLOCK_ALIGN));
    file.read_to_end(&mut data)
        .map_err(|e| BitsignError::io(path, e))?;

    tracing::debug!(path = %path.display(), size = data.len(), "read file");
    Ok(data)
}

/// Write `data` to `path`, replacing any existing file.
pub fn write_file(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, data).map_err(|e| BitsignError::io(path, e))?;
    tracing::debug!(path = %path.display(), size = data.len(), "wrote file");
    Ok(())
}
