//! PNG encoding and atomic file writes.
//!
//! Files are written to a temporary sibling and renamed into place, so a
//! truncated PNG never appears under the final name.

use crate::buffer::PixelBuffer;
use crate::error::DocumentError;
use std::io::{Cursor, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Encode an RGBA buffer as PNG bytes.
///
/// `page` (1-based) is only used for error context.
pub fn encode_png(buffer: PixelBuffer, page: usize) -> Result<Vec<u8>, DocumentError> {
    let (width, height) = (buffer.width(), buffer.height());
    let img = buffer.into_rgba_image().ok_or_else(|| DocumentError::Encode {
        page,
        detail: "expected an RGBA buffer".to_string(),
    })?;

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| DocumentError::Encode {
            page,
            detail: e.to_string(),
        })?;

    debug!("Encoded {}x{} page {} → {} bytes PNG", width, height, page, buf.len());
    Ok(buf)
}

/// Write `bytes` to `path` via a temporary file in the same directory.
///
/// An existing file at `path` is replaced.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DocumentError> {
    let fs_err = |e: std::io::Error| DocumentError::Filesystem {
        path: path.to_path_buf(),
        detail: e.to_string(),
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(fs_err)?;
    tmp.write_all(bytes).map_err(fs_err)?;
    tmp.as_file().sync_all().map_err(fs_err)?;
    tmp.persist(path).map_err(|e| fs_err(e.error))?;
    Ok(())
}
