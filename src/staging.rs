//! Atomic manifest publication.
//!
//! Content is staged in a temporary file beside the target and renamed over
//! it, so readers never observe a partially written manifest.
use std::fs;
use std::io::{self, Write};
use std::path::Path;

pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let mut staged = tempfile::Builder::new()
        .prefix(".crucible-")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|err| err.error)?;
    Ok(())
}

pub fn write_atomic_text(path: &Path, text: &str) -> io::Result<()> {
    write_atomic(path, text.as_bytes())
}
