//! Command handlers for msync-cli.
//!
//! Shared helpers live here; command logic lives in the submodules.

pub mod matches;
pub mod template;

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Read a UTF-8 text file, tolerating a leading BOM.
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("read failed: {}", path.display()))?;
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);
    String::from_utf8(bytes.to_vec())
        .with_context(|| format!("{} must be UTF-8 text", path.display()))
}
