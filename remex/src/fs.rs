//! Asynchronous file helpers.
//!
//! Regular files on local filesystems do not give useful readiness
//! notifications, so these helpers dispatch the corresponding `std::fs`
//! call through the blocking pool and suspend the calling task until it
//! finishes.

use std::path::Path;

use crate::error::Result;
use crate::runtime::executor::spawn_blocking;

/// Reads the entire contents of a file.
pub async fn read(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref().to_owned();
    Ok(spawn_blocking(move || std::fs::read(path)).await?)
}

/// Reads the entire contents of a file as a UTF-8 string.
pub async fn read_to_string(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref().to_owned();
    Ok(spawn_blocking(move || std::fs::read_to_string(path)).await?)
}

/// Writes `contents` to a file, creating it if needed and truncating it
/// otherwise.
pub async fn write(path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> Result<()> {
    let path = path.as_ref().to_owned();
    let contents = contents.into();
    Ok(spawn_blocking(move || std::fs::write(path, contents)).await?)
}
