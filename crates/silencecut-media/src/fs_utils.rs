//! Filesystem helpers for publishing finished artifacts.
//!
//! Materialization writes into a private run directory and only moves the
//! finished file to the requested path, so a failed run never leaves a
//! partial output behind.

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Move a finished artifact from `src` to `dst`.
///
/// Tries a rename first. When the run directory lives on another filesystem
/// (EXDEV), copies into a uniquely named temporary file beside `dst` and
/// renames that into place, so `dst` only ever appears complete.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                src = %src.display(),
                dst = %dst.display(),
                "Cross-device rename, falling back to copy"
            );
            copy_into_place(src, dst).await
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// EXDEV is error code 18 on Linux/macOS.
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

async fn copy_into_place(src: &Path, dst: &Path) -> MediaResult<()> {
    let parent = match dst.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let (from, to) = (src.to_path_buf(), dst.to_path_buf());

    // The staged file is unlinked on drop unless persisted
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut staged = tempfile::Builder::new()
            .prefix(".silencecut-")
            .suffix(".tmp")
            .tempfile_in(&parent)?;
        let mut reader = std::fs::File::open(&from)?;
        std::io::copy(&mut reader, staged.as_file_mut())?;
        staged.as_file().sync_all()?;
        staged.persist(&to).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| MediaError::from(std::io::Error::other(e)))??;

    // The source sits in a run directory that is deleted anyway
    if let Err(e) = fs::remove_file(src).await {
        tracing::warn!(src = %src.display(), error = %e, "Failed to remove moved source");
    }

    Ok(())
}
