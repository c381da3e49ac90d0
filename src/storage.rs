use crate::errors::ApiError;
use actix_web::web;
use futures_util::{Stream, TryStreamExt as _};
use sanitize_filename::sanitize;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// URL prefix the uploads directory is served under; also the prefix of every stored `filepath`.
pub const UPLOADS_PREFIX: &str = "uploads";
pub const FALLBACK_NAME: &str = "recording.webm";
/// Longest file name most filesystems accept, in bytes.
pub const NAME_MAX: usize = 255;

pub fn stored_name(original: &str, now_millis: i64) -> String {
    let prefix = format!("{}-", now_millis);
    let name = fit_name(display_name(original), NAME_MAX - prefix.len());
    format!("{}{}", prefix, name)
}

/// Shortens `name` to at most `max` bytes on a char boundary, keeping a short extension.
fn fit_name(name: String, max: usize) -> String {
    if name.len() <= max {
        return name;
    }
    if let Some((stem, ext)) = name.rsplit_once('.') {
        if !stem.is_empty() && ext.len() <= 16 && ext.len() + 2 <= max {
            let stem = &stem[..floor_char_boundary(stem, max - ext.len() - 1)];
            return format!("{}.{}", stem, ext);
        }
    }
    name[..floor_char_boundary(&name, max)].to_string()
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    let mut end = max.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

/// The client-supplied name with anything unsafe for a path removed.
pub fn display_name(original: &str) -> String {
    let cleaned = sanitize(original.trim());
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        FALLBACK_NAME.to_string()
    } else {
        cleaned
    }
}

pub fn public_path(stored: &str) -> String {
    format!("{}/{}", UPLOADS_PREFIX, stored)
}

pub fn disk_path(uploads_dir: &Path, filepath: &str) -> Option<PathBuf> {
    let stored = filepath.strip_prefix(UPLOADS_PREFIX)?.strip_prefix('/')?;
    if stored.is_empty() || stored.contains(['/', '\\']) || stored == ".." || stored == "." {
        return None;
    }
    Some(uploads_dir.join(stored))
}

/// Streams `chunks` into a freshly created `dir/stored`, refusing to overwrite.
/// Returns the number of bytes written; the partial file is removed on failure.
pub async fn write_field<S, E>(
    dir: &Path,
    stored: &str,
    chunks: S,
    max_size: usize,
) -> Result<u64, ApiError>
where
    S: Stream<Item = Result<web::Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let path = dir.join(stored);
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => {
                log::warn!("storage path collision: {}", path.display());
                ApiError::Conflict("A recording with this name is already being stored".into())
            }
            _ => e.into(),
        })?;

    match copy_chunks(file, chunks, max_size).await {
        Ok(written) => Ok(written),
        Err(e) => {
            if let Err(rm) = std::fs::remove_file(&path) {
                log::warn!("failed to remove partial upload {}: {rm}", path.display());
            }
            Err(e)
        }
    }
}

async fn copy_chunks<S, E>(mut file: File, mut chunks: S, max_size: usize) -> Result<u64, ApiError>
where
    S: Stream<Item = Result<web::Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut written: usize = 0;
    while let Some(chunk) = chunks.try_next().await.map_err(|e| {
        log::warn!("upload read error: {e}");
        ApiError::BadRequest("upload read error".into())
    })? {
        written += chunk.len();
        if written > max_size {
            return Err(ApiError::PayloadTooLarge);
        }
        file = web::block(move || -> std::io::Result<File> {
            file.write_all(&chunk)?;
            Ok(file)
        })
        .await
        .map_err(|e| {
            log::error!("blocking write failed: {e}");
            ApiError::Internal
        })??;
    }
    Ok(written as u64)
}
