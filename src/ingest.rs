use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use walkdir::WalkDir;

use crate::gallery::{ImageRecord, Origin};

/// File extensions accepted as gallery uploads (case-insensitive).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp"];

/// Whether a path looks like a supported image file, by extension.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// MIME type for a path, derived from its extension. Unrecognized
/// extensions fall back to `image/jpeg`.
pub fn mime_from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        _ => "image/jpeg",
    }
}

/// Record title for a path: the file name with its extension removed.
pub fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("Untitled")
        .to_string()
}

/// Read a local image file into a gallery record.
///
/// The file's bytes are base64-encoded into the record's payload and its
/// display URL becomes a data URL, so the record is self-contained and
/// needs no further disk access.
pub async fn record_from_file(path: &Path) -> Result<ImageRecord> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    log::debug!("Ingesting {} ({} bytes)", path.display(), bytes.len());

    Ok(ImageRecord::from_encoded(
        title_from_path(path),
        mime_from_path(path),
        STANDARD.encode(&bytes),
        Origin::Upload,
    ))
}

/// Expand a mixed set of dropped paths into image files: plain files are
/// kept when they match [`IMAGE_EXTENSIONS`] (others are skipped with a
/// warning), directories are walked recursively, following symlinks.
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();
    for path in paths {
        if path.is_file() {
            if is_image_file(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_image_file(p) {
                    images.push(p.to_path_buf());
                }
            }
        }
    }
    images
}
