//! Cover art arguments
//!
//! `--cover` takes either a URL or a path to a local image. Local images are
//! embedded as `data:` URLs so the album stays self-contained in backups.

use std::path::Path;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Turn a `--cover` argument into the stored cover reference
pub fn resolve_cover(value: &str) -> Result<String> {
    if value.is_empty() || is_url(value) {
        return Ok(value.to_string());
    }

    let path = Path::new(value);
    if !path.is_file() {
        bail!("Cover is neither a URL nor an image file: {}", value);
    }
    inline_image(path)
}

/// Encode an image file as a `data:` URL
pub fn inline_image(path: &Path) -> Result<String> {
    let mime = mime_for(path)
        .with_context(|| format!("Unsupported image type: {:?}", path))?;
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read image: {:?}", path))?;

    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}

fn is_url(value: &str) -> bool {
    ["http://", "https://", "data:"]
        .iter()
        .any(|prefix| value.starts_with(prefix))
}

fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => return None,
    };
    Some(mime)
}
