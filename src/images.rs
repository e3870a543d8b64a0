//! Image reference handling for gallery sections.
//!
//! Gallery content is whatever the admin typed or uploaded: absolute URLs,
//! `blob:`/`data:` URIs from the upload widget, repo-relative paths like
//! `public/images/rig.jpg`, bare filenames, even Windows paths. Everything
//! goes through [`normalize_image_ref`] before it reaches markup.
//!
//! ## Normalization
//!
//! ```text
//! https://cdn.example.com/x.png  →  https://cdn.example.com/x.png   (unchanged)
//! data:image/png;base64,…        →  unchanged
//! public/images/photo.jpg        →  /images/photo.jpg
//! ./images/photo.jpg             →  /images/photo.jpg
//! images\tour\photo.jpg          →  /images/tour/photo.jpg
//! photo.jpg                      →  /images/photo.jpg
//! /static/photo.jpg              →  unchanged
//! ```
//!
//! ## Local probing
//!
//! When `images.local_dir` is configured, references under the public prefix
//! are checked on disk with [`check_image`]. Missing or unreadable files are
//! reported so the renderer can log them and show a placeholder instead of
//! shipping a broken `<img>`.

use crate::config::ImagesConfig;
use std::path::{Path, PathBuf};

/// Extensions accepted for bare-filename references.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "avif", "svg", "bmp"];

/// Canonical public prefix for site images.
pub const DEFAULT_PUBLIC_PREFIX: &str = "/images";

/// Prefixes that all refer to the site's public image directory.
const IMAGE_DIR_PREFIXES: &[&str] = &["./public/images/", "/public/images/", "public/images/", "./images/", "images/"];

/// Rewrite an image reference to a displayable source path.
pub fn normalize_image_ref(reference: &str) -> String {
    normalize_with_prefix(reference, DEFAULT_PUBLIC_PREFIX)
}

/// Same as [`normalize_image_ref`] with a configurable public prefix.
pub fn normalize_with_prefix(reference: &str, public_prefix: &str) -> String {
    let trimmed = reference.trim();
    if trimmed.is_empty() || is_passthrough(trimmed) {
        return trimmed.to_string();
    }

    let path = trimmed.replace('\\', "/");
    let prefix = public_prefix.trim_end_matches('/');

    for dir in IMAGE_DIR_PREFIXES {
        if let Some(rest) = path.strip_prefix(dir) {
            return format!("{prefix}/{}", rest.trim_start_matches('/'));
        }
    }

    if path.starts_with('/') {
        return path;
    }

    if !path.contains('/') && has_image_extension(&path) {
        return format!("{prefix}/{path}");
    }

    path
}

fn is_passthrough(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    lower.starts_with("blob:")
        || lower.starts_with("data:")
        || lower.starts_with("//")
        || has_url_scheme(&lower)
}

/// `scheme://…` with an RFC 3986 scheme.
fn has_url_scheme(reference: &str) -> bool {
    match reference.find("://") {
        Some(pos) if pos > 0 => {
            let scheme = &reference[..pos];
            scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

fn has_image_extension(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(stem, ext)| !stem.is_empty() && IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Derive a caption from the trailing filename segment of a resolved path.
///
/// - query strings and fragments are dropped first
/// - the last extension is stripped; names without one are used whole
/// - `%20`, dashes and underscores become spaces
///
/// Returns `None` for references with no usable name (e.g. `data:` URIs).
pub fn caption_from_path(path: &str) -> Option<String> {
    if path.to_ascii_lowercase().starts_with("data:") {
        return None;
    }
    let without_query = path.split(['?', '#']).next().unwrap_or_default();
    let segment = without_query.rsplit('/').next().unwrap_or_default();
    let stem = match segment.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => segment,
    };
    let caption = stem
        .replace("%20", " ")
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    (!caption.is_empty()).then_some(caption)
}

/// Outcome of checking a normalized reference against the local image dir.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageCheck {
    /// Remote, inline, or not under the public prefix; not checked.
    Unchecked,
    /// Readable local image.
    Found { width: u32, height: u32 },
    /// Local reference that cannot be displayed.
    Broken { path: PathBuf, reason: String },
}

/// Check a normalized reference on disk, if a local image dir is configured.
pub fn check_image(src: &str, config: &ImagesConfig) -> ImageCheck {
    let Some(local_dir) = config.local_dir.as_deref().filter(|d| !d.is_empty()) else {
        return ImageCheck::Unchecked;
    };
    let prefix = format!("{}/", config.public_prefix.trim_end_matches('/'));
    let Some(relative) = src.strip_prefix(&prefix) else {
        return ImageCheck::Unchecked;
    };
    if relative.split('/').any(|part| part == "..") {
        return ImageCheck::Broken {
            path: PathBuf::from(relative),
            reason: "path escapes the image directory".to_string(),
        };
    }
    let path = Path::new(local_dir).join(relative);
    if !path.is_file() {
        return ImageCheck::Broken {
            path,
            reason: "file not found".to_string(),
        };
    }
    // SVG has no raster header to read; presence is enough.
    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
    {
        return ImageCheck::Found {
            width: 0,
            height: 0,
        };
    }
    match image::image_dimensions(&path) {
        Ok((width, height)) => ImageCheck::Found { width, height },
        // Formats without a decoder here (avif, bmp) are served as-is.
        Err(image::ImageError::Unsupported(_)) => ImageCheck::Found {
            width: 0,
            height: 0,
        },
        Err(e) => ImageCheck::Broken {
            path,
            reason: e.to_string(),
        },
    }
}
