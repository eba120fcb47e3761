//! Component tag naming convention.
//!
//! A component's tag comes from its file name: everything before the first
//! `.` with underscores turned into hyphens. Custom element names must
//! contain a hyphen, and shells and editors are friendlier to underscores, so
//! both spellings are accepted:
//!
//! - `ecb-card.html` → `ecb-card`
//! - `ecb_text_field.html` → `ecb-text-field`
//! - `ecb_chart.min.html` → `ecb-chart`
//!
//! Every tag must start with the configured prefix. The prefix is what the
//! tag scanner looks for, so an unprefixed component could never be found
//! from a page.
//!
//! Components and pages are both `.html` files; [`markup_files`] lists them.

use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

/// Extension of component, page and layout sources.
pub const MARKUP_EXTENSION: &str = "html";

/// All `.html` files under `root`, recursively, sorted by path.
///
/// A missing `root` yields no files.
pub fn markup_files(root: &Path) -> Result<Vec<PathBuf>, walkdir::Error> {
    if !root.exists() {
        info!("{} does not exist, skipping", root.display());
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        let is_markup = entry
            .path()
            .extension()
            .is_some_and(|ext| ext == MARKUP_EXTENSION);
        if entry.file_type().is_file() && is_markup {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// File name up to the first `.`, as written.
pub fn name_from_path(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    file_name.split('.').next().unwrap_or_default().to_string()
}

/// Derive a component tag from its source file path.
pub fn tag_from_path(path: &Path) -> String {
    name_from_path(path).replace('_', "-")
}

/// Whether `tag` names a component under `prefix`.
///
/// The prefix alone is not a tag: `ecb-` has no name after it.
pub fn is_component_tag(tag: &str, prefix: &str) -> bool {
    tag.len() > prefix.len() && tag.starts_with(prefix)
}
