//! The page value that flows through the build pipeline.

use crate::component::ComponentId;
use minijinja::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One page being built.
///
/// Created for every file under the pages root, or synthesized by the fan-out
/// hook. Each pipeline stage fills in or replaces some of its fields.
#[derive(Debug, Clone)]
pub struct Page {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub layout: PathBuf,
    /// Raw source after `read`, rendered markup after `render-template`, the
    /// full document after `merge-with-layout`.
    pub content: String,
    pub head: String,
    /// Component tags the page itself uses, first-seen order.
    pub references: Vec<String>,
    /// Transitive closure of `references`, dependencies first.
    pub used_components: Vec<ComponentId>,
    /// Template variables.
    pub data: BTreeMap<String, Value>,
}

impl Page {
    pub fn new(source: PathBuf, dest: PathBuf, layout: PathBuf) -> Self {
        Self {
            source,
            dest,
            layout,
            content: String::new(),
            head: String::new(),
            references: Vec::new(),
            used_components: Vec::new(),
            data: BTreeMap::new(),
        }
    }
}

/// Output path for a page: `source` moved from `pages_root` to `output_root`.
///
/// A source outside `pages_root` keeps only its file name.
pub fn destination_for(source: &Path, pages_root: &Path, output_root: &Path) -> PathBuf {
    match source.strip_prefix(pages_root) {
        Ok(relative) => output_root.join(relative),
        Err(_) => output_root.join(source.file_name().unwrap_or_default()),
    }
}
