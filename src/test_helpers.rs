//! Shared test utilities for the ecb test suite.
//!
//! Builds throw-away projects in a temp directory with the default layout
//! (`components/`, `pages/`, `assets/`, `app.html`, output in `dist/`).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let project = TestProject::new();
//! project
//!     .component("ecb-card.html", "<div class=\"card\"></div>")
//!     .page("index.html", "<ecb-card></ecb-card>");
//!
//! let site = project.site();
//! assert_eq!(site.registry.len(), 1);
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::load_config;
use crate::site::Site;

/// Write `content` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

// =========================================================================
// Project fixtures
// =========================================================================

/// A project directory that is deleted when dropped.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    /// Empty project whose layout only prints the page content.
    pub fn new() -> Self {
        let project = Self {
            dir: TempDir::new().unwrap(),
        };
        project.layout("{{ content }}");
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn component(&self, file_name: &str, content: &str) -> &Self {
        write_file(self.root(), &format!("components/{file_name}"), content);
        self
    }

    pub fn page(&self, relative: &str, content: &str) -> &Self {
        write_file(self.root(), &format!("pages/{relative}"), content);
        self
    }

    pub fn asset(&self, relative: &str, content: &str) -> &Self {
        write_file(self.root(), &format!("assets/{relative}"), content);
        self
    }

    pub fn layout(&self, content: &str) -> &Self {
        write_file(self.root(), "app.html", content);
        self
    }

    pub fn config(&self, toml: &str) -> &Self {
        write_file(self.root(), "ecb.toml", toml);
        self
    }

    /// Discover and check the project. Panics on any error.
    pub fn site(&self) -> Site {
        let config = load_config(self.root()).unwrap();
        Site::load(self.root(), config).unwrap_or_else(|err| panic!("site failed to load: {err}"))
    }

    /// Contents of `dist/relative`. Panics if missing.
    pub fn read_output(&self, relative: &str) -> String {
        let path = self.root().join("dist").join(relative);
        std::fs::read_to_string(&path)
            .unwrap_or_else(|err| panic!("could not read {}: {err}", path.display()))
    }
}
