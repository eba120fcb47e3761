//! Template rendering.
//!
//! Components, pages and the layout are all [minijinja](https://docs.rs/minijinja)
//! templates. They are user files read at build time, so a runtime engine is
//! used rather than compiled-in templates.
//!
//! Output is HTML-escaped by default. Values that already are markup (a
//! component's rendered content, a page's body and head fragment) are passed
//! in as safe strings and inserted verbatim.
//!
//! Every template can call `gen_unique_id()` for an extra id from the
//! build's [`UniqueIds`] issuer.

use crate::ids::UniqueIds;
use minijinja::{AutoEscape, Environment, ErrorKind};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("could not read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse template {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: minijinja::Error,
    },
    #[error("could not render template {path}: {source}")]
    Render {
        path: PathBuf,
        #[source]
        source: minijinja::Error,
    },
}

impl TemplateError {
    fn from_engine(path: &Path, source: minijinja::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            ErrorKind::SyntaxError => Self::Parse { path, source },
            _ => Self::Render { path, source },
        }
    }
}

/// Shared template environment for one build.
pub struct Renderer {
    env: Environment<'static>,
    ids: Arc<UniqueIds>,
}

impl Renderer {
    pub fn new(ids: Arc<UniqueIds>) -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        let issuer = Arc::clone(&ids);
        env.add_function("gen_unique_id", move || issuer.issue());
        Self { env, ids }
    }

    /// The id issuer backing `gen_unique_id()`.
    pub fn ids(&self) -> &UniqueIds {
        &self.ids
    }

    /// Render template `source`; `path` is only used for error messages.
    pub fn render<S: Serialize>(
        &self,
        path: &Path,
        source: &str,
        ctx: S,
    ) -> Result<String, TemplateError> {
        self.env
            .render_str(source, ctx)
            .map_err(|err| TemplateError::from_engine(path, err))
    }

    /// Read and render the template file at `path`.
    pub fn render_file<S: Serialize>(&self, path: &Path, ctx: S) -> Result<String, TemplateError> {
        let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.render(path, &source, ctx)
    }
}
