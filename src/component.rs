//! Component registry.
//!
//! Every `.html` file under the components root is one component. Discovery
//! renders each file once and scans the result for the component tags it uses:
//!
//! ```text
//! components/
//! ├── ecb-button.html          → ecb-button
//! ├── layout/
//! │   └── ecb_nav_bar.html     → ecb-nav-bar   (uses <ecb-button>)
//! └── ecb-card.html            → ecb-card      (uses <ecb-button>)
//! ```
//!
//! Components are stored in an arena and referred to by [`ComponentId`]. At
//! this point only the raw `references` are known; [`crate::graph::resolve`]
//! fills in `dependencies` once every component exists.
//!
//! ## Template Variables
//!
//! | Variable | Value |
//! |----------|-------|
//! | `tag` | The component's own tag |
//! | `unique_id` | A fresh id from the build's issuer |
//!
//! `gen_unique_id()` is available as well, for components that need more than
//! one id.

use crate::config::ComponentsConfig;
use crate::naming::{is_component_tag, markup_files, name_from_path, tag_from_path};
use crate::scan::{MarkupContext, ScanError, scan};
use crate::template::{Renderer, TemplateError};
use minijinja::context;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ComponentError {
    #[error("component {path} must be prefixed with {prefix}")]
    MissingPrefix { path: PathBuf, prefix: String },
    #[error("component <{tag}> is defined twice: {first} and {second}")]
    DuplicateTag {
        tag: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("could not scan component {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: ScanError,
    },
    #[error("could not walk components: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Index of a component in its [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub usize);

#[derive(Debug, Clone)]
pub struct Component {
    pub tag: String,
    /// File name before the first `.`, underscores kept.
    pub name: String,
    pub path: PathBuf,
    /// Rendered markup.
    pub content: String,
    /// Component tags used by `content`, first-seen order.
    pub references: Vec<String>,
    /// `references` resolved against the registry.
    pub dependencies: Vec<ComponentId>,
}

#[derive(Debug, Default)]
pub struct Registry {
    components: Vec<Component>,
    by_tag: HashMap<String, ComponentId>,
}

impl Registry {
    /// Discover, render and scan every component under `root`.
    pub fn discover(
        root: &Path,
        options: &ComponentsConfig,
        renderer: &Renderer,
    ) -> Result<Self, ComponentError> {
        let mut registry = Self::default();
        for path in markup_files(root)? {
            info!("parsing {}", path.display());
            let component = load_component(&path, options, renderer)?;
            registry.insert(component)?;
        }
        Ok(registry)
    }

    /// Add `component`, rejecting a tag that is already taken.
    pub fn insert(&mut self, component: Component) -> Result<ComponentId, ComponentError> {
        if let Some(&existing) = self.by_tag.get(&component.tag) {
            return Err(ComponentError::DuplicateTag {
                tag: component.tag,
                first: self.components[existing.0].path.clone(),
                second: component.path,
            });
        }
        let id = ComponentId(self.components.len());
        self.by_tag.insert(component.tag.clone(), id);
        self.components.push(component);
        Ok(id)
    }

    pub fn get(&self, id: ComponentId) -> &Component {
        &self.components[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: ComponentId) -> &mut Component {
        &mut self.components[id.0]
    }

    pub fn lookup(&self, tag: &str) -> Option<ComponentId> {
        self.by_tag.get(tag).copied()
    }

    /// Components in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (ComponentId, &Component)> {
        self.components
            .iter()
            .enumerate()
            .map(|(index, component)| (ComponentId(index), component))
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

fn load_component(
    path: &Path,
    options: &ComponentsConfig,
    renderer: &Renderer,
) -> Result<Component, ComponentError> {
    let tag = tag_from_path(path);
    if !is_component_tag(&tag, &options.prefix) {
        return Err(ComponentError::MissingPrefix {
            path: path.to_path_buf(),
            prefix: options.prefix.clone(),
        });
    }

    let unique_id = renderer.ids().issue();
    let content = renderer.render_file(
        path,
        context! {
            tag => &tag,
            unique_id => unique_id,
        },
    )?;

    let references = scan(&content, MarkupContext::Component, options)
        .map_err(|source| ComponentError::Scan {
            path: path.to_path_buf(),
            source,
        })?
        .tags;

    Ok(Component {
        tag,
        name: name_from_path(path),
        path: path.to_path_buf(),
        content,
        references,
        dependencies: Vec::new(),
    })
}
