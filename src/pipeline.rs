//! Page build pipeline.
//!
//! Every page runs through an ordered list of stages. A stage mutates the
//! [`Page`] and tells the driver what to do next:
//!
//! - `Ok(Flow::Proceed)` continues with the next stage,
//! - `Ok(Flow::Halt)` stops this page without error,
//! - `Err(_)` aborts the whole build.
//!
//! ```text
//! fan-out → read → render-template → extract-head-and-components
//!         → stage-layout-data → merge-with-layout → write
//! ```
//!
//! # Fan-Out
//!
//! The first stage matches the page against the `[[fan_out]]` rules in
//! `ecb.toml`. A matching page is a template for several sibling pages: its
//! path placeholder is replaced by each configured value in turn.
//!
//! ```text
//! pages/[slug]/index.html     values = ["foo", "bar"]
//!   → dist/foo/index.html     {{ slug }} = "foo"
//!   → dist/bar/index.html     {{ slug }} = "bar"
//! ```
//!
//! The source is read once; every variant starts at `render-template` with the
//! content already in memory. The hook then halts, so the placeholder page is
//! never written itself.
//!
//! # Layout Variables
//!
//! | Variable | Value |
//! |----------|-------|
//! | `content` | The rendered page body |
//! | `head` | The page's `<head>` contents |
//! | `components` | Used components, dependencies first: `tag`, `name`, `path`, `content` |
//! | `unique_id` | The id issued when the page was rendered |
//!
//! Fan-out variants also carry their placeholder variable.

use crate::component::Registry;
use crate::config::{ProjectPaths, SiteConfig};
use crate::graph::{DependencyGraph, GraphError};
use crate::page::{Page, destination_for};
use crate::scan::{MarkupContext, ScanError, scan};
use crate::template::{Renderer, TemplateError};
use minijinja::{Value, context};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum PageError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not write file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("could not scan page {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: ScanError,
    },
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// What the driver does after a stage succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Proceed,
    Halt,
}

/// Progress reported while building.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEvent {
    PageWritten {
        source: PathBuf,
        dest: PathBuf,
        /// Tags of the page's used components.
        components: Vec<String>,
    },
    PageFannedOut {
        source: PathBuf,
        count: usize,
    },
}

/// Everything a stage may read. Frozen before the first page runs.
pub struct BuildContext<'a> {
    pub config: &'a SiteConfig,
    pub paths: &'a ProjectPaths,
    pub registry: &'a Registry,
    pub graph: &'a DependencyGraph,
    pub renderer: &'a Renderer,
    pub events: Option<&'a Sender<BuildEvent>>,
}

impl BuildContext<'_> {
    fn emit(&self, event: BuildEvent) {
        if let Some(tx) = self.events {
            tx.send(event).ok();
        }
    }
}

pub type StageFn = fn(&mut Page, &BuildContext<'_>) -> Result<Flow, PageError>;

pub struct Stage {
    pub name: &'static str,
    pub apply: StageFn,
}

const FAN_OUT: Stage = Stage {
    name: "fan-out",
    apply: fan_out,
};
const READ: Stage = Stage {
    name: "read",
    apply: read,
};
const RENDER_TEMPLATE: Stage = Stage {
    name: "render-template",
    apply: render_template,
};
const EXTRACT: Stage = Stage {
    name: "extract-head-and-components",
    apply: extract_head_and_components,
};
const STAGE_LAYOUT_DATA: Stage = Stage {
    name: "stage-layout-data",
    apply: stage_layout_data,
};
const MERGE_WITH_LAYOUT: Stage = Stage {
    name: "merge-with-layout",
    apply: merge_with_layout,
};
const WRITE: Stage = Stage {
    name: "write",
    apply: write,
};

/// Stages for a page found under the pages root.
pub const DEFAULT_STAGES: &[Stage] = &[
    FAN_OUT,
    READ,
    RENDER_TEMPLATE,
    EXTRACT,
    STAGE_LAYOUT_DATA,
    MERGE_WITH_LAYOUT,
    WRITE,
];

/// Stages for a fan-out variant, whose content is already in memory.
pub const GENERATED_STAGES: &[Stage] = &[
    RENDER_TEMPLATE,
    EXTRACT,
    STAGE_LAYOUT_DATA,
    MERGE_WITH_LAYOUT,
    WRITE,
];

/// Stages that resolve a page's components without writing anything.
pub const INSPECT_STAGES: &[Stage] = &[READ, RENDER_TEMPLATE, EXTRACT];

/// Run `page` through `stages` until one halts or fails.
pub fn run(page: &mut Page, stages: &[Stage], ctx: &BuildContext<'_>) -> Result<Flow, PageError> {
    for stage in stages {
        debug!("{} {}", stage.name, page.source.display());
        if (stage.apply)(page, ctx)? == Flow::Halt {
            return Ok(Flow::Halt);
        }
    }
    Ok(Flow::Proceed)
}

fn read_source(path: &Path) -> Result<String, PageError> {
    std::fs::read_to_string(path).map_err(|source| PageError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn fan_out(page: &mut Page, ctx: &BuildContext<'_>) -> Result<Flow, PageError> {
    let Some(rule) = ctx
        .config
        .fan_out
        .iter()
        .find(|rule| ctx.paths.pages.join(&rule.page) == page.source)
    else {
        return Ok(Flow::Proceed);
    };

    let content = read_source(&page.source)?;
    for value in &rule.values {
        let source = ctx
            .paths
            .pages
            .join(rule.page.replacen(&rule.placeholder, value, 1));
        let dest = destination_for(&source, &ctx.paths.pages, &ctx.paths.output);
        let mut variant = Page::new(source, dest, page.layout.clone());
        variant.content = content.clone();
        variant.data = page.data.clone();
        variant
            .data
            .insert(rule.variable().to_string(), Value::from(value.as_str()));
        run(&mut variant, GENERATED_STAGES, ctx)?;
    }

    ctx.emit(BuildEvent::PageFannedOut {
        source: page.source.clone(),
        count: rule.values.len(),
    });
    Ok(Flow::Halt)
}

fn read(page: &mut Page, _ctx: &BuildContext<'_>) -> Result<Flow, PageError> {
    page.content = read_source(&page.source)?;
    Ok(Flow::Proceed)
}

fn render_template(page: &mut Page, ctx: &BuildContext<'_>) -> Result<Flow, PageError> {
    let unique_id = ctx.renderer.ids().issue();
    page.data.insert("unique_id".to_string(), Value::from(unique_id));
    page.content = ctx
        .renderer
        .render(&page.source, &page.content, &page.data)?;
    Ok(Flow::Proceed)
}

fn extract_head_and_components(
    page: &mut Page,
    ctx: &BuildContext<'_>,
) -> Result<Flow, PageError> {
    let scanned = scan(&page.content, MarkupContext::Page, &ctx.config.components).map_err(
        |source| PageError::Scan {
            path: page.source.clone(),
            source,
        },
    )?;
    page.used_components = ctx
        .graph
        .closure(ctx.registry, &page.source, &scanned.tags)?;
    page.references = scanned.tags;
    page.head = scanned.head;
    Ok(Flow::Proceed)
}

fn stage_layout_data(page: &mut Page, ctx: &BuildContext<'_>) -> Result<Flow, PageError> {
    let components: Vec<Value> = page
        .used_components
        .iter()
        .map(|&id| {
            let component = ctx.registry.get(id);
            context! {
                tag => &component.tag,
                name => &component.name,
                path => component.path.to_string_lossy(),
                content => Value::from_safe_string(component.content.clone()),
            }
        })
        .collect();

    page.data
        .insert("components".to_string(), Value::from(components));
    page.data.insert(
        "content".to_string(),
        Value::from_safe_string(page.content.clone()),
    );
    page.data.insert(
        "head".to_string(),
        Value::from_safe_string(page.head.clone()),
    );
    Ok(Flow::Proceed)
}

fn merge_with_layout(page: &mut Page, ctx: &BuildContext<'_>) -> Result<Flow, PageError> {
    page.content = ctx.renderer.render_file(&page.layout, &page.data)?;
    Ok(Flow::Proceed)
}

fn write(page: &mut Page, ctx: &BuildContext<'_>) -> Result<Flow, PageError> {
    if let Some(dir) = page.dest.parent()
        && !dir.as_os_str().is_empty()
        && !dir.exists()
    {
        std::fs::create_dir_all(dir).map_err(|source| PageError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
        info!("created directory {}", dir.display());
    }

    std::fs::write(&page.dest, &page.content).map_err(|source| PageError::Write {
        path: page.dest.clone(),
        source,
    })?;

    ctx.emit(BuildEvent::PageWritten {
        source: page.source.clone(),
        dest: page.dest.clone(),
        components: page
            .used_components
            .iter()
            .map(|&id| ctx.registry.get(id).tag.clone())
            .collect(),
    });
    Ok(Flow::Proceed)
}
