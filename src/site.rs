//! Whole-site operations.
//!
//! A build runs strictly in order, and any error stops it where it is (files
//! already written stay on disk):
//!
//! ```text
//! 1. Discover   components/ → Registry    (render + scan each component)
//! 2. Resolve    references  → Graph       (unknown tags are fatal)
//! 3. Check      Graph is acyclic          (once, before any page)
//! 4. Pages      pages/      → dist/       (pipeline per page)
//! 5. Assets     assets/     → dist/assets (mtime-based, never fatal)
//! ```
//!
//! Steps 1 to 3 are [`Site::load`], which is all `ecb check` runs. `ecb deps`
//! uses [`inspect`] to resolve each page's components without writing.

use crate::assets::{AssetStats, copy_assets};
use crate::component::{ComponentError, ComponentId, Registry};
use crate::config::{ConfigError, ProjectPaths, SiteConfig};
use crate::graph::{DependencyGraph, GraphError, resolve};
use crate::ids::UniqueIds;
use crate::naming::markup_files;
use crate::page::{Page, destination_for};
use crate::pipeline::{
    BuildContext, BuildEvent, DEFAULT_STAGES, INSPECT_STAGES, PageError, run,
};
use crate::template::Renderer;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Component(#[from] ComponentError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Page(#[from] PageError),
    #[error("could not list pages: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("could not create output directory {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// The cycle's component paths, when this error is a dependency cycle.
    pub fn cycle_trace(&self) -> Option<&[PathBuf]> {
        match self {
            Self::Graph(GraphError::Cycle { paths, .. }) => Some(paths),
            _ => None,
        }
    }
}

/// A project with its components discovered and checked.
pub struct Site {
    pub config: SiteConfig,
    pub paths: ProjectPaths,
    pub registry: Registry,
    pub graph: DependencyGraph,
    pub renderer: Renderer,
}

impl Site {
    /// Discover components, resolve their dependencies and reject cycles.
    pub fn load(root: &Path, config: SiteConfig) -> Result<Self, BuildError> {
        let paths = config.project_paths(root);
        let renderer = Renderer::new(Arc::new(UniqueIds::new()));

        let mut registry = Registry::discover(&paths.components, &config.components, &renderer)?;
        let graph = resolve(&mut registry)?;

        info!("checking for cyclic or recursive components");
        graph.check_acyclic(&registry)?;
        info!("{} components, no cycles", registry.len());

        Ok(Self {
            config,
            paths,
            registry,
            graph,
            renderer,
        })
    }

    pub fn context<'a>(&'a self, events: Option<&'a Sender<BuildEvent>>) -> BuildContext<'a> {
        BuildContext {
            config: &self.config,
            paths: &self.paths,
            registry: &self.registry,
            graph: &self.graph,
            renderer: &self.renderer,
            events,
        }
    }

    /// A fresh page for every file under the pages root, in path order.
    pub fn pages(&self) -> Result<Vec<Page>, BuildError> {
        Ok(markup_files(&self.paths.pages)?
            .into_iter()
            .map(|source| {
                let dest = destination_for(&source, &self.paths.pages, &self.paths.output);
                Page::new(source, dest, self.paths.layout.clone())
            })
            .collect())
    }

    /// Components in discovery order, with their direct dependencies.
    pub fn components(&self) -> Vec<ComponentSummary> {
        self.registry
            .iter()
            .map(|(_, component)| ComponentSummary {
                tag: component.tag.clone(),
                path: component.path.clone(),
                dependencies: self.tags(&component.dependencies),
            })
            .collect()
    }

    /// Run every page up to component extraction.
    pub fn inspect(&self) -> Result<Vec<PageInspection>, BuildError> {
        let ctx = self.context(None);
        let mut inspections = Vec::new();
        for mut page in self.pages()? {
            run(&mut page, INSPECT_STAGES, &ctx)?;
            inspections.push(PageInspection {
                components: self.tags(&page.used_components),
                references: page.references,
                source: page.source,
            });
        }
        Ok(inspections)
    }

    fn tags(&self, ids: &[ComponentId]) -> Vec<String> {
        ids.iter()
            .map(|&id| self.registry.get(id).tag.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentSummary {
    pub tag: String,
    pub path: PathBuf,
    pub dependencies: Vec<String>,
}

/// Outcome of a successful [`build`].
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub components: usize,
    /// Page sources processed, fan-out templates included.
    pub pages: usize,
    pub output: PathBuf,
    pub assets: AssetStats,
}

/// One page's component requirements, as shown by `ecb deps`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageInspection {
    pub source: PathBuf,
    /// Tags the page uses directly.
    pub references: Vec<String>,
    /// Everything it needs, dependencies first.
    pub components: Vec<String>,
}

/// Validate the project without writing anything.
pub fn check(root: &Path, config: SiteConfig) -> Result<Site, BuildError> {
    Site::load(root, config)
}

/// Build every page and copy assets.
pub fn build(
    root: &Path,
    config: SiteConfig,
    events: Option<Sender<BuildEvent>>,
) -> Result<BuildReport, BuildError> {
    let site = Site::load(root, config)?;

    std::fs::create_dir_all(&site.paths.output).map_err(|source| BuildError::Output {
        path: site.paths.output.clone(),
        source,
    })?;

    let ctx = site.context(events.as_ref());
    let pages = site.pages()?;
    let page_count = pages.len();
    for mut page in pages {
        run(&mut page, DEFAULT_STAGES, &ctx)?;
    }

    let assets = copy_assets(&site.paths.assets, &site.paths.assets_output);

    Ok(BuildReport {
        components: site.registry.len(),
        pages: page_count,
        output: site.paths.output.clone(),
        assets,
    })
}

/// Resolve each page's components without writing anything.
///
/// Fan-out templates are inspected as written, placeholder variable unset.
pub fn inspect(root: &Path, config: SiteConfig) -> Result<Vec<PageInspection>, BuildError> {
    Site::load(root, config)?.inspect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;
    use crate::test_helpers::TestProject;

    fn config(project: &TestProject) -> SiteConfig {
        load_config(project.root()).unwrap()
    }

    #[test]
    fn build_writes_pages_and_assets() {
        let project = TestProject::new();
        project
            .component("ecb-nav.html", "<nav></nav>")
            .page("index.html", "<ecb-nav></ecb-nav>")
            .page("docs/intro.html", "intro")
            .asset("site.css", "body {}");

        let report = build(project.root(), config(&project), None).unwrap();

        assert_eq!(report.components, 1);
        assert_eq!(report.pages, 2);
        assert_eq!(report.assets.copied, 1);
        assert_eq!(project.read_output("index.html"), "<ecb-nav></ecb-nav>");
        assert_eq!(project.read_output("docs/intro.html"), "intro");
        assert_eq!(project.read_output("assets/site.css"), "body {}");
    }

    #[test]
    fn build_honours_configured_paths() {
        let project = TestProject::new();
        project
            .config("[paths]\npages = \"src\"\noutput = \"public\"\n")
            .layout("{{ content }}");
        crate::test_helpers::write_file(project.root(), "src/index.html", "hi");

        let report = build(project.root(), config(&project), None).unwrap();
        assert_eq!(report.output, project.root().join("public"));
        assert_eq!(
            std::fs::read_to_string(project.root().join("public/index.html")).unwrap(),
            "hi"
        );
    }

    #[test]
    fn cycle_aborts_before_any_page_is_written() {
        let project = TestProject::new();
        project
            .component("ecb-a.html", "<ecb-b></ecb-b>")
            .component("ecb-b.html", "<ecb-c></ecb-c>")
            .component("ecb-c.html", "<ecb-a></ecb-a>")
            .page("index.html", "plain");

        let err = build(project.root(), config(&project), None).unwrap_err();
        let trace = err.cycle_trace().unwrap();
        let root = project.root().join("components");
        assert_eq!(
            trace,
            &[
                root.join("ecb-a.html"),
                root.join("ecb-b.html"),
                root.join("ecb-c.html"),
                root.join("ecb-a.html"),
            ]
        );
        assert!(!project.root().join("dist/index.html").exists());
    }

    #[test]
    fn broken_page_aborts_build() {
        let project = TestProject::new();
        project
            .page("a.html", "<ecb-missing></ecb-missing>")
            .page("b.html", "fine");

        let err = build(project.root(), config(&project), None).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Page(PageError::Graph(GraphError::MissingForPage { .. }))
        ));
        assert!(err.cycle_trace().is_none());
        assert!(!project.root().join("dist/b.html").exists());
    }

    #[test]
    fn build_streams_events() {
        let project = TestProject::new();
        project.page("a.html", "a").page("b.html", "b");
        let (tx, rx) = std::sync::mpsc::channel();

        build(project.root(), config(&project), Some(tx)).unwrap();

        let written: Vec<PathBuf> = rx
            .iter()
            .filter_map(|event| match event {
                BuildEvent::PageWritten { dest, .. } => Some(dest),
                BuildEvent::PageFannedOut { .. } => None,
            })
            .collect();
        let dist = project.root().join("dist");
        assert_eq!(written, vec![dist.join("a.html"), dist.join("b.html")]);
    }

    #[test]
    fn check_lists_components() {
        let project = TestProject::new();
        project
            .component("ecb-a.html", "")
            .component("ecb-b.html", "<ecb-a></ecb-a>");

        let site = check(project.root(), config(&project)).unwrap();
        let components = site.components();
        assert_eq!(components.len(), 2);
        assert_eq!(components[1].tag, "ecb-b");
        assert_eq!(components[1].dependencies, vec!["ecb-a"]);
        assert!(!project.root().join("dist").exists());
    }

    #[test]
    fn inspect_reports_references_and_closure() {
        let project = TestProject::new();
        project
            .component("ecb-a.html", "")
            .component("ecb-b.html", "<ecb-a></ecb-a>")
            .component("ecb-c.html", "<ecb-a></ecb-a><ecb-b></ecb-b>")
            .page("index.html", "<ecb-c></ecb-c><ecb-b></ecb-b>");

        let pages = inspect(project.root(), config(&project)).unwrap();
        assert_eq!(
            pages,
            vec![PageInspection {
                source: project.root().join("pages/index.html"),
                references: vec!["ecb-c".to_string(), "ecb-b".to_string()],
                components: vec![
                    "ecb-a".to_string(),
                    "ecb-b".to_string(),
                    "ecb-c".to_string()
                ],
            }]
        );
        assert!(!project.root().join("dist").exists());
    }

    #[test]
    fn duplicate_component_aborts() {
        let project = TestProject::new();
        project
            .component("ecb-x.html", "")
            .component("more/ecb_x.html", "");
        let err = check(project.root(), config(&project)).err().unwrap();
        assert!(matches!(
            err,
            BuildError::Component(ComponentError::DuplicateTag { .. })
        ));
    }
}
