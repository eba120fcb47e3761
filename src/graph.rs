//! Component dependency graph.
//!
//! Built in two passes over the [`Registry`]: discovery records each
//! component's raw tag `references`, then [`resolve`] maps them to
//! [`ComponentId`]s and freezes the result as a [`DependencyGraph`].
//!
//! The graph must be acyclic before anything traverses it.
//! [`DependencyGraph::check_acyclic`] runs a depth-first search from every
//! component, keeping the current path so a cycle can be reported as the
//! chain of components that leads into it:
//!
//! ```text
//! components/ecb-a.html
//!   components/ecb-b.html
//!     components/ecb-c.html
//!       components/ecb-a.html
//! ```
//!
//! After a clean check, [`DependencyGraph::closure`] computes the components a
//! page needs: every component it references, plus everything those depend
//! on, each exactly once. Dependencies come before their dependents, so
//! a layout emitting one-time setup per component gets it in a usable order.

use crate::component::{ComponentId, Registry};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("could not build component {component} graph because <{tag}> is not defined")]
    UndefinedComponent { component: PathBuf, tag: String },
    #[error("page {page} requires component <{tag}> which is missing")]
    MissingForPage { page: PathBuf, tag: String },
    #[error("cyclic reference found: {}", tags.join(" -> "))]
    Cycle { tags: Vec<String>, paths: Vec<PathBuf> },
}

/// Direct dependencies of every component, indexed by [`ComponentId`].
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    edges: Vec<Vec<ComponentId>>,
}

/// Resolve every component's references and build the graph.
///
/// Fills [`Component::dependencies`](crate::component::Component) in place.
pub fn resolve(registry: &mut Registry) -> Result<DependencyGraph, GraphError> {
    let mut edges = Vec::with_capacity(registry.len());
    for index in 0..registry.len() {
        let id = ComponentId(index);
        let component = registry.get(id);
        let dependencies = component
            .references
            .iter()
            .map(|tag| {
                registry
                    .lookup(tag)
                    .ok_or_else(|| GraphError::UndefinedComponent {
                        component: component.path.clone(),
                        tag: tag.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        registry.get_mut(id).dependencies = dependencies.clone();
        edges.push(dependencies);
    }
    Ok(DependencyGraph { edges })
}

impl DependencyGraph {
    pub fn dependencies(&self, id: ComponentId) -> &[ComponentId] {
        &self.edges[id.0]
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// The first cycle found, as the DFS path from its root to the repeated
    /// component.
    pub fn find_cycle(&self) -> Option<Vec<ComponentId>> {
        let mut search = CycleSearch::new(self);
        for index in 0..self.edges.len() {
            let root = ComponentId(index);
            if !search.visited[index] && search.visit(root) {
                return Some(search.trace);
            }
        }
        None
    }

    /// Fail with the cycle's trace if the graph has one.
    pub fn check_acyclic(&self, registry: &Registry) -> Result<(), GraphError> {
        match self.find_cycle() {
            None => Ok(()),
            Some(trace) => {
                let components: Vec<_> = trace.iter().map(|&id| registry.get(id)).collect();
                Err(GraphError::Cycle {
                    tags: components.iter().map(|c| c.tag.clone()).collect(),
                    paths: components.iter().map(|c| c.path.clone()).collect(),
                })
            }
        }
    }

    /// Components needed by a page referencing `references`, dependencies
    /// first, each once.
    ///
    /// Only valid on a graph that passed [`check_acyclic`](Self::check_acyclic).
    pub fn closure(
        &self,
        registry: &Registry,
        page: &Path,
        references: &[String],
    ) -> Result<Vec<ComponentId>, GraphError> {
        let mut visited = vec![false; self.edges.len()];
        let mut used = Vec::new();
        for tag in references {
            let id = registry
                .lookup(tag)
                .ok_or_else(|| GraphError::MissingForPage {
                    page: page.to_path_buf(),
                    tag: tag.clone(),
                })?;
            if !visited[id.0] {
                self.collect(id, &mut visited, &mut used);
            }
        }
        Ok(used)
    }

    fn collect(&self, id: ComponentId, visited: &mut [bool], used: &mut Vec<ComponentId>) {
        visited[id.0] = true;
        for &dependency in &self.edges[id.0] {
            if !visited[dependency.0] {
                self.collect(dependency, visited, used);
            }
        }
        used.push(id);
    }
}

/// Depth-first search state for [`DependencyGraph::find_cycle`].
struct CycleSearch<'g> {
    graph: &'g DependencyGraph,
    visited: Vec<bool>,
    on_stack: Vec<bool>,
    trace: Vec<ComponentId>,
}

impl<'g> CycleSearch<'g> {
    fn new(graph: &'g DependencyGraph) -> Self {
        Self {
            graph,
            visited: vec![false; graph.len()],
            on_stack: vec![false; graph.len()],
            trace: Vec::new(),
        }
    }

    /// True when a cycle is reachable from `node`; `trace` then ends with the
    /// repeated component.
    fn visit(&mut self, node: ComponentId) -> bool {
        self.visited[node.0] = true;
        self.on_stack[node.0] = true;
        self.trace.push(node);

        for &dependency in self.graph.dependencies(node) {
            if !self.visited[dependency.0] {
                if self.visit(dependency) {
                    return true;
                }
            } else if self.on_stack[dependency.0] {
                self.trace.push(dependency);
                return true;
            }
        }

        self.on_stack[node.0] = false;
        self.trace.pop();
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;

    /// Registry from `(tag, references)` pairs, in order.
    fn registry(components: &[(&str, &[&str])]) -> Registry {
        let mut registry = Registry::default();
        for (tag, references) in components {
            registry
                .insert(Component {
                    tag: tag.to_string(),
                    name: tag.to_string(),
                    path: PathBuf::from(format!("components/{tag}.html")),
                    content: String::new(),
                    references: references.iter().map(|r| r.to_string()).collect(),
                    dependencies: Vec::new(),
                })
                .unwrap();
        }
        registry
    }

    fn tags(registry: &Registry, ids: &[ComponentId]) -> Vec<String> {
        ids.iter().map(|&id| registry.get(id).tag.clone()).collect()
    }

    fn refs(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    #[test]
    fn resolve_fills_dependencies() {
        let mut reg = registry(&[("ecb-a", &[]), ("ecb-b", &["ecb-a"])]);
        let graph = resolve(&mut reg).unwrap();

        let b = reg.lookup("ecb-b").unwrap();
        let a = reg.lookup("ecb-a").unwrap();
        assert_eq!(reg.get(b).dependencies, vec![a]);
        assert_eq!(graph.dependencies(b), &[a]);
        assert!(graph.dependencies(a).is_empty());
    }

    #[test]
    fn undefined_reference_names_component_and_tag() {
        let mut reg = registry(&[("ecb-a", &["ecb-ghost"])]);
        let err = resolve(&mut reg).unwrap_err();
        match &err {
            GraphError::UndefinedComponent { component, tag } => {
                assert_eq!(component, Path::new("components/ecb-a.html"));
                assert_eq!(tag, "ecb-ghost");
            }
            other => panic!("unexpected error: {other}"),
        }
        let message = err.to_string();
        assert!(message.contains("components/ecb-a.html"));
        assert!(message.contains("ecb-ghost"));
    }

    // =========================================================================
    // Cycle detection
    // =========================================================================

    #[test]
    fn acyclic_graph_passes() {
        let mut reg = registry(&[
            ("ecb-a", &[]),
            ("ecb-b", &["ecb-a"]),
            ("ecb-c", &["ecb-a", "ecb-b"]),
        ]);
        let graph = resolve(&mut reg).unwrap();
        assert!(graph.find_cycle().is_none());
        assert!(graph.check_acyclic(&reg).is_ok());
    }

    #[test]
    fn three_cycle_reports_trace() {
        let mut reg = registry(&[
            ("ecb-a", &["ecb-b"]),
            ("ecb-b", &["ecb-c"]),
            ("ecb-c", &["ecb-a"]),
        ]);
        let graph = resolve(&mut reg).unwrap();
        let trace = graph.find_cycle().unwrap();
        assert_eq!(tags(&reg, &trace), vec!["ecb-a", "ecb-b", "ecb-c", "ecb-a"]);

        match graph.check_acyclic(&reg).unwrap_err() {
            GraphError::Cycle { tags, paths } => {
                assert_eq!(tags.len(), 4);
                assert_eq!(paths[0], Path::new("components/ecb-a.html"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn cycle_message_joins_tags() {
        let mut reg = registry(&[("ecb-a", &["ecb-b"]), ("ecb-b", &["ecb-a"])]);
        let graph = resolve(&mut reg).unwrap();
        let err = graph.check_acyclic(&reg).unwrap_err();
        assert_eq!(
            err.to_string(),
            "cyclic reference found: ecb-a -> ecb-b -> ecb-a"
        );
    }

    #[test]
    fn self_reference_is_cycle() {
        let mut reg = registry(&[("ecb-loop", &["ecb-loop"])]);
        let graph = resolve(&mut reg).unwrap();
        assert_eq!(
            tags(&reg, &graph.find_cycle().unwrap()),
            vec!["ecb-loop", "ecb-loop"]
        );
    }

    #[test]
    fn trace_starts_at_dfs_root() {
        let mut reg = registry(&[
            ("ecb-entry", &["ecb-x"]),
            ("ecb-x", &["ecb-y"]),
            ("ecb-y", &["ecb-x"]),
        ]);
        let graph = resolve(&mut reg).unwrap();
        assert_eq!(
            tags(&reg, &graph.find_cycle().unwrap()),
            vec!["ecb-entry", "ecb-x", "ecb-y", "ecb-x"]
        );
    }

    #[test]
    fn cycle_in_disconnected_subgraph_is_found() {
        let mut reg = registry(&[
            ("ecb-a", &["ecb-b"]),
            ("ecb-b", &[]),
            ("ecb-c", &["ecb-d"]),
            ("ecb-d", &["ecb-c"]),
        ]);
        let graph = resolve(&mut reg).unwrap();
        assert_eq!(
            tags(&reg, &graph.find_cycle().unwrap()),
            vec!["ecb-c", "ecb-d", "ecb-c"]
        );
    }

    #[test]
    fn shared_dependency_is_not_a_cycle() {
        // Visited but finished nodes are off the stack.
        let mut reg = registry(&[
            ("ecb-x", &["ecb-z"]),
            ("ecb-y", &["ecb-z"]),
            ("ecb-z", &[]),
            ("ecb-top", &["ecb-x", "ecb-y"]),
        ]);
        let graph = resolve(&mut reg).unwrap();
        assert!(graph.find_cycle().is_none());
    }

    // =========================================================================
    // Transitive closure
    // =========================================================================

    #[test]
    fn diamond_collapses() {
        let mut reg = registry(&[
            ("ecb-x", &["ecb-z"]),
            ("ecb-y", &["ecb-z"]),
            ("ecb-z", &[]),
            ("ecb-unused", &[]),
        ]);
        let graph = resolve(&mut reg).unwrap();
        let used = graph
            .closure(&reg, Path::new("pages/index.html"), &refs(&["ecb-x", "ecb-y"]))
            .unwrap();
        assert_eq!(tags(&reg, &used), vec!["ecb-z", "ecb-x", "ecb-y"]);
    }

    #[test]
    fn dependencies_precede_dependents() {
        let mut reg = registry(&[
            ("ecb-a", &[]),
            ("ecb-b", &["ecb-a"]),
            ("ecb-c", &["ecb-a", "ecb-b"]),
        ]);
        let graph = resolve(&mut reg).unwrap();
        let used = graph
            .closure(&reg, Path::new("pages/index.html"), &refs(&["ecb-c", "ecb-b"]))
            .unwrap();
        assert_eq!(tags(&reg, &used), vec!["ecb-a", "ecb-b", "ecb-c"]);
    }

    #[test]
    fn empty_references_give_empty_closure() {
        let mut reg = registry(&[("ecb-a", &[])]);
        let graph = resolve(&mut reg).unwrap();
        let used = graph
            .closure(&reg, Path::new("pages/index.html"), &[])
            .unwrap();
        assert!(used.is_empty());
    }

    #[test]
    fn unknown_page_reference_is_error() {
        let mut reg = registry(&[("ecb-a", &[])]);
        let graph = resolve(&mut reg).unwrap();
        let err = graph
            .closure(&reg, Path::new("pages/about.html"), &refs(&["ecb-a", "ecb-nope"]))
            .unwrap_err();
        assert!(matches!(
            &err,
            GraphError::MissingForPage { page, tag }
                if page == Path::new("pages/about.html") && tag == "ecb-nope"
        ));
    }
}
