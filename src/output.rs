//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Output leads with what an entity *is* (a component tag, a page) and shows
//! filesystem paths as secondary context, relative to the project root. This
//! makes the output readable as an inventory of the site while still letting
//! users trace everything back to a file.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Components
//! 001 ecb-button
//!     Source: components/ecb-button.html
//! 002 ecb-card
//!     Source: components/ecb-card.html
//!     Uses: ecb-button
//! ```
//!
//! ## Deps
//!
//! ```text
//! 001 pages/index.html
//!     ecb-card
//!         ecb-button
//!     ecb-button (see above)
//!     Needs: ecb-button, ecb-card
//! ```
//!
//! ## Build
//!
//! ```text
//! pages/index.html → dist/index.html
//!     Components: ecb-button, ecb-card
//! pages/[slug]/index.html → 3 pages
//!
//! Built 2 pages with 2 components → dist
//! Assets: 1 copied, 0 updated, 4 up to date
//! ```
//!
//! ## Cycle
//!
//! ```text
//! Dependency cycle
//!     components/ecb-a.html
//!         components/ecb-b.html
//!             components/ecb-a.html
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::pipeline::BuildEvent;
use crate::site::{BuildReport, ComponentSummary, PageInspection};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `path` relative to `root` when possible, otherwise as given.
fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{} {}", count, word)
    } else {
        format!("{} {}s", count, word)
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the component inventory shown by `ecb check`.
pub fn format_check_output(components: &[ComponentSummary], root: &Path) -> Vec<String> {
    let mut lines = vec!["Components".to_string()];
    if components.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for (idx, component) in components.iter().enumerate() {
        lines.push(format!("{} {}", format_index(idx + 1), component.tag));
        lines.push(format!(
            "{}Source: {}",
            indent(1),
            display_path(&component.path, root)
        ));
        if !component.dependencies.is_empty() {
            lines.push(format!(
                "{}Uses: {}",
                indent(1),
                component.dependencies.join(", ")
            ));
        }
    }
    lines
}

pub fn print_check_output(components: &[ComponentSummary], root: &Path) {
    for line in format_check_output(components, root) {
        println!("{}", line);
    }
}

// ============================================================================
// Deps
// ============================================================================

/// Format each page's component tree, as shown by `ecb deps`.
///
/// A component already printed for the same page is listed again as
/// `(see above)` without its subtree.
pub fn format_dependency_tree(
    pages: &[PageInspection],
    components: &[ComponentSummary],
    root: &Path,
) -> Vec<String> {
    let dependencies: HashMap<&str, &[String]> = components
        .iter()
        .map(|c| (c.tag.as_str(), c.dependencies.as_slice()))
        .collect();

    let mut lines = Vec::new();
    for (idx, page) in pages.iter().enumerate() {
        lines.push(format!(
            "{} {}",
            format_index(idx + 1),
            display_path(&page.source, root)
        ));
        let mut shown = HashSet::new();
        for tag in &page.references {
            tree_lines(tag, 1, &dependencies, &mut shown, &mut lines);
        }
        if !page.components.is_empty() {
            lines.push(format!(
                "{}Needs: {}",
                indent(1),
                page.components.join(", ")
            ));
        }
    }
    lines
}

fn tree_lines<'a>(
    tag: &'a str,
    depth: usize,
    dependencies: &HashMap<&'a str, &'a [String]>,
    shown: &mut HashSet<&'a str>,
    lines: &mut Vec<String>,
) {
    if !shown.insert(tag) {
        lines.push(format!("{}{} (see above)", indent(depth), tag));
        return;
    }
    lines.push(format!("{}{}", indent(depth), tag));
    for dependency in dependencies.get(tag).copied().unwrap_or_default() {
        tree_lines(dependency, depth + 1, dependencies, shown, lines);
    }
}

pub fn print_dependency_tree(
    pages: &[PageInspection],
    components: &[ComponentSummary],
    root: &Path,
) {
    for line in format_dependency_tree(pages, components, root) {
        println!("{}", line);
    }
}

// ============================================================================
// Build
// ============================================================================

/// Format one progress event from a build.
pub fn format_build_event(event: &BuildEvent, root: &Path) -> Vec<String> {
    match event {
        BuildEvent::PageWritten {
            source,
            dest,
            components,
        } => {
            let mut lines = vec![format!(
                "{} \u{2192} {}",
                display_path(source, root),
                display_path(dest, root)
            )];
            if !components.is_empty() {
                lines.push(format!("{}Components: {}", indent(1), components.join(", ")));
            }
            lines
        }
        BuildEvent::PageFannedOut { source, count } => {
            vec![format!(
                "{} \u{2192} {}",
                display_path(source, root),
                plural(*count, "page")
            )]
        }
    }
}

/// Format the summary printed after a build.
pub fn format_build_summary(report: &BuildReport, root: &Path) -> Vec<String> {
    vec![
        String::new(),
        format!(
            "Built {} with {} \u{2192} {}",
            plural(report.pages, "page"),
            plural(report.components, "component"),
            display_path(&report.output, root)
        ),
        format!("Assets: {}", report.assets),
    ]
}

pub fn print_build_summary(report: &BuildReport, root: &Path) {
    for line in format_build_summary(report, root) {
        println!("{}", line);
    }
}

// ============================================================================
// Cycle
// ============================================================================

/// Format a dependency cycle as a staircase of component paths.
pub fn format_cycle_trace(trace: &[PathBuf], root: &Path) -> Vec<String> {
    let mut lines = vec!["Dependency cycle".to_string()];
    for (depth, path) in trace.iter().enumerate() {
        lines.push(format!("{}{}", indent(depth + 1), display_path(path, root)));
    }
    lines
}

/// Cycle traces go to stderr, next to the error message.
pub fn print_cycle_trace(trace: &[PathBuf], root: &Path) {
    for line in format_cycle_trace(trace, root) {
        eprintln!("{}", line);
    }
}
