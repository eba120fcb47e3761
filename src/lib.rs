//! # ecb
//!
//! A static site compiler for pages built from reusable web components.
//! Components are `.html` files named after the custom element they define;
//! pages use them by tag, and every page is merged into one shared layout.
//!
//! # Architecture: Check, Then Build
//!
//! ```text
//! 1. Components   components/*.html  →  Registry        (render + scan tags)
//! 2. Graph        Registry           →  DependencyGraph (resolve, reject cycles)
//! 3. Pages        pages/*.html       →  dist/*.html     (staged pipeline per page)
//! 4. Assets       assets/            →  dist/assets/    (copy what changed)
//! ```
//!
//! Steps 1 and 2 run once, before any page. A page can only be built against a
//! complete and acyclic component graph, so every dependency problem is
//! reported before output is touched.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`site`] | Whole-site operations: `check`, `build`, `inspect` |
//! | [`component`] | Component discovery and the `Registry` arena |
//! | [`graph`] | Dependency resolution, cycle detection, per-page closure |
//! | [`pipeline`] | Page stages, the stage driver and the fan-out hook |
//! | [`page`] | The page value and its output path |
//! | [`scan`] | Finds component tags and the `<head>` block in rendered markup |
//! | [`markup`] | Tolerant HTML tokenizer over `quick-xml` |
//! | [`template`] | `minijinja` environment shared by components, pages and the layout |
//! | [`naming`] | File name → tag convention and source file listing |
//! | [`ids`] | Short random ids for templates |
//! | [`assets`] | Modification-time based asset copying |
//! | [`config`] | `ecb.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Components Are Rendered Once
//!
//! A component's template is expanded a single time, at discovery. The tags
//! it references are read from the rendered markup, so a component can pick
//! its children with template logic. The layout receives each used component's
//! rendered content and decides where to put it (typically one `<template>`
//! per component).
//!
//! ## Dependencies Before Dependents
//!
//! The layout's `components` list is ordered so that every component comes
//! after the components it uses. Definitions emitted in that order never refer
//! to an element that is not defined yet.
//!
//! ## Fan-Out Pages
//!
//! A page path with a placeholder (`pages/[slug]/index.html`) can be listed in
//! `ecb.toml` with a set of values. It then produces one page per value and is
//! never written itself. See [`pipeline`].

pub mod assets;
pub mod component;
pub mod config;
pub mod graph;
pub mod ids;
pub mod markup;
pub mod naming;
pub mod output;
pub mod page;
pub mod pipeline;
pub mod scan;
pub mod site;
pub mod template;

#[cfg(test)]
pub(crate) mod test_helpers;
