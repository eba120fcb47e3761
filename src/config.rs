//! Project configuration.
//!
//! Handles loading, merging and validating `ecb.toml`. Every key is optional:
//! stock defaults are serialized to a TOML table and the user's file is merged
//! on top of it, so a config file only needs the values it changes.
//!
//! ## Config File Location
//!
//! `ecb.toml` lives in the project root, next to the source directories:
//!
//! ```text
//! project/
//! ├── ecb.toml             # Optional, all keys have defaults
//! ├── app.html             # Layout every page is merged into
//! ├── components/          # One component per .html file
//! │   ├── ecb-button.html
//! │   └── forms/
//! │       └── ecb_text_field.html   # → <ecb-text-field>
//! ├── pages/               # One output file per .html file
//! │   ├── index.html
//! │   └── [slug]/index.html         # Fan-out source (see below)
//! └── assets/              # Copied to dist/assets/
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! verbose = true                # Log progress (info level)
//!
//! [paths]                       # Relative to the project root
//! components = "components"
//! pages = "pages"
//! assets = "assets"
//! output = "dist"
//! assets_output = "assets"      # Relative to `output`
//! layout = "app.html"
//!
//! [components]
//! prefix = "ecb-"               # Every component tag must start with this
//! allow_is_attribute = false    # Also detect <button is="ecb-fancy">
//! head_tag = "head"             # Page metadata block merged into the layout
//!
//! [[fan_out]]                   # Generate one page per value
//! page = "[slug]/index.html"    # Relative to the pages directory
//! placeholder = "[slug]"
//! values = ["foo", "bar"]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file in the project root.
pub const CONFIG_FILENAME: &str = "ecb.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project configuration loaded from `ecb.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Log build progress at info level.
    pub verbose: bool,
    /// Source and output locations.
    pub paths: PathsConfig,
    /// Component tag conventions.
    pub components: ComponentsConfig,
    /// Pages generated once per value instead of once per file.
    pub fan_out: Vec<FanOutRule>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            verbose: true,
            paths: PathsConfig::default(),
            components: ComponentsConfig::default(),
            fan_out: Vec::new(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.components.prefix.is_empty() {
            return Err(ConfigError::Validation(
                "components.prefix must not be empty".into(),
            ));
        }
        if self.components.head_tag.is_empty() {
            return Err(ConfigError::Validation(
                "components.head_tag must not be empty".into(),
            ));
        }
        // Tag names are lower-cased when markup is tokenized.
        for (key, value) in [
            ("prefix", &self.components.prefix),
            ("head_tag", &self.components.head_tag),
        ] {
            if value.chars().any(|c| c.is_ascii_uppercase()) {
                return Err(ConfigError::Validation(format!(
                    "components.{key} `{value}` must be lower-case"
                )));
            }
        }
        if self.components.head_tag.starts_with(&self.components.prefix) {
            return Err(ConfigError::Validation(format!(
                "components.head_tag `{}` must not start with the component prefix",
                self.components.head_tag
            )));
        }
        for rule in &self.fan_out {
            if rule.placeholder.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "fan_out for `{}` has an empty placeholder",
                    rule.page
                )));
            }
            if !rule.page.contains(&rule.placeholder) {
                return Err(ConfigError::Validation(format!(
                    "fan_out page `{}` does not contain its placeholder `{}`",
                    rule.page, rule.placeholder
                )));
            }
        }
        Ok(())
    }

    /// Resolve all configured paths against the project root.
    pub fn project_paths(&self, root: &Path) -> ProjectPaths {
        let output = root.join(&self.paths.output);
        ProjectPaths {
            components: root.join(&self.paths.components),
            pages: root.join(&self.paths.pages),
            assets: root.join(&self.paths.assets),
            assets_output: output.join(&self.paths.assets_output),
            layout: root.join(&self.paths.layout),
            output,
        }
    }
}

/// Source and output locations, relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub components: String,
    pub pages: String,
    pub assets: String,
    pub output: String,
    /// Where assets land, relative to `output`.
    pub assets_output: String,
    /// Layout template every page is merged into.
    pub layout: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            components: "components".to_string(),
            pages: "pages".to_string(),
            assets: "assets".to_string(),
            output: "dist".to_string(),
            assets_output: "assets".to_string(),
            layout: "app.html".to_string(),
        }
    }
}

/// Component tag conventions shared by discovery and the tag scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComponentsConfig {
    /// Required prefix of every component tag, e.g. `ecb-`.
    pub prefix: String,
    /// Treat `is="<prefix>..."` on any element as a component reference.
    /// Customized built-in elements have limited browser support, so this is
    /// off by default.
    pub allow_is_attribute: bool,
    /// Element whose contents a page contributes to the layout's `head`.
    /// Components may not contain it.
    pub head_tag: String,
}

impl Default for ComponentsConfig {
    fn default() -> Self {
        Self {
            prefix: "ecb-".to_string(),
            allow_is_attribute: false,
            head_tag: "head".to_string(),
        }
    }
}

/// One page source rendered once per value.
///
/// The placeholder is replaced (first occurrence) in both the source and
/// destination path, and the value is visible to the page template under the
/// placeholder's name without brackets: `[slug]` → `{{ slug }}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FanOutRule {
    /// Page path relative to the pages directory.
    pub page: String,
    pub placeholder: String,
    pub values: Vec<String>,
}

impl FanOutRule {
    /// Template variable name carrying the current value.
    pub fn variable(&self) -> &str {
        self.placeholder
            .trim_start_matches(['[', '{'])
            .trim_end_matches([']', '}'])
    }
}

/// Configured locations resolved against a project root.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectPaths {
    pub components: PathBuf,
    pub pages: PathBuf,
    pub assets: PathBuf,
    pub output: PathBuf,
    pub assets_output: PathBuf,
    pub layout: PathBuf,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, so a
///   `[[fan_out]]` list in the overlay replaces the default list.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `ecb.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no config file.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config for the project rooted at `root`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `ecb.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# ecb configuration
# =================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# Log build progress. `--quiet` on the command line overrides this.
verbose = true

# ---------------------------------------------------------------------------
# Paths (relative to the directory holding this file)
# ---------------------------------------------------------------------------
[paths]
# One component per .html file, searched recursively.
components = "components"

# One output page per .html file, searched recursively.
pages = "pages"

# Static files copied as-is; unchanged files are skipped.
assets = "assets"

# Build output. pages/blog/index.html -> dist/blog/index.html
output = "dist"

# Where assets land inside the output directory.
assets_output = "assets"

# Layout template. Receives `content`, `head` and `components`.
layout = "app.html"

# ---------------------------------------------------------------------------
# Components
# ---------------------------------------------------------------------------
[components]
# Tag prefix. components/ecb_card.html defines <ecb-card>.
prefix = "ecb-"

# Also treat <button is="ecb-fancy-button"> as using ecb-fancy-button.
# Customized built-in elements have limited browser support.
allow_is_attribute = false

# Block a page uses to contribute markup to the layout's <head>.
head_tag = "head"

# ---------------------------------------------------------------------------
# Fan-out pages
# ---------------------------------------------------------------------------
# Render one page source once per value. The placeholder is replaced in the
# output path and the value is available to the template as `{{ slug }}`.
#
# [[fan_out]]
# page = "[slug]/index.html"
# placeholder = "[slug]"
# values = ["foo", "bar", "baz"]
"##
}
