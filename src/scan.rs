//! Component tag scanning.
//!
//! Finds which components a block of rendered markup uses. The scanner walks
//! the token stream from [`crate::markup`] and records every start tag whose
//! name carries the component prefix:
//!
//! ```text
//! <ecb-card>                 → ecb-card
//!   <ecb-avatar/>            → ecb-avatar
//!   <button is="ecb-fancy">  → ecb-fancy (only with allow_is_attribute)
//!   <ecb-card>               → (already seen)
//! ```
//!
//! Tags are returned once each, in the order they first appear, so the
//! component order of a generated page is stable across builds.
//!
//! ## The Head Block
//!
//! Pages may contain a head block (`<head>` by default). Its raw contents are
//! cut out as the page's head fragment, which the layout places in its own
//! `<head>`. Nothing inside the block is treated as a component reference.
//! Components contribute to pages, never to the document head, so a head
//! block inside a component is an error.

use crate::config::ComponentsConfig;
use crate::markup::{TokenKind, TokenizeError, Tokenizer};
use crate::naming::is_component_tag;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("<{0}> is not allowed inside a component")]
    HeadInComponent(String),
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
}

/// Where the scanned markup comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupContext {
    Component,
    Page,
}

/// Result of scanning one block of markup.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TagScan {
    /// Distinct component tags in first-seen order.
    pub tags: Vec<String>,
    /// Trimmed raw contents of the head block(s). Always empty for components.
    pub head: String,
}

/// Ordered set of tags.
#[derive(Default)]
struct TagSet {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl TagSet {
    fn insert(&mut self, tag: &str) {
        if self.seen.insert(tag.to_string()) {
            self.ordered.push(tag.to_string());
        }
    }
}

/// Scan `markup` for component references and, for pages, the head fragment.
pub fn scan(
    markup: &str,
    context: MarkupContext,
    options: &ComponentsConfig,
) -> Result<TagScan, ScanError> {
    let mut tokens = Tokenizer::new(markup);
    let mut tags = TagSet::default();
    let mut head = String::new();

    while let Some(token) = tokens.next_token()? {
        if !token.is_start() {
            continue;
        }

        if token.name == options.head_tag {
            if context == MarkupContext::Component {
                return Err(ScanError::HeadInComponent(token.name));
            }
            if token.kind == TokenKind::Start {
                collect_head(&mut tokens, &options.head_tag, &mut head)?;
            }
            continue;
        }

        if is_component_tag(&token.name, &options.prefix) {
            tags.insert(&token.name);
            continue;
        }

        if options.allow_is_attribute
            && let Some(value) = token.attribute("is")
            && is_component_tag(value, &options.prefix)
        {
            tags.insert(value);
        }
    }

    let head = match context {
        MarkupContext::Page => head.trim().to_string(),
        MarkupContext::Component => String::new(),
    };

    Ok(TagScan {
        tags: tags.ordered,
        head,
    })
}

/// Append the raw markup of every token up to the closing head tag.
fn collect_head(
    tokens: &mut Tokenizer<'_>,
    head_tag: &str,
    head: &mut String,
) -> Result<(), ScanError> {
    while let Some(token) = tokens.next_token()? {
        if token.is_end_of(head_tag) {
            break;
        }
        head.push_str(token.raw);
    }
    Ok(())
}
