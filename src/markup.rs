//! Tolerant HTML tokenizer.
//!
//! The tag scanner only needs a flat stream of start tags, end tags and
//! everything in between, plus the exact source text of each token so a page's
//! `<head>` block can be copied verbatim into the layout. This module adapts
//! `quick-xml` to that job:
//!
//! - End-name checks are disabled and unmatched end tags are allowed, so void
//!   elements (`<meta>`, `<br>`) and sloppy nesting don't fail the build.
//! - Bare `&` in text is accepted.
//! - Tag and attribute names are lower-cased.
//! - The bodies of raw-text elements (`script`, `style`, `textarea`, `title`)
//!   are returned as a single text token without being tokenized, the way an
//!   HTML tokenizer treats them. A `<ecb-widget>` inside a JavaScript string
//!   is not a component reference.
//!
//! - A `<` that cannot start markup is text, and markup left open at the end
//!   of the input becomes a final token instead of an error.
//!
//! Every token carries `raw`, the slice of the input it was read from.
//! Concatenating the `raw` of all tokens gives back the input.

use quick_xml::Reader;
use quick_xml::errors::SyntaxError;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

/// Elements whose content is passed through untokenized.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

#[derive(Error, Debug)]
#[error("malformed markup at byte {position}: {source}")]
pub struct TokenizeError {
    pub position: usize,
    #[source]
    pub source: quick_xml::Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `<name ...>`
    Start,
    /// `<name ... />`
    SelfClosing,
    /// `</name>`
    End,
    /// Character data, including raw-text element bodies.
    Text,
    /// Comments, doctypes, processing instructions, entity references.
    Other,
}

#[derive(Debug, Clone)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Lower-cased tag name; empty for non-tag tokens.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub raw: &'a str,
}

impl<'a> Token<'a> {
    fn untagged(kind: TokenKind, raw: &'a str) -> Self {
        Self {
            kind,
            name: String::new(),
            attributes: Vec::new(),
            raw,
        }
    }

    fn tag(kind: TokenKind, elem: &BytesStart<'_>, raw: &'a str) -> Self {
        let attributes = elem
            .html_attributes()
            .with_checks(false)
            .flatten()
            .map(|attr| {
                (
                    tag_name(attr.key.as_ref()),
                    String::from_utf8_lossy(&attr.value).into_owned(),
                )
            })
            .collect();
        Self {
            kind,
            name: tag_name(elem.name().as_ref()),
            attributes,
            raw,
        }
    }

    /// True for both `<name>` and `<name/>`.
    pub fn is_start(&self) -> bool {
        matches!(self.kind, TokenKind::Start | TokenKind::SelfClosing)
    }

    pub fn is_end_of(&self, name: &str) -> bool {
        self.kind == TokenKind::End && self.name == name
    }

    /// Value of the first attribute named `name` (lower-case).
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

fn tag_name(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_ascii_lowercase()
}

/// Streaming tokenizer over a markup string.
pub struct Tokenizer<'a> {
    input: &'a str,
    reader: Reader<&'a [u8]>,
    /// Byte offset of `reader`'s input within `input`.
    offset: usize,
    /// Set after the start tag of a raw-text element.
    raw_text_until: Option<String>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            reader: tolerant_reader(input),
            offset: 0,
            raw_text_until: None,
        }
    }

    fn position(&self) -> usize {
        self.offset + self.reader.buffer_position() as usize
    }

    /// Restart reading at byte `position` of the input.
    fn seek(&mut self, position: usize) {
        self.offset = position;
        self.reader = tolerant_reader(&self.input[position..]);
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        self.input.get(start..end).unwrap_or_default()
    }

    /// Next token, or `None` at the end of the input.
    pub fn next_token(&mut self) -> Result<Option<Token<'a>>, TokenizeError> {
        if let Some(element) = self.raw_text_until.take() {
            let start = self.position();
            let end = find_end_tag(&self.input[start..], &element)
                .map_or(self.input.len(), |found| start + found);
            self.seek(end);
            if end > start {
                return Ok(Some(Token::untagged(
                    TokenKind::Text,
                    self.slice(start, end),
                )));
            }
        }

        let start = self.position();
        if let Some(end) = self.stray_less_than(start) {
            self.seek(end);
            return Ok(Some(Token::untagged(
                TokenKind::Text,
                self.slice(start, end),
            )));
        }

        let event = match self.reader.read_event() {
            Ok(event) => event,
            Err(source) => return self.recover(start, source),
        };
        let raw = self.slice(start, self.position());

        let token = match event {
            Event::Eof => return Ok(None),
            Event::Start(elem) => {
                let token = Token::tag(TokenKind::Start, &elem, raw);
                if RAW_TEXT_ELEMENTS.contains(&token.name.as_str()) {
                    self.raw_text_until = Some(token.name.clone());
                }
                token
            }
            Event::Empty(elem) => Token::tag(TokenKind::SelfClosing, &elem, raw),
            Event::End(elem) => Token {
                kind: TokenKind::End,
                name: tag_name(elem.name().as_ref()),
                attributes: Vec::new(),
                raw,
            },
            Event::Text(_) | Event::CData(_) => Token::untagged(TokenKind::Text, raw),
            _ => Token::untagged(TokenKind::Other, raw),
        };
        Ok(Some(token))
    }

    /// End of the text run starting at `start` when the input there is a `<`
    /// that cannot open markup (`a < b`, `<3`, a trailing `<`).
    fn stray_less_than(&self, start: usize) -> Option<usize> {
        let after = self.input.get(start..)?.strip_prefix('<')?;
        if after.starts_with(|c: char| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?')) {
            return None;
        }
        Some(start + 1 + after.find('<').unwrap_or(after.len()))
    }

    /// Turn markup left open at the end of the input into a final token.
    ///
    /// An unclosed comment, doctype or CDATA section runs to the end. An
    /// unclosed tag becomes text, unless an attribute quote is open: that
    /// would swallow the rest of the document and stays an error.
    fn recover(
        &mut self,
        start: usize,
        source: quick_xml::Error,
    ) -> Result<Option<Token<'a>>, TokenizeError> {
        let rest = self.slice(start, self.input.len());
        let kind = match &source {
            quick_xml::Error::Syntax(SyntaxError::UnclosedTag) if !rest.contains(['"', '\'']) => {
                TokenKind::Text
            }
            quick_xml::Error::Syntax(
                SyntaxError::UnclosedComment
                | SyntaxError::UnclosedDoctype
                | SyntaxError::UnclosedCData,
            ) => TokenKind::Other,
            _ => {
                return Err(TokenizeError {
                    position: start,
                    source,
                });
            }
        };
        self.seek(self.input.len());
        Ok(Some(Token::untagged(kind, rest)))
    }
}

fn tolerant_reader(input: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(input);
    let config = reader.config_mut();
    config.trim_text(false);
    config.enable_all_checks(false);
    config.allow_unmatched_ends = true;
    config.allow_dangling_amp = true;
    reader
}

/// Byte offset of the first `</element` in `haystack`, ignoring ASCII case.
fn find_end_tag(haystack: &str, element: &str) -> Option<usize> {
    let needle = format!("</{element}");
    haystack.to_ascii_lowercase().find(&needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token<'_>> {
        let mut tokenizer = Tokenizer::new(input);
        let mut out = Vec::new();
        while let Some(token) = tokenizer.next_token().unwrap() {
            out.push(token);
        }
        out
    }

    fn kinds_and_names(input: &str) -> Vec<(TokenKind, String)> {
        tokens(input)
            .into_iter()
            .map(|t| (t.kind, t.name))
            .collect()
    }

    #[test]
    fn raw_slices_reassemble_input() {
        let input = r#"<!DOCTYPE html><div class="x">Hi &amp; bye<br><ecb-card/></div><!-- c -->"#;
        let joined: String = tokens(input).iter().map(|t| t.raw).collect();
        assert_eq!(joined, input);
    }

    #[test]
    fn start_end_and_self_closing() {
        assert_eq!(
            kinds_and_names("<p>a</p><ecb-x/>"),
            vec![
                (TokenKind::Start, "p".to_string()),
                (TokenKind::Text, String::new()),
                (TokenKind::End, "p".to_string()),
                (TokenKind::SelfClosing, "ecb-x".to_string()),
            ]
        );
    }

    #[test]
    fn names_are_lower_cased() {
        let toks = tokens(r#"<DIV IS="ecb-x"></Div>"#);
        assert_eq!(toks[0].name, "div");
        assert_eq!(toks[0].attribute("is"), Some("ecb-x"));
        assert!(toks[1].is_end_of("div"));
    }

    #[test]
    fn void_elements_and_unmatched_ends_are_tolerated() {
        let toks = kinds_and_names("<meta charset=utf-8></span><input disabled>");
        assert_eq!(toks[0], (TokenKind::Start, "meta".to_string()));
        assert_eq!(toks[1], (TokenKind::End, "span".to_string()));
        assert_eq!(toks[2], (TokenKind::Start, "input".to_string()));
    }

    #[test]
    fn valueless_attribute_is_empty_string() {
        let toks = tokens("<input disabled>");
        assert_eq!(toks[0].attribute("disabled"), Some(""));
    }

    #[test]
    fn script_body_is_one_text_token() {
        let input = "<script>if (a < b) { el.innerHTML = '<ecb-x></ecb-x>'; }</script><p>";
        let toks = tokens(input);
        assert_eq!(toks[0].name, "script");
        assert_eq!(toks[1].kind, TokenKind::Text);
        assert_eq!(
            toks[1].raw,
            "if (a < b) { el.innerHTML = '<ecb-x></ecb-x>'; }"
        );
        assert!(toks[2].is_end_of("script"));
        assert_eq!(toks[3].name, "p");
        assert!(toks.iter().all(|t| t.name != "ecb-x"));
    }

    #[test]
    fn empty_script_has_no_text_token() {
        assert_eq!(
            kinds_and_names("<script></SCRIPT>"),
            vec![
                (TokenKind::Start, "script".to_string()),
                (TokenKind::End, "script".to_string()),
            ]
        );
    }

    #[test]
    fn unterminated_script_runs_to_end() {
        let toks = tokens("<style>p { color: red }");
        assert_eq!(toks.len(), 2);
        assert_eq!(toks[1].raw, "p { color: red }");
    }

    #[test]
    fn less_than_before_space_is_text() {
        let input = "<p>a < b <ecb-x></ecb-x></p>";
        let toks = tokens(input);
        assert!(toks.iter().any(|t| t.kind == TokenKind::Start && t.name == "ecb-x"));
        let joined: String = toks.iter().map(|t| t.raw).collect();
        assert_eq!(joined, input);
    }

    #[test]
    fn trailing_less_than_is_text() {
        let toks = tokens("<p>x</p><");
        let last = toks.last().unwrap();
        assert_eq!(last.kind, TokenKind::Text);
        assert_eq!(last.raw, "<");
    }

    #[test]
    fn unclosed_tag_at_end_is_text() {
        let toks = tokens("<p></p><ecb-x");
        assert_eq!(toks.last().unwrap().kind, TokenKind::Text);
        assert_eq!(toks.last().unwrap().raw, "<ecb-x");
    }

    #[test]
    fn unterminated_comment_runs_to_end() {
        let toks = tokens("<ecb-x></ecb-x><!-- unterminated");
        assert_eq!(toks[0].name, "ecb-x");
        let last = toks.last().unwrap();
        assert_eq!(last.kind, TokenKind::Other);
        assert_eq!(last.raw, "<!-- unterminated");
    }

    #[test]
    fn unclosed_attribute_quote_is_error() {
        let mut tokenizer = Tokenizer::new("<p>ok</p><div class=\"x>oops</div>");
        let err = loop {
            match tokenizer.next_token() {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("expected a tokenize error"),
                Err(err) => break err,
            }
        };
        assert_eq!(err.position, 9);
    }

    #[test]
    fn empty_input_has_no_tokens() {
        assert!(tokens("").is_empty());
    }
}
