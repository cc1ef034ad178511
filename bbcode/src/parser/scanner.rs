use std::iter;
use std::mem;
use std::ops::Range;

use crate::document::TagOptions;
use crate::parser::tokenizer::{TokenKind, Tokenizer};

/// Marker that turns a tag name into a closing tag.
const CLOSING_MARKER: char = '/';

/// Result of scanning from an opening bracket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Scan {
    Tag(ScannedTag),
    /// No `]` before end of input or before another `[`. `content` is the
    /// text captured after the opening bracket.
    Unterminated { content: String, span: Range<usize> },
}

/// The contents of one `[...]` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScannedTag {
    /// Text between the brackets, escapes resolved.
    pub(crate) raw: String,
    /// Tag name as written, closing marker included.
    pub(crate) name: String,
    pub(crate) options: TagOptions,
    /// From the opening bracket through the closing bracket.
    pub(crate) span: Range<usize>,
}

impl ScannedTag {
    /// For `[/name]`, the name without its marker.
    pub(crate) fn closing_name(&self) -> Option<&str> {
        self.name.strip_prefix(CLOSING_MARKER)
    }
}

/// Capture tag content after the `[` at `open`.
///
/// A nested `[` is left unconsumed so the caller restarts on it; this keeps
/// inputs like `[[[[` linear.
pub(crate) fn scan(tokens: &mut Tokenizer<'_>, open: Range<usize>) -> Scan {
    let mut raw = String::new();
    let mut end = open.end;

    while let Some(token) = tokens.peek() {
        match token.kind {
            TokenKind::Open => break,
            TokenKind::Close => {
                tokens.next();
                let (name, options) = split_tag_content(&raw);
                return Scan::Tag(ScannedTag {
                    raw,
                    name,
                    options,
                    span: open.start..token.span.end,
                });
            }
            TokenKind::Text(text) => {
                tokens.next();
                raw.push_str(text);
                end = token.span.end;
            }
        }
    }

    Scan::Unterminated {
        content: raw,
        span: open.start..end,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Name,
    Key,
    Value,
    QuotedValue,
}

/// Split tag content into a name and its options.
///
/// `name=value` keys the value by the tag name. Further options are
/// whitespace-separated `key=value` pairs, values optionally double-quoted.
/// When keyed options follow a bare name, the name gets an empty value so
/// that keys and values stay paired.
pub(crate) fn split_tag_content(content: &str) -> (String, TagOptions) {
    let mut state = State::Name;
    let mut buffer = String::new();
    let mut keys: Vec<String> = Vec::new();
    let mut values: Vec<String> = Vec::new();

    for c in content.chars().map(Some).chain(iter::once(None)) {
        match state {
            State::Name => match c {
                Some('=') => {
                    keys.push(mem::take(&mut buffer));
                    state = State::Value;
                }
                Some(c) if c.is_whitespace() => {
                    if !buffer.is_empty() {
                        keys.push(mem::take(&mut buffer));
                        state = State::Key;
                    }
                }
                Some(c) => buffer.push(c),
                None => keys.push(mem::take(&mut buffer)),
            },
            State::Key => match c {
                Some('=') => {
                    keys.push(mem::take(&mut buffer));
                    state = State::Value;
                }
                Some(c) if c.is_whitespace() => {}
                Some(c) => buffer.push(c),
                None => {}
            },
            State::Value => match c {
                Some('"') if buffer.is_empty() => state = State::QuotedValue,
                Some(c) if c.is_whitespace() => {
                    values.push(mem::take(&mut buffer));
                    state = State::Key;
                }
                Some(c) => buffer.push(c),
                None => values.push(mem::take(&mut buffer)),
            },
            State::QuotedValue => match c {
                Some('"') | None => {
                    values.push(mem::take(&mut buffer));
                    state = State::Key;
                }
                Some(c) => buffer.push(c),
            },
        }
    }

    // The first key is always the tag name.
    let name = keys.first().cloned().unwrap_or_default();
    let mut options = TagOptions::new();
    if !values.is_empty() {
        if keys.len() == values.len() + 1 {
            values.insert(0, String::new());
        }
        if keys.len() == values.len() {
            for (key, value) in keys.into_iter().zip(values) {
                options.insert(key, value);
            }
        }
    }
    (name, options)
}
