use std::ops::Range;

use crate::definition::{TagLookup, TagQuery};
use crate::document::TreeSink;
use crate::parser::error::{ParseError, Recovery, RecoveryKind};
use crate::parser::scanner::{self, Scan, ScannedTag};
use crate::parser::tokenizer::{TokenKind, Tokenizer};

/// Entry in the stack of open elements. The top is the insertion point.
struct OpenElement<H> {
    handle: H,
    /// Definition name, for closing-tag matching and nesting counts.
    name: String,
    /// Body is literal text up to the matching closing tag.
    raw: bool,
    /// Openers rejected by the nesting limit while this element was the
    /// insertion point. Their closing tags stay literal too.
    suppressed: Vec<String>,
}

/// Single-pass builder: consumes tokens and appends to a [`TreeSink`].
pub(crate) struct TreeBuilder<'a, L: ?Sized, S: TreeSink> {
    lookup: &'a L,
    sink: &'a mut S,
    root: S::Handle,
    open: Vec<OpenElement<S::Handle>>,
    recoveries: Vec<Recovery>,
}

impl<'a, L, S> TreeBuilder<'a, L, S>
where
    L: TagLookup + ?Sized,
    S: TreeSink,
{
    pub(crate) fn new(lookup: &'a L, sink: &'a mut S) -> Self {
        let root = sink.root();
        TreeBuilder {
            lookup,
            sink,
            root,
            open: Vec::new(),
            recoveries: Vec::new(),
        }
    }

    /// Run to end of input. Elements still open stay in the tree as they are.
    pub(crate) fn run(mut self, mut tokens: Tokenizer<'_>) -> Result<Vec<Recovery>, ParseError> {
        while let Some(token) = tokens.next() {
            match token.kind {
                TokenKind::Text(text) => self.text(text),
                TokenKind::Close => self.text("]"),
                TokenKind::Open => self.bracket(&mut tokens, token.span)?,
            }
        }
        Ok(self.recoveries)
    }

    fn current(&self) -> S::Handle {
        self.open.last().map_or(self.root, |element| element.handle)
    }

    fn in_raw_element(&self) -> bool {
        self.open.last().is_some_and(|element| element.raw)
    }

    fn text(&mut self, text: &str) {
        let parent = self.current();
        self.sink.append_text(parent, text);
    }

    /// Emit a whole `[...]` pair as literal text.
    fn literal(&mut self, tag: &ScannedTag) {
        self.text("[");
        self.text(&tag.raw);
        self.text("]");
    }

    fn recover(&mut self, kind: RecoveryKind, span: Range<usize>) {
        tracing::debug!(span = ?span, "{kind}; keeping literal text");
        self.recoveries.push(Recovery::new(kind, span));
    }

    fn bracket(&mut self, tokens: &mut Tokenizer<'_>, open: Range<usize>) -> Result<(), ParseError> {
        let tag = match scanner::scan(tokens, open) {
            Scan::Tag(tag) => tag,
            Scan::Unterminated { content, span } => {
                self.text("[");
                self.text(&content);
                if !self.in_raw_element() {
                    self.recover(RecoveryKind::Unterminated, span);
                }
                return Ok(());
            }
        };

        if self.in_raw_element() {
            self.raw_bracket(&tag);
            return Ok(());
        }

        match tag.closing_name() {
            Some(target) => {
                self.close(target, &tag);
                Ok(())
            }
            None => self.open(tag),
        }
    }

    /// Inside a raw element only its own closing tag is markup.
    fn raw_bracket(&mut self, tag: &ScannedTag) {
        let closes_raw = tag.options.len() <= 1
            && tag.closing_name().is_some_and(|target| {
                self.open
                    .last()
                    .is_some_and(|element| self.lookup.names_match(target, &element.name))
            });
        if closes_raw {
            self.open.pop();
        } else {
            self.literal(tag);
        }
    }

    /// Close the nearest open element named `target` and everything inside it.
    fn close(&mut self, target: &str, tag: &ScannedTag) {
        let lookup = self.lookup;
        let mut matched = None;
        for index in (0..self.open.len()).rev() {
            let element = &mut self.open[index];
            if let Some(position) = element
                .suppressed
                .iter()
                .rposition(|name| lookup.names_match(target, name))
            {
                element.suppressed.remove(position);
                self.literal(tag);
                return;
            }
            if lookup.names_match(target, &element.name) {
                matched = Some(index);
                break;
            }
        }

        match matched {
            Some(index) if tag.options.len() <= 1 => self.open.truncate(index),
            Some(_) => {
                self.literal(tag);
                self.recover(
                    RecoveryKind::MalformedClosingTag(target.to_owned()),
                    tag.span.clone(),
                );
            }
            None => {
                self.literal(tag);
                self.recover(
                    RecoveryKind::UnmatchedClosingTag(target.to_owned()),
                    tag.span.clone(),
                );
            }
        }
    }

    fn open(&mut self, tag: ScannedTag) -> Result<(), ParseError> {
        if tag.name.is_empty() {
            self.literal(&tag);
            self.recover(RecoveryKind::EmptyTagName, tag.span);
            return Ok(());
        }

        let query = TagQuery {
            name: &tag.name,
            has_option: !tag.options.is_empty(),
            open_ancestors: self
                .open
                .iter()
                .filter(|element| self.lookup.names_match(&tag.name, &element.name))
                .count(),
        };

        if !self.lookup.exists(&query) {
            let unlimited = TagQuery {
                open_ancestors: 0,
                ..query
            };
            let kind = if query.open_ancestors > 0 && self.lookup.exists(&unlimited) {
                if let Some(top) = self.open.last_mut() {
                    top.suppressed.push(tag.name.clone());
                }
                RecoveryKind::NestLimit(tag.name.clone())
            } else {
                RecoveryKind::UnknownTag(tag.name.clone())
            };
            self.literal(&tag);
            self.recover(kind, tag.span);
            return Ok(());
        }

        let definition = self
            .lookup
            .get(&query)
            .cloned()
            .ok_or_else(|| ParseError::LookupDivergence {
                tag: tag.name.clone(),
            })?;

        tracing::trace!(tag = definition.name(), options = tag.options.len(), "open element");

        let entry_name = definition.name().to_owned();
        let raw = !definition.parse_content();
        let parent = self.current();
        let handle = self.sink.append_element(parent, definition, tag.options);
        self.open.push(OpenElement {
            handle,
            name: entry_name,
            raw,
            suppressed: Vec::new(),
        });
        Ok(())
    }
}
