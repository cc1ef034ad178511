use std::fmt;
use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label};

/// Fatal parse failure. Malformed markup is never one of these: only a
/// [`TagLookup`](crate::TagLookup) that breaks its own contract is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("tag lookup reported `{tag}` as defined but returned no definition")]
    LookupDivergence { tag: String },
}

/// Why a bracket sequence was kept as literal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryKind {
    /// `[` with no `]` before end of input or the next `[`.
    Unterminated,
    /// `[]`, `[=x]` and similar.
    EmptyTagName,
    UnknownTag(String),
    /// The tag exists but too many of it are already open.
    NestLimit(String),
    /// `[/name]` with no open `name`.
    UnmatchedClosingTag(String),
    /// `[/name a=1 b=2]`.
    MalformedClosingTag(String),
}

impl fmt::Display for RecoveryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryKind::Unterminated => write!(f, "unterminated tag"),
            RecoveryKind::EmptyTagName => write!(f, "empty tag name"),
            RecoveryKind::UnknownTag(name) => write!(f, "unknown tag: {}", name),
            RecoveryKind::NestLimit(name) => write!(f, "nesting limit reached for tag: {}", name),
            RecoveryKind::UnmatchedClosingTag(name) => {
                write!(f, "closing tag without open element: {}", name)
            }
            RecoveryKind::MalformedClosingTag(name) => {
                write!(f, "closing tag with options: {}", name)
            }
        }
    }
}

/// A locally recovered markup problem with its byte span in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovery {
    pub kind: RecoveryKind,
    pub span: Range<usize>,
}

impl Recovery {
    pub fn new(kind: RecoveryKind, span: Range<usize>) -> Self {
        Recovery { kind, span }
    }

    /// Convert to a codespan-reporting warning for display.
    pub fn to_diagnostic(&self, file_id: usize) -> Diagnostic<usize> {
        Diagnostic::warning()
            .with_message(self.kind.to_string())
            .with_labels(vec![Label::primary(file_id, self.span.clone())])
            .with_notes(vec!["kept as literal text".to_owned()])
    }
}

impl fmt::Display for Recovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}..{}", self.kind, self.span.start, self.span.end)
    }
}
