//! Bracketed markup (BBCode) parsing.
//!
//! Raw text is split into bracket and text tokens, bracket sequences are
//! checked against a [`TagLookup`], and the result is an arena-backed
//! [`Document`] tree. Malformed markup never fails a parse: it is kept as
//! literal text and reported as a [`Recovery`].
//!
//! ```
//! use bbcode::definition::{DefinitionSet, TagDefinition};
//! use bbcode::parser::Parser;
//!
//! let mut definitions = DefinitionSet::new();
//! definitions.insert(TagDefinition::new("b", "<strong>{param}</strong>"));
//!
//! let document = Parser::new(&definitions).parse("ab[b]cd[/b]ef").unwrap();
//! assert_eq!(document.children(document.root()).len(), 3);
//! assert_eq!(document.to_string(), "ab[b]cd[/b]ef");
//! ```

pub mod definition;
pub mod document;
pub mod parser;
pub mod validator;

pub use definition::{DefinitionSet, TagDefinition, TagLookup, TagQuery};
pub use document::{Document, Element, NodeId, NodeKind, TagOptions, TreeSink};
pub use parser::{ParseError, Parser, ParserOptions, Recovery, RecoveryKind};
pub use validator::{Validator, ValidatorSet};
