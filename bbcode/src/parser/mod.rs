pub mod error;
mod scanner;
pub mod tokenizer;
mod tree_builder;

pub use error::{ParseError, Recovery, RecoveryKind};

use crate::definition::TagLookup;
use crate::document::{Document, TreeSink};
use crate::parser::tokenizer::Tokenizer;
use crate::parser::tree_builder::TreeBuilder;

/// Options that change how input is tokenized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Read backslash escapes before brackets. When off, every backslash
    /// is literal text.
    pub escapes: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions { escapes: true }
    }
}

/// Parser entry point.
///
/// Holds only shared, read-only configuration; every call builds its own
/// tree, so one parser can serve many parses, concurrently if `L: Sync`.
pub struct Parser<'d, L: TagLookup + ?Sized> {
    lookup: &'d L,
    options: ParserOptions,
}

impl<'d, L: TagLookup + ?Sized> Parser<'d, L> {
    pub fn new(lookup: &'d L) -> Self {
        Parser {
            lookup,
            options: ParserOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse input into a fresh document.
    pub fn parse(&self, input: &str) -> Result<Document, ParseError> {
        self.parse_with_recoveries(input).map(|(document, _)| document)
    }

    /// Parse input, also returning every bracket sequence kept as literal text.
    pub fn parse_with_recoveries(
        &self,
        input: &str,
    ) -> Result<(Document, Vec<Recovery>), ParseError> {
        let mut document = Document::new();
        let recoveries = self.parse_into(input, &mut document)?;
        Ok((document, recoveries))
    }

    /// Parse into a caller-supplied sink.
    pub fn parse_into<S: TreeSink>(
        &self,
        input: &str,
        sink: &mut S,
    ) -> Result<Vec<Recovery>, ParseError> {
        let tokens = Tokenizer::new(input).with_escapes(self.options.escapes);
        TreeBuilder::new(self.lookup, sink).run(tokens)
    }
}
