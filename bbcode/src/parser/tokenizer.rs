use std::ops::Range;

/// The kind of a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind<'a> {
    /// A run of literal text. Escaped brackets and backslashes arrive as
    /// one-character runs.
    Text(&'a str),
    /// `[`
    Open,
    /// `]`
    Close,
}

/// A token with its byte span in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Range<usize>,
}

/// Lazily splits raw input into text runs and bracket tokens.
///
/// The tokenizer does no interpretation beyond escapes. A run of
/// backslashes directly before a bracket is read in pairs: `\\` is one
/// literal backslash and a final unpaired `\` makes the bracket literal.
/// Backslashes anywhere else are ordinary text. Any input, including the
/// empty string, tokenizes without error.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    source: &'a str,
    pos: usize,
    escapes: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Tokenizer {
            source,
            pos: 0,
            escapes: true,
        }
    }

    /// Enable or disable backslash escapes for brackets.
    pub fn with_escapes(mut self, escapes: bool) -> Self {
        self.escapes = escapes;
        self
    }

    pub fn has_next(&self) -> bool {
        self.pos < self.source.len()
    }

    /// Look at the next token without consuming it.
    pub fn peek(&self) -> Option<Token<'a>> {
        self.clone().next()
    }

    /// Byte offset of the next unread token.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Length of the backslash run at `at` and whether it ends at a bracket.
    fn backslash_run(&self, bytes: &[u8], at: usize) -> (usize, bool) {
        let len = bytes[at..].iter().take_while(|&&b| b == b'\\').count();
        let escapes = self.escapes && len > 0 && matches!(bytes.get(at + len), Some(b'[' | b']'));
        (len, escapes)
    }

    /// Byte length of the text run at the start of `bytes`.
    fn text_len(&self, bytes: &[u8]) -> usize {
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'[' | b']' => break,
                b'\\' => {
                    let (len, escapes) = self.backslash_run(bytes, i);
                    if escapes {
                        break;
                    }
                    i += len;
                }
                _ => i += 1,
            }
        }
        i
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let start = self.pos;
        let rest = &self.source[start..];
        let bytes = rest.as_bytes();

        let (kind, len) = match bytes.first().copied()? {
            b'[' => (TokenKind::Open, 1),
            b']' => (TokenKind::Close, 1),
            // `\\` or `\[` or `\]`: the second byte is the literal.
            b'\\' if self.backslash_run(bytes, 0).1 => (TokenKind::Text(&rest[1..2]), 2),
            _ => {
                // Brackets and backslashes are ASCII, so every stop is a char boundary.
                let len = self.text_len(bytes);
                (TokenKind::Text(&rest[..len]), len)
            }
        };

        self.pos += len;
        Some(Token {
            kind,
            span: start..self.pos,
        })
    }
}
