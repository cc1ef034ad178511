use std::fmt;

use crate::document::{Document, NodeId, NodeKind};

impl Document {
    /// Minimal BBCode for the subtree at `id`.
    ///
    /// Reparsing the output with the same definitions yields the same tree.
    /// Elements left open at end of input gain an explicit closing tag.
    pub fn to_bbcode(&self, id: NodeId) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_bbcode(id, &mut out);
        out
    }

    pub fn write_bbcode(&self, id: NodeId, f: &mut impl fmt::Write) -> fmt::Result {
        self.write_markup(id, true, false, f)
    }

    /// Like [`to_bbcode`](Self::to_bbcode) but brackets in text are left
    /// unescaped, as a reader would have typed them.
    pub fn to_source(&self, id: NodeId) -> String {
        let mut out = String::new();
        let _ = self.write_markup(id, false, false, &mut out);
        out
    }

    /// `before_markup` is set when the output continues with a bracket.
    fn write_markup(
        &self,
        id: NodeId,
        escape: bool,
        before_markup: bool,
        f: &mut impl fmt::Write,
    ) -> fmt::Result {
        match &self.node(id).kind {
            NodeKind::Root { children } => {
                for (i, &child) in children.iter().enumerate() {
                    self.write_markup(child, escape, i + 1 < children.len(), f)?;
                }
                Ok(())
            }
            NodeKind::Text(text) => write_text(text, escape, before_markup, f),
            NodeKind::Element(element) => {
                let name = element.tag_name();
                write!(f, "[{}", name)?;
                let options = element.options();
                for (i, (key, value)) in options.iter().enumerate() {
                    if key.eq_ignore_ascii_case(name) {
                        write!(f, "=")?;
                    } else {
                        write!(f, " {}=", key)?;
                    }
                    if value.contains(char::is_whitespace) {
                        f.write_char('"')?;
                        write_text(value, escape, false, f)?;
                        f.write_char('"')?;
                    } else {
                        write_text(value, escape, i + 1 == options.len(), f)?;
                    }
                }
                write!(f, "]")?;
                for &child in element.children() {
                    self.write_markup(child, escape, true, f)?;
                }
                write!(f, "[/{}]", name)
            }
        }
    }
}

/// Brackets become `\[` and `\]`. A backslash run is doubled when a
/// bracket follows it, in the text or as markup, so it reads back unchanged.
fn write_text(
    text: &str,
    escape: bool,
    before_markup: bool,
    f: &mut impl fmt::Write,
) -> fmt::Result {
    if !escape {
        return f.write_str(text);
    }
    let mut backslashes = 0;
    for c in text.chars() {
        match c {
            '\\' => backslashes += 1,
            '[' | ']' => {
                f.write_str(&"\\".repeat(backslashes * 2 + 1))?;
                f.write_char(c)?;
                backslashes = 0;
            }
            _ => {
                f.write_str(&"\\".repeat(backslashes))?;
                f.write_char(c)?;
                backslashes = 0;
            }
        }
    }
    let trailing = if before_markup { backslashes * 2 } else { backslashes };
    f.write_str(&"\\".repeat(trailing))
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_bbcode(self.root(), f)
    }
}
