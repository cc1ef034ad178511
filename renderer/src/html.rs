use bbcode::{Document, Element, NodeId, NodeKind};

use crate::escape::escape_html;
use crate::template;

/// Which template of each tag definition to fill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderMode {
    #[default]
    Html,
    Preview,
}

/// Walks a parsed document and assembles HTML from each element's template.
///
/// Elements whose options or body fail their validators are not rendered;
/// their BBCode source is emitted as escaped text instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer {
    mode: RenderMode,
}

impl HtmlRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: RenderMode) -> Self {
        HtmlRenderer { mode }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn render(&self, document: &Document) -> String {
        self.render_node(document, document.root())
    }

    /// Render the subtree at `id`.
    pub fn render_node(&self, document: &Document, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(document, id, &mut out);
        out
    }

    fn write_node(&self, document: &Document, id: NodeId, out: &mut String) {
        match document.node(id).kind() {
            NodeKind::Root { children } => {
                for &child in children {
                    self.write_node(document, child, out);
                }
            }
            NodeKind::Text(text) => out.push_str(&escape_html(text)),
            NodeKind::Element(element) => self.write_element(document, id, element, out),
        }
    }

    fn write_element(&self, document: &Document, id: NodeId, element: &Element, out: &mut String) {
        let definition = element.definition();

        if let Some(validator) = rejected_by(document, id, element) {
            tracing::debug!(
                tag = definition.name(),
                validator,
                "validation failed, rendering source"
            );
            out.push_str(&escape_html(&document.to_source(id)));
            return;
        }

        let body = if definition.parse_content() {
            let mut body = String::new();
            for &child in element.children() {
                self.write_node(document, child, &mut body);
            }
            body
        } else {
            escape_html(&document.text_content(id))
        };

        // `{option}` is the tag's own option; every key also fills `{key}`.
        let mut options: Vec<(&str, String)> = element
            .options()
            .iter()
            .map(|(key, value)| (key, escape_html(value)))
            .collect();
        if let Some(value) = element.option() {
            options.push(("option", escape_html(value)));
        }
        let mut values: Vec<(&str, &str)> = options
            .iter()
            .map(|(key, value)| (*key, value.as_str()))
            .collect();
        values.push(("param", body.as_str()));

        let html = match self.mode {
            RenderMode::Html => definition.html(),
            RenderMode::Preview => definition.preview_html(),
        };
        out.push_str(&template::fill(html, &values));
    }
}

/// Name of the first validator that rejects this element, if any.
///
/// Option validators see each option value. The body validator sees the
/// literal body and only applies when content is not parsed.
fn rejected_by<'e>(document: &Document, id: NodeId, element: &'e Element) -> Option<&'e str> {
    let definition = element.definition();

    for (key, value) in element.options().iter() {
        if let Some(validator) = definition.option_validator(key) {
            if !validator.validate(value) {
                return Some(validator.name());
            }
        }
    }

    if !definition.parse_content() {
        if let Some(validator) = definition.body_validator() {
            if !validator.validate(&document.text_content(id)) {
                return Some(validator.name());
            }
        }
    }

    None
}
