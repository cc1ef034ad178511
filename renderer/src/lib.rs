pub mod escape;
pub mod html;
pub mod template;

pub use escape::escape_html;
pub use html::{HtmlRenderer, RenderMode};

use bbcode::Document;

/// Render a whole document with each tag's `html` template.
pub fn render_html(document: &Document) -> String {
    HtmlRenderer::new().render(document)
}

/// Render a whole document with each tag's preview template.
pub fn render_preview(document: &Document) -> String {
    HtmlRenderer::with_mode(RenderMode::Preview).render(document)
}

/// The document's text with all markup removed.
pub fn render_text(document: &Document) -> String {
    document.text_content(document.root())
}
