//! HTML rendering of section trees.
//!
//! Sections are rendered depth-first in document order: heading, blocks, then
//! nested sections one level deeper. Heading levels start at `<h2>` for the
//! top level and stop at `<h6>`.

use crate::model::{walk, Block, BlockContent, Detail, Document, Section, Walk};

pub const MIN_HEADING_LEVEL: usize = 2;
pub const MAX_HEADING_LEVEL: usize = 6;

/// Heading level for sections at `depth` (1-based).
pub fn heading_level(depth: usize) -> usize {
    (depth.max(1) + 1).min(MAX_HEADING_LEVEL)
}

/// Render a section sequence whose first level sits at `depth`.
pub fn render_sections(sections: &[Section], depth: usize) -> String {
    fragments(sections, depth).collect()
}

/// Lazily produce one markup fragment per section.
pub fn fragments(sections: &[Section], depth: usize) -> Fragments<'_> {
    Fragments {
        walk: walk(sections),
        offset: depth.max(1) - 1,
    }
}

#[derive(Debug)]
pub struct Fragments<'a> {
    walk: Walk<'a>,
    offset: usize,
}

impl Iterator for Fragments<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let (depth, section) = self.walk.next()?;
        Some(render_section(section, depth + self.offset))
    }
}

fn render_section(section: &Section, depth: usize) -> String {
    let level = heading_level(depth);
    let mut html = format!("<h{level} class=\"mt-4 mb-3 text-break\">{}", escape(&section.title));
    if let Some(subtitle) = section.subtitle.as_deref().filter(|s| !s.is_empty()) {
        html.push_str(&format!(" <small class=\"text-muted\">({})</small>", escape(subtitle)));
    }
    html.push_str(&format!("</h{level}>"));
    html.push_str("<hr class=\"mb-3\">");
    for block in &section.blocks {
        html.push_str(&render_block(block));
    }
    html
}

pub fn render_block(block: &Block) -> String {
    let mut html = String::new();
    if let Some(title) = non_empty(&block.block_title) {
        html.push_str(&format!("<p class=\"block-title\"><strong>{}</strong></p>", escape(title)));
    }
    if let Some(description) = non_empty(&block.block_description) {
        html.push_str(&format!(
            "<p class=\"block-description text-muted\">{}</p>",
            escape(description)
        ));
    }

    match &block.content {
        BlockContent::PlainText { raw_value } => {
            if !raw_value.is_empty() {
                html.push_str(&format!("<p>{}</p>", escape(raw_value).replace('\n', "<br>")));
            }
        }
        BlockContent::DetailList { details } => html.push_str(&render_details(details)),
        BlockContent::Credentials { raw_value, details } => {
            if !raw_value.is_empty() || !details.is_empty() {
                html.push_str("<div class=\"alert alert-warning credentials-box\"><strong>Credentials:</strong>");
                if !raw_value.is_empty() {
                    html.push_str(&format!("<pre>{}</pre>", escape(raw_value)));
                }
                html.push_str(&render_details(details));
                html.push_str("</div>");
            }
        }
        BlockContent::CodeBlock { raw_value } => html.push_str(&render_pre("code-block", raw_value)),
        BlockContent::NetworkMap { raw_value } => {
            html.push_str(&render_pre("code-block network-map", raw_value))
        }
        BlockContent::Image {
            image_url,
            alt_text,
            raw_value,
        } => {
            if !image_url.is_empty() {
                html.push_str(&format!(
                    "<div class=\"text-center my-4\"><img src=\"{}\" alt=\"{}\" class=\"img-fluid\">",
                    escape(image_url),
                    escape(alt_text)
                ));
                if let Some(caption) = non_empty(raw_value) {
                    html.push_str(&format!("<p class=\"text-muted mt-2\">{}</p>", escape(caption)));
                }
                html.push_str("</div>");
            }
        }
    }
    html
}

fn render_details(details: &[Detail]) -> String {
    if details.is_empty() {
        return String::new();
    }
    let mut html = String::from("<ul class=\"list-unstyled\">");
    for detail in details {
        html.push_str(&format!(
            "<li><strong>{}:</strong> {}</li>",
            escape(&detail.label),
            escape(&detail.value)
        ));
    }
    html.push_str("</ul>");
    html
}

fn render_pre(class: &str, raw_value: &str) -> String {
    if raw_value.is_empty() {
        return String::new();
    }
    format!("<div class=\"{class}\"><pre>{}</pre></div>", escape(raw_value))
}

/// Full page body for a document: title, identifier, section tree and the
/// last update time.
pub fn render_document(doc: &Document) -> String {
    let mut html = format!("<h1>{}</h1>", escape(&doc.title));
    html.push_str(&format!(
        "<p class=\"lead text-muted\">Identifier: {}</p><hr>",
        escape(&doc.identifier)
    ));
    if doc.sections.is_empty() {
        html.push_str("<p class=\"text-center text-muted\">This document has no sections.</p>");
    } else {
        html.push_str(&render_sections(&doc.sections, 1));
    }
    html.push_str(&format!(
        "<p class=\"update-info text-end mt-5\">Last updated: {}</p>",
        doc.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html
}

/// Standalone HTML page wrapping [`render_document`].
pub fn render_page(doc: &Document) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"UTF-8\"><title>{}</title></head><body><main class=\"container\">{}</main></body></html>",
        escape(&doc.title),
        render_document(doc)
    )
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
