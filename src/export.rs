//! Export support: turn a note's markup into plain text and hand it to an
//! exporter.
//!
//! Rendering to files (Markdown, PDF, ...) belongs to the host; this module
//! only prepares the `{title, plain text, tags}` triple and provides the
//! Markdown layout the client has always produced.

use scraper::{ElementRef, Html, Node};

use crate::error::NoteResult;
use crate::models::Note;

const UNTITLED: &str = "Untitled Note";

/// Elements that end a line of text
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "li", "ol", "ul", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "tr",
];

/// Output formats the client knows how to request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    PlainText,
    Markdown,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::PlainText => "txt",
            ExportFormat::Markdown => "md",
        }
    }
}

/// A note reduced to what exporters need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub title: String,
    pub plain_text: String,
    pub tags: String,
}

impl ExportDocument {
    pub fn from_note(note: &Note) -> Self {
        let title = if note.title.is_empty() {
            UNTITLED.to_string()
        } else {
            note.title.clone()
        };
        Self {
            title,
            plain_text: strip_markup(&note.content),
            tags: note.tags.clone(),
        }
    }

    pub fn to_markdown(&self) -> String {
        format!("# {}\n\n{}\n\n**Tags:** {}", self.title, self.plain_text, self.tags)
    }

    pub fn to_plain_text(&self) -> String {
        format!("{}\n\n{}\n\nTags: {}", self.title, self.plain_text, self.tags)
    }

    pub fn render(&self, format: ExportFormat) -> String {
        match format {
            ExportFormat::PlainText => self.to_plain_text(),
            ExportFormat::Markdown => self.to_markdown(),
        }
    }

    /// `{title}.{ext}`, or `note.{ext}` for an untitled note
    pub fn suggested_file_name(&self, format: ExportFormat) -> String {
        let stem = if self.title == UNTITLED {
            "note"
        } else {
            self.title.as_str()
        };
        format!("{}.{}", stem, format.extension())
    }
}

/// Destination for exported notes (file download, PDF renderer, ...).
pub trait Exporter {
    fn export(&self, document: &ExportDocument, format: ExportFormat) -> NoteResult<()>;
}

/// Strip markup from rich-text content, keeping the text.
///
/// Entities are decoded. Block elements and `<br>` become line breaks;
/// leading and trailing blank lines are trimmed.
pub fn strip_markup(content: &str) -> String {
    if content.is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(content);
    let mut out = String::new();
    collect_text(fragment.root_element(), &mut out);
    out.trim_matches('\n').to_string()
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                if matches!(name, "script" | "style") {
                    continue;
                }
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, out);
                }
                if BLOCK_ELEMENTS.contains(&name) && !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}
