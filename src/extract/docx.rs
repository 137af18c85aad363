//! Rich documents (`.docx`) via docx-rs.
//!
//! Only top-level body paragraphs are read, in document order, one output
//! line per paragraph (empty paragraphs keep their blank line). Tables,
//! headers and footnotes are not part of the paragraph stream.

use super::Extractor;
use crate::document::DocumentFormat;
use crate::error::Unavailable;
use docx_rs::{DocumentChild, Paragraph, ParagraphChild, Run, RunChild};
use std::path::Path;
use tracing::debug;

pub struct DocxExtractor;

impl Extractor for DocxExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::RichDocument
    }

    fn extract(&self, path: &Path) -> Result<String, Unavailable> {
        let bytes = std::fs::read(path).map_err(|e| Unavailable::read(path, e))?;
        let docx = docx_rs::read_docx(&bytes)
            .map_err(|e| Unavailable::decode(path, format!("not a readable docx package: {e}")))?;

        let paragraphs: Vec<String> = docx
            .document
            .children
            .iter()
            .filter_map(|child| match child {
                DocumentChild::Paragraph(p) => Some(paragraph_text(p)),
                _ => None,
            })
            .collect();

        debug!("{}: {} paragraphs", path.display(), paragraphs.len());
        Ok(paragraphs.join("\n"))
    }
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut out = String::new();
    for child in &paragraph.children {
        match child {
            ParagraphChild::Run(run) => push_run(run, &mut out),
            ParagraphChild::Hyperlink(link) => {
                for inner in &link.children {
                    if let ParagraphChild::Run(run) = inner {
                        push_run(run, &mut out);
                    }
                }
            }
            _ => {}
        }
    }
    out
}

fn push_run(run: &Run, out: &mut String) {
    for child in &run.children {
        match child {
            RunChild::Text(t) => out.push_str(&t.text),
            RunChild::Tab(_) => out.push('\t'),
            RunChild::Break(_) => out.push('\n'),
            _ => {}
        }
    }
}
