//! Presentations (`.pptx`): text of every shape, slide by slide.
//!
//! A `.pptx` is a zip of DrawingML parts. Slide order comes from the
//! `<p:sldIdLst>` in `ppt/presentation.xml` resolved through its
//! relationships; if either part is unreadable the `slideN.xml` parts are
//! taken in numeric order instead.
//!
//! Within a slide, each `<p:sp>` with a text body yields one entry: its
//! paragraphs joined by `\n`. Shapes whose text is blank are skipped, and so
//! are pictures, charts and tables (they have no `<p:txBody>`).

use super::Extractor;
use crate::document::DocumentFormat;
use crate::error::Unavailable;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tracing::{debug, warn};
use zip::ZipArchive;

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";
const SLIDE_PREFIX: &str = "ppt/slides/slide";

pub struct PptxExtractor;

impl Extractor for PptxExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Presentation
    }

    fn extract(&self, path: &Path) -> Result<String, Unavailable> {
        let file = File::open(path).map_err(|e| Unavailable::read(path, e))?;
        let mut archive = ZipArchive::new(BufReader::new(file))
            .map_err(|e| Unavailable::decode(path, format!("not a readable pptx package: {e}")))?;

        let slides = slide_order(&mut archive);
        debug!("{}: {} slides", path.display(), slides.len());

        let mut texts = Vec::new();
        for slide in &slides {
            let xml = read_part(&mut archive, slide).map_err(|e| Unavailable::decode(path, e))?;
            let shapes = shape_texts(&xml)
                .map_err(|e| Unavailable::decode(path, format!("{slide}: {e}")))?;
            texts.extend(shapes);
        }

        Ok(texts.join("\n"))
    }
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String, String> {
    let mut entry = archive.by_name(name).map_err(|e| format!("{name}: {e}"))?;
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| format!("{name}: {e}"))?;
    Ok(xml)
}

/// Slide part names in presentation order.
fn slide_order<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Vec<String> {
    match declared_slide_order(archive) {
        Ok(slides) if !slides.is_empty() => slides,
        Ok(_) => numbered_slides(archive),
        Err(e) => {
            warn!("Falling back to numeric slide order: {e}");
            numbered_slides(archive)
        }
    }
}

fn declared_slide_order<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<String>, String> {
    let presentation = read_part(archive, PRESENTATION_PART)?;
    let rels = read_part(archive, PRESENTATION_RELS)?;

    let targets = slide_targets(&rels).map_err(|e| format!("{PRESENTATION_RELS}: {e}"))?;
    let ids = slide_rel_ids(&presentation).map_err(|e| format!("{PRESENTATION_PART}: {e}"))?;

    ids.iter()
        .map(|id| {
            targets
                .get(id)
                .map(|target| resolve_target(target))
                .ok_or_else(|| format!("slide relationship {id} has no target"))
        })
        .collect()
}

/// `slideN.xml` parts sorted by N.
fn numbered_slides<R: Read + Seek>(archive: &ZipArchive<R>) -> Vec<String> {
    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let n = name.strip_prefix(SLIDE_PREFIX)?.strip_suffix(".xml")?;
            Some((n.parse().ok()?, name.to_string()))
        })
        .collect();
    slides.sort_unstable();
    slides.into_iter().map(|(_, name)| name).collect()
}

/// Relationship targets are relative to `ppt/`; absolute ones start with `/`.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("ppt/{target}"),
    }
}

fn attr(e: &BytesStart<'_>, local: &[u8], prefixed: bool) -> Option<String> {
    e.attributes().flatten().find_map(|a| {
        let key = a.key;
        if key.local_name().as_ref() == local && key.prefix().is_some() == prefixed {
            a.unescape_value().ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}

/// `rId` → target for every slide relationship.
fn slide_targets(rels: &str) -> Result<HashMap<String, String>, quick_xml::Error> {
    let mut reader = Reader::from_str(rels);
    let mut targets = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let is_slide = attr(&e, b"Type", false)
                    .map(|t| t.ends_with("/slide"))
                    .unwrap_or(false);
                if let (true, Some(id), Some(target)) =
                    (is_slide, attr(&e, b"Id", false), attr(&e, b"Target", false))
                {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(targets)
}

/// The `r:id` of every `<p:sldId>`, in list order.
fn slide_rel_ids(presentation: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(presentation);
    let mut ids = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sldId" => {
                if let Some(id) = attr(&e, b"id", true) {
                    ids.push(id);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(ids)
}

/// Text of each non-blank shape on one slide, in document order.
pub fn shape_texts(slide_xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(slide_xml);
    let mut shapes = Vec::new();

    let mut in_shape = false;
    let mut in_body = false;
    let mut in_run_text = false;
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"sp" => {
                    in_shape = true;
                    paragraphs.clear();
                }
                b"txBody" if in_shape => in_body = true,
                b"p" if in_body => current = Some(String::new()),
                b"t" if current.is_some() => in_run_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"br" => {
                    if let Some(p) = current.as_mut() {
                        p.push('\n');
                    }
                }
                // <a:p/> is an empty paragraph.
                b"p" if in_body => paragraphs.push(String::new()),
                _ => {}
            },
            Event::Text(t) if in_run_text => {
                if let Some(p) = current.as_mut() {
                    p.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_run_text = false,
                b"p" if in_body => {
                    if let Some(p) = current.take() {
                        paragraphs.push(p);
                    }
                }
                b"txBody" => in_body = false,
                b"sp" if in_shape => {
                    let text = paragraphs.join("\n");
                    if !text.trim().is_empty() {
                        shapes.push(text);
                    }
                    paragraphs.clear();
                    in_shape = false;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(shapes)
}
