//! Document records and the per-file extraction outcome.

use crate::error::Unavailable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// The recognised document formats, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentFormat {
    /// `.txt`
    PlainText,
    /// `.xlsx`
    Spreadsheet,
    /// `.docx`
    RichDocument,
    /// `.doc`
    LegacyDocument,
    /// `.pptx`
    Presentation,
    /// `.ppt`
    LegacyPresentation,
}

impl DocumentFormat {
    pub const ALL: [DocumentFormat; 6] = [
        DocumentFormat::PlainText,
        DocumentFormat::Spreadsheet,
        DocumentFormat::RichDocument,
        DocumentFormat::LegacyDocument,
        DocumentFormat::Presentation,
        DocumentFormat::LegacyPresentation,
    ];

    /// Match an extension (without the dot), ignoring ASCII case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" => Some(DocumentFormat::PlainText),
            "xlsx" => Some(DocumentFormat::Spreadsheet),
            "docx" => Some(DocumentFormat::RichDocument),
            "doc" => Some(DocumentFormat::LegacyDocument),
            "pptx" => Some(DocumentFormat::Presentation),
            "ppt" => Some(DocumentFormat::LegacyPresentation),
            _ => None,
        }
    }

    /// Match the format tag used in logs and JSON output (`"rich-document"`, …).
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.tag() == tag)
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::PlainText => "txt",
            DocumentFormat::Spreadsheet => "xlsx",
            DocumentFormat::RichDocument => "docx",
            DocumentFormat::LegacyDocument => "doc",
            DocumentFormat::Presentation => "pptx",
            DocumentFormat::LegacyPresentation => "ppt",
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            DocumentFormat::PlainText => "plain-text",
            DocumentFormat::Spreadsheet => "spreadsheet",
            DocumentFormat::RichDocument => "rich-document",
            DocumentFormat::LegacyDocument => "legacy-document",
            DocumentFormat::Presentation => "presentation",
            DocumentFormat::LegacyPresentation => "legacy-presentation",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (.{})", self.tag(), self.extension())
    }
}

/// A file on disk that the normalizer has recognised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub path: PathBuf,
    pub format: DocumentFormat,
    /// Raw byte size on disk.
    pub size_bytes: u64,
}

/// Outcome of one extraction attempt: text or a tagged reason, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionResult {
    Text(String),
    Unavailable(Unavailable),
}

impl ExtractionResult {
    pub fn is_text(&self) -> bool {
        matches!(self, ExtractionResult::Text(_))
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ExtractionResult::Text(t) => Some(t),
            ExtractionResult::Unavailable(_) => None,
        }
    }

    pub fn unavailable(&self) -> Option<&Unavailable> {
        match self {
            ExtractionResult::Text(_) => None,
            ExtractionResult::Unavailable(u) => Some(u),
        }
    }

    /// Convert into a `Result` for callers that prefer `?`.
    pub fn into_result(self) -> Result<String, Unavailable> {
        match self {
            ExtractionResult::Text(t) => Ok(t),
            ExtractionResult::Unavailable(u) => Err(u),
        }
    }
}

impl From<Result<String, Unavailable>> for ExtractionResult {
    fn from(r: Result<String, Unavailable>) -> Self {
        match r {
            Ok(t) => ExtractionResult::Text(t),
            Err(u) => ExtractionResult::Unavailable(u),
        }
    }
}
