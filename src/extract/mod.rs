//! Format extraction: one strategy per recognised document format.
//!
//! Each submodule implements exactly one strategy. Strategies are plain
//! synchronous functions of a path; the normalizer runs them on the blocking
//! pool because every parser here (calamine, docx-rs, zip) is CPU-bound and
//! not async-aware.
//!
//! ## Capabilities
//!
//! Three strategies are optional. Whether they can run is decided once, by
//! [`Capabilities::detect`], and the resulting table is handed to
//! [`ExtractorRegistry::new`]. Nothing re-probes per file, so a missing
//! optional piece shows up as [`Unavailable::MissingCapability`] for every
//! affected file instead of failing halfway through a batch.
//!
//! | Format | Strategy | Capability |
//! |--------|----------|------------|
//! | `.txt`  | [`plain`]        | - |
//! | `.xlsx` | [`spreadsheet`]  | - |
//! | `.docx` | [`docx`]         | `docx-support` (cargo feature `docx`) |
//! | `.pptx` | [`pptx`]         | `pptx-support` (cargo feature `pptx`) |
//! | `.doc`  | [`legacy`]       | `legacy-doc-support` (converter on PATH) |
//! | `.ppt`  | [`legacy`]       | `legacy-doc-support` (converter on PATH) |

#[cfg(feature = "docx")]
pub mod docx;
pub mod legacy;
pub mod plain;
#[cfg(feature = "pptx")]
pub mod pptx;
pub mod spreadsheet;

use crate::document::DocumentFormat;
use crate::error::Unavailable;
use legacy::FallbackTool;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// A named optional feature gating one or more extraction strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// `.docx` paragraph extraction.
    Docx,
    /// Generic converter for legacy binary formats (`.doc`, `.ppt`).
    LegacyDoc,
    /// `.pptx` shape-text extraction.
    Pptx,
}

impl Capability {
    pub const ALL: [Capability; 3] = [Capability::Docx, Capability::LegacyDoc, Capability::Pptx];

    /// The capability a format needs, if any.
    pub fn required_by(format: DocumentFormat) -> Option<Capability> {
        match format {
            DocumentFormat::PlainText | DocumentFormat::Spreadsheet => None,
            DocumentFormat::RichDocument => Some(Capability::Docx),
            DocumentFormat::Presentation => Some(Capability::Pptx),
            DocumentFormat::LegacyDocument | DocumentFormat::LegacyPresentation => {
                Some(Capability::LegacyDoc)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Capability::Docx => "docx-support",
            Capability::LegacyDoc => "legacy-doc-support",
            Capability::Pptx => "pptx-support",
        }
    }

    /// What the user has to do to make this capability available.
    pub fn install_hint(&self) -> &'static str {
        match self {
            Capability::Docx => "Rebuild doc-analyzer with `--features docx`.",
            Capability::Pptx => "Rebuild doc-analyzer with `--features pptx`.",
            Capability::LegacyDoc => {
                "Install `textract` (pip install textract) or LibreOffice (`soffice`) and make sure it is on PATH."
            }
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Capability availability, resolved once at startup.
///
/// Build with [`Capabilities::detect`] in production; tests construct the
/// exact table they need with [`Capabilities::none`] and the `with_*` setters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    docx: bool,
    pptx: bool,
    fallback: Option<FallbackTool>,
}

impl Capabilities {
    /// Compiled-in features plus a PATH probe for the legacy converter.
    pub fn detect() -> Self {
        let caps = Self {
            docx: cfg!(feature = "docx"),
            pptx: cfg!(feature = "pptx"),
            fallback: FallbackTool::detect(),
        };
        info!(
            "Capabilities: docx={} pptx={} legacy={}",
            caps.docx,
            caps.pptx,
            caps.fallback
                .as_ref()
                .map(|t| t.program().display().to_string())
                .unwrap_or_else(|| "none".to_string())
        );
        caps
    }

    /// Every optional capability switched off.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_docx(mut self, available: bool) -> Self {
        self.docx = available;
        self
    }

    pub fn with_pptx(mut self, available: bool) -> Self {
        self.pptx = available;
        self
    }

    pub fn with_fallback(mut self, tool: Option<FallbackTool>) -> Self {
        self.fallback = tool;
        self
    }

    pub fn is_available(&self, capability: Capability) -> bool {
        match capability {
            Capability::Docx => self.docx,
            Capability::Pptx => self.pptx,
            Capability::LegacyDoc => self.fallback.is_some(),
        }
    }

    pub fn fallback(&self) -> Option<&FallbackTool> {
        self.fallback.as_ref()
    }

    /// Capabilities that are switched off, in declaration order.
    pub fn missing(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| !self.is_available(*c))
            .collect()
    }
}

/// One extraction strategy.
pub trait Extractor: Send + Sync {
    /// The format this strategy reads.
    fn format(&self) -> DocumentFormat;

    /// Read `path` and return its text.
    ///
    /// Implementations map every failure to an [`Unavailable`]; they must not
    /// panic on malformed input.
    fn extract(&self, path: &Path) -> Result<String, Unavailable>;
}

/// Maps a [`DocumentFormat`] to the strategy that reads it, honouring the
/// capability table.
pub struct ExtractorRegistry {
    capabilities: Capabilities,
    extractors: HashMap<DocumentFormat, Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// Register every built-in strategy whose capability is available.
    pub fn new(capabilities: Capabilities) -> Self {
        let mut registry = Self {
            capabilities,
            extractors: HashMap::new(),
        };

        registry.register(Arc::new(plain::PlainTextExtractor));
        registry.register(Arc::new(spreadsheet::SpreadsheetExtractor));

        #[cfg(feature = "docx")]
        if registry.capabilities.is_available(Capability::Docx) {
            registry.register(Arc::new(docx::DocxExtractor));
        }

        #[cfg(feature = "pptx")]
        if registry.capabilities.is_available(Capability::Pptx) {
            registry.register(Arc::new(pptx::PptxExtractor));
        }

        if let Some(tool) = registry.capabilities.fallback().cloned() {
            registry.register(Arc::new(legacy::LegacyExtractor::new(
                DocumentFormat::LegacyDocument,
                tool.clone(),
            )));
            registry.register(Arc::new(legacy::LegacyExtractor::new(
                DocumentFormat::LegacyPresentation,
                tool,
            )));
        }

        debug!("Registered {} extraction strategies", registry.extractors.len());
        registry
    }

    /// Shorthand for `ExtractorRegistry::new(Capabilities::detect())`.
    pub fn detect() -> Self {
        Self::new(Capabilities::detect())
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Install or replace the strategy for `extractor.format()`.
    pub fn register(&mut self, extractor: Arc<dyn Extractor>) {
        self.extractors.insert(extractor.format(), extractor);
    }

    /// Strategy for a known format, or `MissingCapability`.
    pub fn extractor_for(&self, format: DocumentFormat) -> Result<Arc<dyn Extractor>, Unavailable> {
        let missing = |capability| Unavailable::MissingCapability { format, capability };

        if let Some(capability) = Capability::required_by(format) {
            if !self.capabilities.is_available(capability) {
                return Err(missing(capability));
            }
        }

        match self.extractors.get(&format) {
            Some(e) => Ok(Arc::clone(e)),
            // Flag says yes but the strategy was compiled out.
            None => Err(match Capability::required_by(format) {
                Some(capability) => missing(capability),
                None => Unavailable::UnsupportedFormat {
                    path: format!("*.{}", format.extension()).into(),
                    extension: Some(format.extension().to_string()),
                },
            }),
        }
    }

    /// Resolve a file path to its format and strategy.
    pub fn lookup(&self, path: &Path) -> Result<(DocumentFormat, Arc<dyn Extractor>), Unavailable> {
        let format = DocumentFormat::from_path(path).ok_or_else(|| Unavailable::UnsupportedFormat {
            path: path.to_path_buf(),
            extension: path
                .extension()
                .map(|e| e.to_string_lossy().into_owned()),
        })?;
        Ok((format, self.extractor_for(format)?))
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::detect()
    }
}
