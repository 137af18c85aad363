//! Legacy binary formats (`.doc`, `.ppt`) through an external converter.
//!
//! There is no maintained pure-Rust reader for the OLE2 Word/PowerPoint
//! formats, so both go through one generic converter that prints plain text
//! to stdout: `textract <file>` if installed, else LibreOffice's
//! `soffice --headless --cat <file>`. The converter is located once, at
//! capability detection time.
//!
//! Converter failures are logged with the converter's stderr and surface as
//! `read-error`; nothing here panics or propagates.

use super::Extractor;
use crate::document::DocumentFormat;
use crate::error::Unavailable;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Candidates probed on PATH, most specific first.
const CANDIDATES: &[(&str, &[&str])] = &[
    ("textract", &[]),
    ("soffice", &["--headless", "--cat"]),
    ("libreoffice", &["--headless", "--cat"]),
];

/// An external program that turns a document path into text on stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackTool {
    program: PathBuf,
    args: Vec<String>,
}

impl FallbackTool {
    /// `program` is invoked as `program <args…> <file>`.
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// First converter found on PATH.
    pub fn detect() -> Option<Self> {
        CANDIDATES.iter().find_map(|(name, args)| {
            which::which(name)
                .ok()
                .map(|program| Self::new(program, args.iter().copied()))
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Run the converter on `path` and return its stdout as UTF-8 text.
    pub fn run(&self, path: &Path) -> Result<String, Unavailable> {
        let name = self.program.display();
        debug!("Running {} {:?} {}", name, self.args, path.display());

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                warn!("Could not start {}: {}", name, e);
                Unavailable::read(path, format!("could not start {name}: {e}"))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            warn!(
                "{} failed on {} ({}): {}",
                name,
                path.display(),
                output.status,
                stderr
            );
            let first_line = stderr.lines().next().unwrap_or_default();
            return Err(Unavailable::read(
                path,
                format!("{name} exited with {}: {first_line}", output.status),
            ));
        }

        let text = String::from_utf8(output.stdout).map_err(|e| {
            Unavailable::decode(
                path,
                format!(
                    "{name} output is not UTF-8 (invalid byte at offset {})",
                    e.utf8_error().valid_up_to()
                ),
            )
        })?;

        // `soffice --cat` exits 0 with empty stdout on formats it cannot dump.
        let source_len = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        if text.trim().is_empty() && source_len > 0 {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            warn!(
                "{} printed no text for {} ({} bytes): {}",
                name,
                path.display(),
                source_len,
                stderr
            );
            let detail = match stderr.lines().next() {
                Some(line) => format!("{name} printed no text: {line}"),
                None => format!("{name} printed no text"),
            };
            return Err(Unavailable::read(path, detail));
        }

        Ok(text)
    }
}

/// `.doc` / `.ppt` strategy backed by a [`FallbackTool`].
pub struct LegacyExtractor {
    format: DocumentFormat,
    tool: FallbackTool,
}

impl LegacyExtractor {
    pub fn new(format: DocumentFormat, tool: FallbackTool) -> Self {
        Self { format, tool }
    }
}

impl Extractor for LegacyExtractor {
    fn format(&self) -> DocumentFormat {
        self.format
    }

    fn extract(&self, path: &Path) -> Result<String, Unavailable> {
        if self.format == DocumentFormat::LegacyPresentation {
            debug!("Legacy .ppt support is limited; converting to .pptx gives better results");
        }
        self.tool.run(path)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::UnavailableReason;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn converter_stdout_becomes_text() {
        let mut file = NamedTempFile::with_suffix(".doc").unwrap();
        write!(file, "legacy body text").unwrap();

        let extractor = LegacyExtractor::new(
            DocumentFormat::LegacyDocument,
            FallbackTool::new("cat", Vec::<String>::new()),
        );
        assert_eq!(extractor.extract(file.path()).unwrap(), "legacy body text");
    }

    #[test]
    fn converter_failure_is_read_error() {
        let file = NamedTempFile::with_suffix(".ppt").unwrap();
        let extractor = LegacyExtractor::new(
            DocumentFormat::LegacyPresentation,
            FallbackTool::new("false", Vec::<String>::new()),
        );

        let err = extractor.extract(file.path()).unwrap_err();
        assert_eq!(err.reason(), UnavailableReason::ReadError);
        assert!(err.to_string().contains("exited with"), "got: {err}");
    }

    #[test]
    fn silent_converter_on_non_empty_file_is_read_error() {
        let mut file = NamedTempFile::with_suffix(".ppt").unwrap();
        file.write_all(b"\xd0\xcf\x11\xe0 twenty bytes..").unwrap();

        let extractor = LegacyExtractor::new(
            DocumentFormat::LegacyPresentation,
            FallbackTool::new("true", Vec::<String>::new()),
        );
        let err = extractor.extract(file.path()).unwrap_err();
        assert_eq!(err.reason(), UnavailableReason::ReadError);
        assert!(err.to_string().contains("printed no text"), "got: {err}");
    }

    #[test]
    fn empty_source_may_yield_empty_text() {
        let file = NamedTempFile::with_suffix(".doc").unwrap();
        let tool = FallbackTool::new("true", Vec::<String>::new());
        assert_eq!(tool.run(file.path()).unwrap(), "");
    }

    #[test]
    fn missing_program_is_read_error() {
        let file = NamedTempFile::with_suffix(".doc").unwrap();
        let tool = FallbackTool::new("/nonexistent/converter-binary", ["--flag"]);

        let err = tool.run(file.path()).unwrap_err();
        assert_eq!(err.reason(), UnavailableReason::ReadError);
        assert!(err.to_string().contains("could not start"), "got: {err}");
    }

    #[test]
    fn non_utf8_output_is_decode_error() {
        let mut file = NamedTempFile::with_suffix(".doc").unwrap();
        file.write_all(&[0xc3, 0x28]).unwrap();

        let tool = FallbackTool::new("cat", Vec::<String>::new());
        let err = tool.run(file.path()).unwrap_err();
        assert_eq!(err.reason(), UnavailableReason::DecodeError);
    }
}
