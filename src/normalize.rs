//! Content normalizer: one file in, one [`ExtractionResult`] out.
//!
//! Resolution order for a path:
//!
//! ```text
//! extension ──unknown──────────────▶ unsupported-format
//!     │
//! capability ──not available───────▶ missing-capability
//!     │
//! metadata ──missing / unreadable──▶ read-error
//!     │
//! strategy (spawn_blocking) ───────▶ Text | read-error | decode-error
//! ```
//!
//! [`normalize`] never returns an `Err` and never panics: a strategy that
//! panics is caught by the blocking pool and reported as `read-error`.

use crate::document::{Document, DocumentFormat, ExtractionResult};
use crate::error::Unavailable;
use crate::extract::ExtractorRegistry;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extract the text of one file.
///
/// # Example
/// ```rust,no_run
/// use doc_analyzer::{normalize, ExtractorRegistry};
///
/// # #[tokio::main]
/// # async fn main() {
/// let registry = ExtractorRegistry::detect();
/// match normalize("report.docx", &registry).await.into_result() {
///     Ok(text) => println!("{text}"),
///     Err(reason) => eprintln!("{}: {reason}", reason.reason()),
/// }
/// # }
/// ```
pub async fn normalize(path: impl AsRef<Path>, registry: &ExtractorRegistry) -> ExtractionResult {
    let path = path.as_ref();
    let start = Instant::now();
    info!("Starting extraction: {}", path.display());

    let result = run(path, registry).await;

    match &result {
        Ok(text) => info!(
            "Extraction complete: {} ({} chars, {}ms)",
            path.display(),
            text.chars().count(),
            start.elapsed().as_millis()
        ),
        Err(reason) => warn!("Extraction unavailable: {} ({})", path.display(), reason.reason()),
    }

    result.into()
}

async fn run(path: &Path, registry: &ExtractorRegistry) -> Result<String, Unavailable> {
    let (format, extractor) = registry.lookup(path)?;
    let size = file_size(path).await?;
    debug!("{} is {} ({} bytes)", path.display(), format, size);

    let owned: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || extractor.extract(&owned))
        .await
        .unwrap_or_else(|e| {
            warn!("Extractor for {} aborted: {}", path.display(), e);
            Err(Unavailable::read(path, format!("extractor aborted: {e}")))
        })
}

async fn file_size(path: &Path) -> Result<u64, Unavailable> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| Unavailable::read(path, e))?;
    if !meta.is_file() {
        return Err(Unavailable::read(path, "not a regular file"));
    }
    Ok(meta.len())
}

/// Describe a file without extracting it.
///
/// Fails with `unsupported-format` or `read-error`; capabilities are not
/// consulted.
pub async fn inspect(path: impl AsRef<Path>) -> Result<Document, Unavailable> {
    let path = path.as_ref();
    let format = DocumentFormat::from_path(path).ok_or_else(|| Unavailable::UnsupportedFormat {
        path: path.to_path_buf(),
        extension: path.extension().map(|e| e.to_string_lossy().into_owned()),
    })?;
    let size_bytes = file_size(path).await?;
    Ok(Document {
        path: path.to_path_buf(),
        format,
        size_bytes,
    })
}

/// Extract text from an in-memory buffer.
///
/// `file_name` only supplies the extension. The bytes are written to a managed
/// [`tempfile`] that is removed when this returns.
pub async fn normalize_from_bytes(
    bytes: &[u8],
    file_name: &str,
    registry: &ExtractorRegistry,
) -> ExtractionResult {
    let suffix = match Path::new(file_name).extension() {
        Some(ext) => format!(".{}", ext.to_string_lossy()),
        None => String::new(),
    };

    let tmp = tempfile::Builder::new()
        .prefix("doc-analyzer-")
        .suffix(&suffix)
        .tempfile()
        .and_then(|mut tmp| tmp.write_all(bytes).map(|_| tmp));

    match tmp {
        // `tmp` lives until `normalize` returns
        Ok(tmp) => normalize(tmp.path(), registry).await,
        Err(e) => ExtractionResult::Unavailable(Unavailable::read(
            file_name,
            format!("tempfile: {e}"),
        )),
    }
}

/// Files directly inside `dir` with a recognised extension, sorted by name.
///
/// Does not descend into subdirectories and does not check capabilities: a
/// `.doc` is listed even when no converter is installed.
pub async fn analyzable_files(dir: impl AsRef<Path>) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir.as_ref()).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file() && DocumentFormat::from_path(&path).is_some() {
            files.push(path);
        }
    }
    files.sort();
    debug!("{} analyzable file(s) in {}", files.len(), dir.as_ref().display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnavailableReason;
    use crate::extract::{Capabilities, Extractor};
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn baseline() -> ExtractorRegistry {
        ExtractorRegistry::new(Capabilities::none())
    }

    #[tokio::test]
    async fn plain_text_round_trip() {
        let mut file = NamedTempFile::with_suffix(".TXT").unwrap();
        write!(file, "hello").unwrap();

        let result = normalize(file.path(), &baseline()).await;
        assert_eq!(result, ExtractionResult::Text("hello".into()));
    }

    #[tokio::test]
    async fn unknown_extension_wins_over_missing_file() {
        let result = normalize("/no/such/file.pdf", &baseline()).await;
        assert_eq!(
            result.unavailable().map(Unavailable::reason),
            Some(UnavailableReason::UnsupportedFormat)
        );
    }

    #[tokio::test]
    async fn missing_capability_wins_over_missing_file() {
        let result = normalize("/no/such/file.docx", &baseline()).await;
        assert_eq!(
            result.unavailable().map(Unavailable::reason),
            Some(UnavailableReason::MissingCapability)
        );
    }

    #[tokio::test]
    async fn missing_file_is_read_error() {
        let result = normalize("/no/such/file.txt", &baseline()).await;
        assert_eq!(
            result.unavailable().map(Unavailable::reason),
            Some(UnavailableReason::ReadError)
        );
    }

    #[tokio::test]
    async fn directory_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("folder.txt");
        std::fs::create_dir(&fake).unwrap();

        let result = normalize(&fake, &baseline()).await;
        assert_eq!(
            result.unavailable().map(Unavailable::reason),
            Some(UnavailableReason::ReadError)
        );
    }

    #[tokio::test]
    async fn panicking_strategy_is_contained() {
        struct Exploding;
        impl Extractor for Exploding {
            fn format(&self) -> DocumentFormat {
                DocumentFormat::PlainText
            }
            fn extract(&self, _path: &Path) -> Result<String, Unavailable> {
                panic!("parser bug");
            }
        }

        let mut registry = baseline();
        registry.register(Arc::new(Exploding));
        let file = NamedTempFile::with_suffix(".txt").unwrap();

        let result = normalize(file.path(), &registry).await;
        let reason = result.unavailable().unwrap();
        assert_eq!(reason.reason(), UnavailableReason::ReadError);
        assert!(reason.to_string().contains("aborted"), "got: {reason}");
    }

    #[test]
    fn drivable_from_sync_code() {
        let mut file = NamedTempFile::with_suffix(".txt").unwrap();
        write!(file, "sync").unwrap();

        let result = tokio_test::block_on(normalize(file.path(), &baseline()));
        assert_eq!(result.text(), Some("sync"));
    }

    #[tokio::test]
    async fn inspect_reports_size_and_format() {
        let mut file = NamedTempFile::with_suffix(".txt").unwrap();
        write!(file, "12345").unwrap();

        let doc = inspect(file.path()).await.unwrap();
        assert_eq!(doc.format, DocumentFormat::PlainText);
        assert_eq!(doc.size_bytes, 5);
    }

    #[tokio::test]
    async fn lists_only_recognised_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.xlsx", "a.TXT", "notes.pdf", "README"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.docx")).unwrap();

        let files = analyzable_files(dir.path()).await.unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.TXT", "b.xlsx"]);
    }

    #[tokio::test]
    async fn from_bytes_uses_file_name_extension() {
        let result = normalize_from_bytes(b"in memory", "notes.txt", &baseline()).await;
        assert_eq!(result.text(), Some("in memory"));

        let result = normalize_from_bytes(b"x", "notes", &baseline()).await;
        assert_eq!(
            result.unavailable().map(Unavailable::reason),
            Some(UnavailableReason::UnsupportedFormat)
        );
    }
}
