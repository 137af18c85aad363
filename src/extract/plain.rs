//! Plain text: the bytes must already be UTF-8.

use super::Extractor;
use crate::document::DocumentFormat;
use crate::error::Unavailable;
use std::path::Path;
use tracing::debug;

pub struct PlainTextExtractor;

impl Extractor for PlainTextExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::PlainText
    }

    fn extract(&self, path: &Path) -> Result<String, Unavailable> {
        let bytes = std::fs::read(path).map_err(|e| Unavailable::read(path, e))?;
        debug!("Read {} bytes from {}", bytes.len(), path.display());
        decode_utf8(path, bytes)
    }
}

/// Strict UTF-8 decode; the error names the offset of the first bad byte.
pub(crate) fn decode_utf8(path: &Path, bytes: Vec<u8>) -> Result<String, Unavailable> {
    String::from_utf8(bytes).map_err(|e| {
        Unavailable::decode(
            path,
            format!(
                "not valid UTF-8 (invalid byte at offset {})",
                e.utf8_error().valid_up_to()
            ),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnavailableReason;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn reads_utf8_text() {
        let mut file = NamedTempFile::with_suffix(".txt").unwrap();
        write!(file, "héllo\nwörld").unwrap();

        let text = PlainTextExtractor.extract(file.path()).unwrap();
        assert_eq!(text, "héllo\nwörld");
    }

    #[test]
    fn invalid_utf8_is_decode_error() {
        let mut file = NamedTempFile::with_suffix(".txt").unwrap();
        file.write_all(&[b'o', b'k', 0xff, 0xfe]).unwrap();

        let err = PlainTextExtractor.extract(file.path()).unwrap_err();
        assert_eq!(err.reason(), UnavailableReason::DecodeError);
        assert!(err.to_string().contains("offset 2"), "got: {err}");
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = PlainTextExtractor
            .extract(Path::new("/definitely/not/here.txt"))
            .unwrap_err();
        assert_eq!(err.reason(), UnavailableReason::ReadError);
    }
}
