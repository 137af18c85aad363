//! Prompt text for document analysis.
//!
//! Every prompt lives here so wording changes touch one file and tests can
//! inspect prompts without a running model. Callers can override the system
//! prompt; the per-format constants are used only when they don't.

use crate::document::DocumentFormat;

/// Files above this many bytes on disk get a truncated prompt.
pub const LARGE_FILE_BYTES: u64 = 1024 * 1024;

/// Characters of content kept for a large file.
pub const TRUNCATED_CHARS: usize = 20_000;

pub const SPREADSHEET_SYSTEM_PROMPT: &str =
    "You are a data analysis expert, skilled at analysing and interpreting tabular data. \
The table below is tab-separated; the first line is the header and `nan` marks an empty cell.";

pub const DOCUMENT_SYSTEM_PROMPT: &str =
    "You are a document analysis expert, skilled at understanding and summarising document content.";

pub const PRESENTATION_SYSTEM_PROMPT: &str =
    "You are a presentation analysis expert, skilled at summarising slide content and extracting key points.";

/// Used for plain text and as the fallback.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant, skilled at analysing text content.";

/// System prompt for a document format.
pub fn system_prompt_for(format: DocumentFormat) -> &'static str {
    match format {
        DocumentFormat::Spreadsheet => SPREADSHEET_SYSTEM_PROMPT,
        DocumentFormat::RichDocument | DocumentFormat::LegacyDocument => DOCUMENT_SYSTEM_PROMPT,
        DocumentFormat::Presentation | DocumentFormat::LegacyPresentation => {
            PRESENTATION_SYSTEM_PROMPT
        }
        DocumentFormat::PlainText => DEFAULT_SYSTEM_PROMPT,
    }
}

/// A user prompt and whether its content was cut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPrompt {
    pub text: String,
    pub truncated: bool,
}

/// Wrap `content` with the task instruction.
///
/// When the source file is larger than [`LARGE_FILE_BYTES`] only the first
/// [`TRUNCATED_CHARS`] characters are sent, and the model is told it is
/// looking at an excerpt.
pub fn build_prompt(task: &str, content: &str, size_bytes: u64) -> BuiltPrompt {
    let task = task.trim();
    if size_bytes > LARGE_FILE_BYTES {
        let excerpt = match content.char_indices().nth(TRUNCATED_CHARS) {
            Some((cut, _)) => &content[..cut],
            None => content,
        };
        BuiltPrompt {
            text: format!(
                "Below is an excerpt of the file content:\n\n{excerpt}\n\n\
Please {task} this content, focusing on the key information."
            ),
            truncated: true,
        }
    } else {
        BuiltPrompt {
            text: format!("Please {task} the following file content:\n\n{content}"),
            truncated: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_format_has_a_prompt() {
        for format in DocumentFormat::ALL {
            assert!(!system_prompt_for(format).is_empty());
        }
        assert_eq!(system_prompt_for(DocumentFormat::PlainText), DEFAULT_SYSTEM_PROMPT);
        assert_eq!(
            system_prompt_for(DocumentFormat::LegacyPresentation),
            PRESENTATION_SYSTEM_PROMPT
        );
    }

    #[test]
    fn small_file_sends_everything() {
        let p = build_prompt(" summarise ", "all of it", 10);
        assert!(!p.truncated);
        assert_eq!(p.text, "Please summarise the following file content:\n\nall of it");
    }

    #[test]
    fn large_file_is_cut_on_char_boundary() {
        let content = "é".repeat(TRUNCATED_CHARS + 50);
        let p = build_prompt("summarise", &content, LARGE_FILE_BYTES + 1);
        assert!(p.truncated);
        assert_eq!(p.text.matches('é').count(), TRUNCATED_CHARS);
        assert!(p.text.ends_with("focusing on the key information."));
    }

    #[test]
    fn large_file_with_short_text_is_not_cut() {
        let p = build_prompt("summarise", "tiny", LARGE_FILE_BYTES * 2);
        assert!(p.truncated);
        assert!(p.text.contains("\n\ntiny\n\n"));
    }
}
