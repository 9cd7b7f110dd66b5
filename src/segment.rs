//! Text segmentation – splits manuscript content into paragraphs (blank-line
//! separated) and lines (single line breaks kept as explicit breaks).

/// Separator between paragraphs after line-ending normalisation.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";
/// Break between lines inside a paragraph.
pub const LINE_BREAK: char = '\n';

/// A paragraph before inline tagging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawParagraph {
    pub lines: Vec<String>,
}

impl RawParagraph {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Convert CRLF and lone CR line endings to LF.
pub fn normalize_line_endings(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Split content into paragraphs and lines.
///
/// Paragraphs whose trimmed text is empty are dropped; everything else is
/// kept verbatim and in source order, so re-joining lines with `\n` and
/// paragraphs with `\n\n` reproduces the input minus empty paragraphs.
pub fn segment(content: &str) -> Vec<RawParagraph> {
    let normalized = normalize_line_endings(content);
    let paragraphs: Vec<RawParagraph> = normalized
        .split(PARAGRAPH_SEPARATOR)
        .filter(|p| !p.trim().is_empty())
        .map(|p| RawParagraph {
            lines: p.split(LINE_BREAK).map(str::to_string).collect(),
        })
        .collect();
    log::debug!("segmented content into {} paragraphs", paragraphs.len());
    paragraphs
}
