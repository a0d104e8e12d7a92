//! Paragraph classification: one text line in, one tagged `Block` out.

use regex::Regex;
use std::sync::OnceLock;

use super::RenderError;

/// A classified unit of blueprint text. Drawing maps each variant to a style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(String),
    /// `indent` is the leading whitespace width of the source line.
    Bullet { text: String, indent: usize },
    Numbered(String),
    Paragraph(String),
}

impl Block {
    pub fn text(&self) -> &str {
        match self {
            Block::Heading(t) | Block::Numbered(t) | Block::Paragraph(t) => t,
            Block::Bullet { text, .. } => text,
        }
    }
}

/// Decides how a single line of blueprint text is styled.
pub trait BlockClassifier: Send + Sync {
    /// `None` drops the line (blank, or nothing left after stripping markers).
    fn classify(&self, line: &str) -> Option<Block>;

    fn name(&self) -> &str;
}

/// Resolve a classifier by its configured name.
pub fn classifier_from_name(name: &str) -> Result<Box<dyn BlockClassifier>, RenderError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "markdown" | "" => Ok(Box::new(MarkdownClassifier)),
        "outline" => Ok(Box::new(OutlineClassifier::default())),
        other => Err(RenderError::UnknownClassifier(other.to_string())),
    }
}

fn numbered_re() -> &'static Regex {
    static NUMBERED_RE: OnceLock<Regex> = OnceLock::new();
    NUMBERED_RE.get_or_init(|| Regex::new(r"^\d+\.").expect("numbered list regex must compile"))
}

fn roman_heading_re() -> &'static Regex {
    static ROMAN_HEADING_RE: OnceLock<Regex> = OnceLock::new();
    ROMAN_HEADING_RE.get_or_init(|| {
        Regex::new(r"^[IVXLC]+\.\s+\S").expect("roman numeral heading regex must compile")
    })
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

// ============================================================================
// MarkdownClassifier
// ============================================================================

/// Markdown-ish rules, first match wins: `**bold**` line, `- `/`* ` bullet,
/// `#` heading, `1.` numbered, otherwise paragraph.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownClassifier;

impl BlockClassifier for MarkdownClassifier {
    fn classify(&self, line: &str) -> Option<Block> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        if trimmed.len() > 4 && trimmed.starts_with("**") && trimmed.ends_with("**") {
            let inner = trimmed[2..trimmed.len() - 2].trim();
            return (!inner.is_empty()).then(|| Block::Heading(inner.to_string()));
        }

        let body = line.trim_start();
        if let Some(rest) = body.strip_prefix("- ").or_else(|| body.strip_prefix("* ")) {
            let text = rest.trim();
            return (!text.is_empty()).then(|| Block::Bullet {
                text: text.to_string(),
                indent: indent_width(line),
            });
        }

        if trimmed.starts_with('#') {
            let text = trimmed.trim_start_matches('#').trim();
            return (!text.is_empty()).then(|| Block::Heading(text.to_string()));
        }

        if numbered_re().is_match(trimmed) {
            return Some(Block::Numbered(trimmed.to_string()));
        }

        Some(Block::Paragraph(trimmed.to_string()))
    }

    fn name(&self) -> &str {
        "markdown"
    }
}

// ============================================================================
// OutlineClassifier
// ============================================================================

/// Markdown rules plus outline-style headings: roman numeral sections
/// (`IV. Layout`) and short all-capitals lines (`COLOR PALETTE`).
#[derive(Debug, Clone)]
pub struct OutlineClassifier {
    inner: MarkdownClassifier,
    /// Longest all-capitals line still treated as a heading.
    pub max_caps_heading_len: usize,
}

impl Default for OutlineClassifier {
    fn default() -> Self {
        Self {
            inner: MarkdownClassifier,
            max_caps_heading_len: 60,
        }
    }
}

impl OutlineClassifier {
    fn is_caps_heading(&self, text: &str) -> bool {
        text.chars().count() <= self.max_caps_heading_len
            && text.chars().any(|c| c.is_alphabetic())
            && !text.chars().any(|c| c.is_lowercase())
    }
}

impl BlockClassifier for OutlineClassifier {
    fn classify(&self, line: &str) -> Option<Block> {
        match self.inner.classify(line)? {
            Block::Paragraph(text)
                if roman_heading_re().is_match(&text) || self.is_caps_heading(&text) =>
            {
                Some(Block::Heading(text))
            }
            other => Some(other),
        }
    }

    fn name(&self) -> &str {
        "outline"
    }
}
