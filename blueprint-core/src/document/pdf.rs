//! Draws a `DocumentPlan` onto A4 pages with the builtin Helvetica fonts.

use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};

use super::{Block, DocumentPlan, RenderError};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
/// Rough average Helvetica glyph width as a fraction of the font size.
const GLYPH_WIDTH_EM: f32 = 0.5;
const PT_TO_MM: f32 = 0.3528;
const INDENT_STEP_MM: f32 = 6.0;
const MAX_BULLET_DEPTH: usize = 4;
const BULLET_GLYPH: &str = "\u{2022}";

/// Visual treatment of one line group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font_size: f32,
    pub bold: bool,
    pub indent_mm: f32,
    /// Extra space above the block.
    pub space_before_mm: f32,
}

impl TextStyle {
    const fn new(font_size: f32, bold: bool, indent_mm: f32, space_before_mm: f32) -> Self {
        Self {
            font_size,
            bold,
            indent_mm,
            space_before_mm,
        }
    }

    fn line_height_mm(&self) -> f32 {
        self.font_size * PT_TO_MM * 1.4
    }

    fn max_chars(&self) -> usize {
        let usable = PAGE_WIDTH_MM - 2.0 * MARGIN_MM - self.indent_mm;
        let glyph = self.font_size * GLYPH_WIDTH_EM * PT_TO_MM;
        ((usable / glyph) as usize).max(10)
    }
}

const TITLE: TextStyle = TextStyle::new(22.0, true, 0.0, 0.0);
const OFFER: TextStyle = TextStyle::new(12.0, true, 0.0, 4.0);
const HEADING: TextStyle = TextStyle::new(14.0, true, 0.0, 5.0);
const BODY: TextStyle = TextStyle::new(11.0, false, 0.0, 2.0);
const NUMBERED: TextStyle = TextStyle::new(11.0, false, INDENT_STEP_MM, 1.5);
const CALL_TO_ACTION: TextStyle = TextStyle::new(12.0, true, 0.0, 10.0);

/// Style and display text for a body block. Bullets get the glyph and one
/// indent step plus one per two columns of source indentation, up to
/// `MAX_BULLET_DEPTH` extra steps.
pub fn style_block(block: &Block) -> (TextStyle, String) {
    let text = block.text();
    match block {
        Block::Heading(_) => (HEADING, text.to_string()),
        Block::Bullet { indent, .. } => {
            let depth = (indent / 2).min(MAX_BULLET_DEPTH);
            let indent_mm = INDENT_STEP_MM * (1 + depth) as f32;
            (
                TextStyle::new(11.0, false, indent_mm, 1.5),
                format!("{} {}", BULLET_GLYPH, text),
            )
        }
        Block::Numbered(_) => (NUMBERED, text.to_string()),
        Block::Paragraph(_) => (BODY, text.to_string()),
    }
}

/// Greedy word wrap; words longer than a line are split.
pub fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > max_chars && current_len > 0 {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        current.extend(word);
    }

    if current_len > 0 {
        lines.push(current);
    }
    lines
}

struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y_mm: f32,
    pages: usize,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, RenderError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| RenderError::Pdf(format!("{:?}", e)))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| RenderError::Pdf(format!("{:?}", e)))?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y_mm: PAGE_HEIGHT_MM - MARGIN_MM,
            pages: 1,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y_mm = PAGE_HEIGHT_MM - MARGIN_MM;
        self.pages += 1;
    }

    fn write(&mut self, text: &str, style: TextStyle) {
        self.y_mm -= style.space_before_mm;
        let font = if style.bold { &self.bold } else { &self.regular };
        let font = font.clone();

        for line in wrap(text, style.max_chars()) {
            let height = style.line_height_mm();
            if self.y_mm - height < MARGIN_MM {
                self.new_page();
            }
            self.y_mm -= height;
            self.layer.use_text(
                line,
                style.font_size,
                Mm(MARGIN_MM + style.indent_mm),
                Mm(self.y_mm),
                &font,
            );
        }
    }

    fn finish(self) -> Result<Vec<u8>, RenderError> {
        tracing::debug!(pages = self.pages, "PDF layout complete");
        self.doc
            .save_to_bytes()
            .map_err(|e| RenderError::Pdf(format!("{:?}", e)))
    }
}

/// Draw the plan: title, offer line, body blocks, call to action.
pub fn draw(plan: &DocumentPlan) -> Result<Vec<u8>, RenderError> {
    let mut writer = PageWriter::new(&plan.title)?;

    writer.write(&plan.title, TITLE);
    writer.write(&plan.offer, OFFER);

    for block in &plan.body {
        let (style, text) = style_block(block);
        writer.write(&text, style);
    }

    writer.write(&plan.call_to_action, CALL_TO_ACTION);
    writer.finish()
}
