//! Blueprint text to PDF.
//!
//! Rendering runs in two steps. `DocumentRenderer::plan` splits the text into
//! lines and classifies each into a `Block`; `pdf::draw` maps the resulting
//! `DocumentPlan` onto pages. Swapping the `BlockClassifier` changes how lines
//! are recognised without touching the drawing code.

pub mod classify;
pub mod pdf;

pub use classify::{
    classifier_from_name, Block, BlockClassifier, MarkdownClassifier, OutlineClassifier,
};

use thiserror::Error;

use crate::config::DocumentConfig;

pub const DOCUMENT_TITLE: &str = "Website Blueprint";

pub const CALL_TO_ACTION: &str =
    "Ready to bring this blueprint to life? Reply to this email and our team will get your build started.";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Unknown paragraph classifier: {0}")]
    UnknownClassifier(String),

    #[error("PDF generation failed: {0}")]
    Pdf(String),
}

/// Everything that ends up on the page, in drawing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPlan {
    pub title: String,
    pub offer: String,
    pub body: Vec<Block>,
    pub call_to_action: String,
}

pub fn offer_line(discount_percent: u8) -> String {
    format!(
        "Exclusive offer: book your website build with us and save {}%.",
        discount_percent
    )
}

/// Turns blueprint text into a binary document.
pub trait ArtifactRenderer: Send + Sync {
    fn render(&self, text: &str) -> Result<Vec<u8>, RenderError>;
}

pub struct DocumentRenderer {
    classifier: Box<dyn BlockClassifier>,
    discount_percent: u8,
}

impl DocumentRenderer {
    pub fn new(classifier: Box<dyn BlockClassifier>, discount_percent: u8) -> Self {
        Self {
            classifier,
            discount_percent,
        }
    }

    pub fn from_config(config: &DocumentConfig) -> Result<Self, RenderError> {
        Ok(Self::new(
            classifier_from_name(&config.classifier)?,
            config.discount_percent,
        ))
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// Classify `text` line by line; blank lines are skipped.
    pub fn plan(&self, text: &str) -> DocumentPlan {
        let body = text
            .lines()
            .filter_map(|line| self.classifier.classify(line))
            .collect();

        DocumentPlan {
            title: DOCUMENT_TITLE.to_string(),
            offer: offer_line(self.discount_percent),
            body,
            call_to_action: CALL_TO_ACTION.to_string(),
        }
    }
}

impl ArtifactRenderer for DocumentRenderer {
    /// Plan and draw `text`, returning the PDF bytes.
    fn render(&self, text: &str) -> Result<Vec<u8>, RenderError> {
        let plan = self.plan(text);
        tracing::debug!(
            blocks = plan.body.len(),
            classifier = self.classifier.name(),
            "Rendering blueprint document"
        );
        pdf::draw(&plan)
    }
}

impl Default for DocumentRenderer {
    fn default() -> Self {
        Self::new(Box::new(MarkdownClassifier), DocumentConfig::default().discount_percent)
    }
}
