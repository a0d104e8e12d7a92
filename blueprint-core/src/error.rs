use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlueprintError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Completion error: {0}")]
    Completion(#[from] crate::completion::CompletionError),

    #[error("Render error: {0}")]
    Render(#[from] crate::document::RenderError),

    #[error("Mail error: {0}")]
    Mail(#[from] crate::mailer::MailError),

    #[error("Other error: {0}")]
    Other(String),
}

/// Failures reported by the conversation lifecycle operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    /// Missing or malformed caller input.
    #[error("{0}")]
    Validation(String),

    /// Unknown, finalized, or expired session id.
    #[error("{0}")]
    NotFound(String),

    /// The completion call failed or produced no content.
    #[error("{0}")]
    Generation(String),

    /// Rendering, archiving, or mail delivery failed during finalize.
    #[error("{0}")]
    Delivery(String),
}

impl ConversationError {
    /// Short machine-readable kind, used in logs and error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ConversationError::Validation(_) => "validation",
            ConversationError::NotFound(_) => "not_found",
            ConversationError::Generation(_) => "generation",
            ConversationError::Delivery(_) => "delivery",
        }
    }

    /// Whether the caller is at fault (4xx) rather than the server (5xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ConversationError::Validation(_) | ConversationError::NotFound(_)
        )
    }
}

impl From<BlueprintError> for ConversationError {
    fn from(e: BlueprintError) -> Self {
        ConversationError::Delivery(e.to_string())
    }
}
