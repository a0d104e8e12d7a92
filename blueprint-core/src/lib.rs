pub mod completion;
pub mod config;
pub mod document;
pub mod error;
pub mod mailer;
pub mod models;
pub mod normalize;

pub use completion::{CompletionBackend, CompletionError, OpenAiCompletionClient};
pub use config::BlueprintConfig;
pub use document::{ArtifactRenderer, Block, BlockClassifier, DocumentPlan, DocumentRenderer, RenderError};
pub use error::{BlueprintError, ConversationError};
pub use mailer::{Delivery, MailError, Mailer, SmtpMailer};
pub use models::{ChatMessage, Role, Session};
pub use normalize::normalize;
