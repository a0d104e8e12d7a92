//! Blueprint conversation lifecycle: start, continue, finalize.
//!
//! A session is only created once the first completion succeeds. Every later
//! turn runs with the session lock held, so the full history sent to the
//! model always matches what ends up stored.

use blueprint_core::document::ArtifactRenderer;
use blueprint_core::mailer::{Delivery, Mailer};
use blueprint_core::models::{ChatMessage, Session};
use blueprint_core::{normalize, BlueprintError, CompletionBackend, ConversationError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use super::sessions::{SessionHandle, SessionStore};

pub const SYSTEM_PROMPT: &str =
    "You are an expert web designer who generates detailed web design blueprints.";

pub const MAIL_SUBJECT: &str = "Your Website Blueprint";

pub const MAIL_BODY: &str =
    "Thanks for designing with us! Your finalized website blueprint is attached as a PDF.";

pub const ATTACHMENT_NAME: &str = "website-blueprint.pdf";

/// The opening user turn for a new idea.
pub fn idea_prompt(idea: &str) -> String {
    format!(
        "Create a detailed website blueprint for the following idea: {}. \
         Cover the site structure and pages, key sections, layout, color scheme, \
         typography, and calls to action.",
        idea
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutcome {
    pub session_id: Uuid,
    pub blueprint: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyOutcome {
    pub reply: String,
    pub blueprint: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeOutcome {
    pub message: String,
    pub recipient: String,
}

pub struct ConversationController {
    store: Arc<SessionStore>,
    completion: Arc<dyn CompletionBackend>,
    renderer: Arc<dyn ArtifactRenderer>,
    mailer: Arc<dyn Mailer>,
    archive_dir: Option<PathBuf>,
}

impl ConversationController {
    pub fn new(
        store: Arc<SessionStore>,
        completion: Arc<dyn CompletionBackend>,
        renderer: Arc<dyn ArtifactRenderer>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            store,
            completion,
            renderer,
            mailer,
            archive_dir: None,
        }
    }

    /// Also write every finalized PDF into `dir`.
    pub fn with_archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = Some(dir.into());
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn completion_backend(&self) -> &str {
        self.completion.name()
    }

    /// Generate the first blueprint for `idea` and open a session for it.
    pub async fn start(&self, idea: &str, email: &str) -> Result<StartOutcome, ConversationError> {
        let idea = idea.trim();
        let email = email.trim();
        if idea.is_empty() || email.is_empty() {
            return Err(ConversationError::Validation(
                "Idea and email are required".to_string(),
            ));
        }

        let mut history = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(idea_prompt(idea)),
        ];

        let blueprint = self.generate(&history).await.ok_or_else(|| {
            ConversationError::Generation("Failed to generate blueprint".to_string())
        })?;

        history.push(ChatMessage::assistant(blueprint.clone()));
        let session_id = self.store.create(idea, email, history);

        tracing::info!(session_id = %session_id, chars = blueprint.len(), "Blueprint session started");

        Ok(StartOutcome {
            session_id,
            blueprint,
        })
    }

    /// Send a follow-up message and replace the blueprint with the reply.
    ///
    /// When generation fails the user turn stays in the history.
    pub async fn continue_session(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<ReplyOutcome, ConversationError> {
        let (id, handle) = self.lookup(session_id)?;
        let mut session = handle.lock().await;
        if session.finalized {
            return Err(not_found());
        }

        let message = message.trim();
        if message.is_empty() {
            return Err(ConversationError::Validation("Message is required".to_string()));
        }

        session.push_user(message);

        let Some(reply) = self.generate(&session.conversation_history).await else {
            tracing::warn!(
                session_id = %id,
                turns = session.conversation_history.len(),
                "Reply generation failed; user turn kept in history"
            );
            return Err(ConversationError::Generation(
                "Failed to generate reply".to_string(),
            ));
        };

        session.record_reply(reply.clone());
        tracing::info!(
            session_id = %id,
            turns = session.conversation_history.len(),
            "Blueprint revised"
        );

        Ok(ReplyOutcome {
            reply: reply.clone(),
            blueprint: reply,
        })
    }

    /// Render the current blueprint, mail it, and close the session.
    pub async fn finalize(&self, session_id: &str) -> Result<FinalizeOutcome, ConversationError> {
        let (id, handle) = self.lookup(session_id)?;
        let mut session = handle.lock().await;
        if session.finalized {
            return Err(not_found());
        }

        if session.current_blueprint.trim().is_empty() {
            return Err(ConversationError::Validation(
                "No blueprint available to finalize".to_string(),
            ));
        }

        if let Err(e) = self.deliver(&session).await {
            tracing::error!(session_id = %id, error = %e, "Blueprint delivery failed");
            return Err(e.into());
        }

        session.finalized = true;
        let recipient = session.requester_email.clone();
        drop(session);
        self.store.remove(&id);

        tracing::info!(session_id = %id, "Blueprint session finalized");

        Ok(FinalizeOutcome {
            message: format!("Blueprint finalized and sent to {}", recipient),
            recipient,
        })
    }

    async fn generate(&self, history: &[ChatMessage]) -> Option<String> {
        let text = self.completion.complete(history).await?;
        let text = normalize(&text);
        (!text.is_empty()).then_some(text)
    }

    fn lookup(&self, session_id: &str) -> Result<(Uuid, SessionHandle), ConversationError> {
        let id = Uuid::parse_str(session_id.trim()).map_err(|_| not_found())?;
        let handle = self.store.get(&id).ok_or_else(not_found)?;
        Ok((id, handle))
    }

    async fn deliver(&self, session: &Session) -> Result<(), BlueprintError> {
        let renderer = Arc::clone(&self.renderer);
        let text = session.current_blueprint.clone();
        let pdf = tokio::task::spawn_blocking(move || renderer.render(&text))
            .await
            .map_err(|e| BlueprintError::Other(format!("render task failed: {}", e)))??;

        if let Some(dir) = &self.archive_dir {
            archive(dir, session.id, &pdf).await?;
        }

        self.mailer
            .send(Delivery {
                recipient: session.requester_email.clone(),
                subject: MAIL_SUBJECT.to_string(),
                body: MAIL_BODY.to_string(),
                attachment_name: ATTACHMENT_NAME.to_string(),
                attachment: pdf,
            })
            .await?;

        Ok(())
    }
}

fn not_found() -> ConversationError {
    ConversationError::NotFound("Invalid session ID".to_string())
}

async fn archive(dir: &Path, id: Uuid, pdf: &[u8]) -> Result<(), BlueprintError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("blueprint-{}.pdf", id));
    tokio::fs::write(&path, pdf).await?;
    tracing::debug!(path = %path.display(), "Blueprint archived");
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
