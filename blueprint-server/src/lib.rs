pub mod http;
pub mod subsystems;

use std::sync::Arc;

use blueprint_core::{
    BlueprintConfig, BlueprintError, CompletionBackend, DocumentRenderer, Mailer,
    OpenAiCompletionClient, SmtpMailer,
};

use crate::http::HttpState;
use crate::subsystems::conversation::ConversationController;
use crate::subsystems::sessions::SessionStore;

/// Wire the production collaborators (OpenAI-compatible completion, SMTP,
/// PDF renderer) around a fresh session store.
pub fn build_state(
    config: BlueprintConfig,
    store: Arc<SessionStore>,
) -> Result<HttpState, BlueprintError> {
    let completion = OpenAiCompletionClient::new(&config.completion)?;
    let renderer = DocumentRenderer::from_config(&config.document)?;
    let mailer = SmtpMailer::new(&config.mail)?;

    tracing::info!(
        completion = completion.name(),
        model = %config.completion.model,
        classifier = renderer.classifier_name(),
        mailer = mailer.name(),
        smtp_host = %config.mail.host,
        "Blueprint collaborators ready"
    );

    let mut controller = ConversationController::new(
        store,
        Arc::new(completion),
        Arc::new(renderer),
        Arc::new(mailer),
    );
    if let Some(dir) = &config.document.archive_dir {
        controller = controller.with_archive_dir(dir);
    }

    Ok(HttpState { controller, config })
}
