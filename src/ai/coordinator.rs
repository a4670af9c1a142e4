//! The AI edit transaction.
//!
//! ```text
//! Idle -> AwaitingModel -> ApplyingResult -> Idle
//!                       \-> Failed --------> Idle
//! ```
//!
//! Only one request may be awaiting the model at a time; a second submission
//! is refused with [`Error::Busy`]. While a request is in flight the workspace
//! is held in the AI view, so no other view can write the document.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::chat::{ChatLog, ChatMessage};
use super::client::TextService;
use super::placeholder::ImagePlaceholderMap;
use super::prompt::build_prompt;
use super::response::parse_response;
use crate::config::AiConfig;
use crate::error::{Error, Result};
use crate::surface::{DocumentContent, Workspace};

const MISSING_KEY_MESSAGE: &str =
    "Please configure your Gemini API key first (design-render config set-key <KEY>).";
const APPLIED_FALLBACK_MESSAGE: &str =
    "I've updated the design for you! Let me know if you'd like any other changes.";
const FAILURE_MESSAGE: &str =
    "Sorry, I encountered an error while processing your request. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CoordinatorState {
    Idle = 0,
    AwaitingModel = 1,
    ApplyingResult = 2,
    Failed = 3,
}

impl CoordinatorState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::AwaitingModel,
            2 => Self::ApplyingResult,
            3 => Self::Failed,
            _ => Self::Idle,
        }
    }
}

/// How a submission ended. Busy submissions are an `Err`, not an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The edit was written to the workspace.
    Applied {
        message: String,
        /// Placeholder tokens the model dropped; those images are gone.
        missing_images: Vec<String>,
    },
    /// The request failed or the reply broke the contract. Document untouched.
    Failed { reason: String },
    /// No API key; nothing was sent.
    MissingCredential,
    /// The session closed while the model was working. Nothing was applied.
    Discarded,
    /// Blank request.
    Ignored,
}

/// Runs AI edit requests against a shared [`Workspace`].
pub struct AiCoordinator {
    service: Arc<dyn TextService>,
    config: Mutex<AiConfig>,
    workspace: Arc<Mutex<Workspace>>,
    chat: Mutex<ChatLog>,
    state: AtomicU8,
    generation: AtomicU64,
    live: AtomicBool,
}

impl std::fmt::Debug for AiCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiCoordinator")
            .field("state", &self.state())
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .field("live", &self.is_live())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resets the coordinator when a submission ends, on every path.
struct InFlight<'a> {
    coordinator: &'a AiCoordinator,
    holds_workspace: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.holds_workspace {
            lock(&self.coordinator.workspace).abort_ai();
        }
        self.coordinator.set_state(CoordinatorState::Idle);
    }
}

impl AiCoordinator {
    pub fn new(
        service: Arc<dyn TextService>,
        config: AiConfig,
        workspace: Arc<Mutex<Workspace>>,
    ) -> Self {
        Self {
            service,
            config: Mutex::new(config),
            workspace,
            chat: Mutex::new(ChatLog::new()),
            state: AtomicU8::new(CoordinatorState::Idle as u8),
            generation: AtomicU64::new(0),
            live: AtomicBool::new(true),
        }
    }

    pub fn state(&self) -> CoordinatorState {
        CoordinatorState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// True while a request is awaiting the model or being applied.
    pub fn is_generating(&self) -> bool {
        matches!(
            self.state(),
            CoordinatorState::AwaitingModel | CoordinatorState::ApplyingResult
        )
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub fn chat(&self) -> ChatLog {
        lock(&self.chat).clone()
    }

    pub fn config(&self) -> AiConfig {
        lock(&self.config).clone()
    }

    /// Switch the model for later requests in this session.
    pub fn set_model(&self, model: impl Into<String>) {
        lock(&self.config).model = model.into();
    }

    pub fn workspace(&self) -> Arc<Mutex<Workspace>> {
        Arc::clone(&self.workspace)
    }

    /// Tear down the session. A request still in flight finishes its network
    /// call, but its result is dropped.
    pub fn close(&self) {
        self.live.store(false, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("ai session closed");
    }

    fn set_state(&self, state: CoordinatorState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.is_live() && self.generation.load(Ordering::SeqCst) == generation
    }

    fn say(&self, message: ChatMessage) {
        lock(&self.chat).push(message);
    }

    /// Run one edit request to completion.
    pub async fn submit(&self, request: &str) -> Result<SubmitOutcome> {
        let request = request.trim();
        if request.is_empty() {
            return Ok(SubmitOutcome::Ignored);
        }
        if !self.is_live() {
            return Ok(SubmitOutcome::Discarded);
        }
        if self
            .state
            .compare_exchange(
                CoordinatorState::Idle as u8,
                CoordinatorState::AwaitingModel as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return Err(Error::Busy);
        }
        let mut in_flight = InFlight {
            coordinator: self,
            holds_workspace: false,
        };

        let config = self.config();
        self.say(ChatMessage::user(request));
        if !config.has_credential() {
            tracing::warn!("ai request refused, no API key configured");
            self.say(ChatMessage::model(MISSING_KEY_MESSAGE));
            return Ok(SubmitOutcome::MissingCredential);
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = lock(&self.workspace).begin_ai()?;
        in_flight.holds_workspace = true;

        let mut images = ImagePlaceholderMap::new();
        let html = images.strip(&snapshot.html);
        let css = images.strip(&snapshot.css);
        let prompt = build_prompt(request, &html, &css);
        tracing::debug!(
            model = %config.model,
            images = images.len(),
            prompt_len = prompt.len(),
            "awaiting model"
        );

        let reply = self.service.generate(&config, &prompt).await;

        if !self.is_current(generation) {
            tracing::info!(generation, "ai result discarded, session superseded");
            return Ok(SubmitOutcome::Discarded);
        }

        let edit = match reply.and_then(|text| parse_response(&text)) {
            Ok(edit) => edit,
            Err(e) => {
                tracing::warn!(error = %e, "ai edit failed");
                self.set_state(CoordinatorState::Failed);
                self.say(ChatMessage::model(FAILURE_MESSAGE));
                return Ok(SubmitOutcome::Failed {
                    reason: e.to_string(),
                });
            }
        };

        self.set_state(CoordinatorState::ApplyingResult);
        let missing_images = images.missing_tokens(&[&edit.html, &edit.css]);
        if !missing_images.is_empty() {
            tracing::warn!(missing = ?missing_images, "model dropped image placeholders");
        }
        let content = DocumentContent {
            html: images.restore(&edit.html),
            css: images.restore(&edit.css),
        };
        lock(&self.workspace).finish_ai(Some(&content))?;
        in_flight.holds_workspace = false;

        let message = edit
            .message
            .unwrap_or_else(|| APPLIED_FALLBACK_MESSAGE.to_string());
        self.say(ChatMessage::model(message.clone()));
        tracing::info!(generation, html_len = content.html.len(), "ai edit applied");

        Ok(SubmitOutcome::Applied {
            message,
            missing_images,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ChatRole;
    use crate::surface::{MemorySurface, View};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    const PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUg==";

    struct MockService {
        reply: std::result::Result<String, String>,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
        gate: Option<Arc<Notify>>,
    }

    impl MockService {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
                gate: None,
            }
        }

        fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }
    }

    #[async_trait]
    impl TextService for MockService {
        async fn generate(&self, _config: &AiConfig, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.reply.clone().map_err(Error::AiRequest)
        }
    }

    fn setup(service: Arc<MockService>, key: &str) -> AiCoordinator {
        let content = DocumentContent::new(
            format!(r#"<div class="card"><img src="{PNG}"><h1>Hello</h1></div>"#),
            "h1{color:black}",
        );
        let workspace = Workspace::new(Box::new(MemorySurface::new(&content)));
        AiCoordinator::new(
            service,
            AiConfig::new(key),
            Arc::new(Mutex::new(workspace)),
        )
    }

    fn html_of(coordinator: &AiCoordinator) -> String {
        let workspace = coordinator.workspace();
        let html = workspace.lock().unwrap().content().html;
        html
    }

    #[tokio::test]
    async fn test_applies_edit_and_restores_images() {
        let service = Arc::new(MockService::replying(
            r#"{"html":"<div class=\"card\"><img src=\"__BASE64_IMAGE_0__\"><h1>Hi</h1></div>","css":"h1{color:red}","message":"Made it red"}"#,
        ));
        let coordinator = setup(service.clone(), "key");

        let outcome = coordinator.submit("make the title red").await.unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Applied {
                message: "Made it red".to_string(),
                missing_images: Vec::new(),
            }
        );

        let prompt = service.last_prompt.lock().unwrap().clone().unwrap();
        assert!(!prompt.contains("base64"));
        assert!(prompt.contains("__BASE64_IMAGE_0__"));

        let html = html_of(&coordinator);
        assert!(html.contains(PNG));
        assert!(html.contains("<h1>Hi</h1>"));
        assert_eq!(coordinator.state(), CoordinatorState::Idle);
        assert_eq!(coordinator.workspace().lock().unwrap().view(), View::Canvas);

        let chat = coordinator.chat();
        assert_eq!(chat.len(), 2);
        assert_eq!(chat.messages()[0].role, ChatRole::User);
        assert_eq!(chat.messages()[1].text, "Made it red");
    }

    #[tokio::test]
    async fn test_fallback_message_when_model_omits_it() {
        let service = Arc::new(MockService::replying(r#"{"html":"<p>x</p>","css":"p{}"}"#));
        let coordinator = setup(service, "key");
        let outcome = coordinator.submit("simplify").await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Applied { ref missing_images, .. } if missing_images.len() == 1));
        assert_eq!(coordinator.chat().last().unwrap().text, APPLIED_FALLBACK_MESSAGE);
    }

    #[tokio::test]
    async fn test_contract_violation_leaves_document() {
        let service = Arc::new(MockService::replying(r#"{"html":"<p>x</p>","message":"oops"}"#));
        let coordinator = setup(service, "key");
        let before = html_of(&coordinator);

        let outcome = coordinator.submit("anything").await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Failed { .. }));
        assert_eq!(html_of(&coordinator), before);
        assert_eq!(coordinator.chat().last().unwrap().text, FAILURE_MESSAGE);
        assert_eq!(coordinator.state(), CoordinatorState::Idle);
        assert_eq!(coordinator.workspace().lock().unwrap().view(), View::Canvas);
    }

    #[tokio::test]
    async fn test_missing_key_sends_nothing() {
        let service = Arc::new(MockService::replying("{}"));
        let coordinator = setup(service.clone(), "");

        let outcome = coordinator.submit("make it blue").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::MissingCredential);
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);

        let chat = coordinator.chat();
        assert_eq!(chat.len(), 2);
        assert_eq!(chat.messages()[1].text, MISSING_KEY_MESSAGE);
    }

    #[tokio::test]
    async fn test_blank_request_ignored() {
        let service = Arc::new(MockService::replying("{}"));
        let coordinator = setup(service.clone(), "key");
        assert_eq!(coordinator.submit("   ").await.unwrap(), SubmitOutcome::Ignored);
        assert!(coordinator.chat().is_empty());
    }

    #[tokio::test]
    async fn test_second_submit_while_awaiting_is_busy() {
        let gate = Arc::new(Notify::new());
        let service = Arc::new(
            MockService::replying(r#"{"html":"<p>done</p>","css":"p{}"}"#).gated(gate.clone()),
        );
        let coordinator = Arc::new(setup(service.clone(), "key"));

        let first = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.submit("first").await }
        });
        while coordinator.state() != CoordinatorState::AwaitingModel
            || service.calls.load(Ordering::SeqCst) == 0
        {
            tokio::task::yield_now().await;
        }

        assert!(coordinator.is_generating());
        assert!(matches!(coordinator.submit("second").await, Err(Error::Busy)));
        assert!(coordinator.workspace().lock().unwrap().switch_view(View::Code).is_err());

        gate.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert!(matches!(outcome, SubmitOutcome::Applied { .. }));
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert_eq!(html_of(&coordinator), "<p>done</p>");
    }

    #[tokio::test]
    async fn test_close_discards_in_flight_result() {
        let gate = Arc::new(Notify::new());
        let service = Arc::new(
            MockService::replying(r#"{"html":"<p>late</p>","css":"p{}"}"#).gated(gate.clone()),
        );
        let coordinator = Arc::new(setup(service.clone(), "key"));
        let before = html_of(&coordinator);

        let pending = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.submit("edit").await }
        });
        while service.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        coordinator.close();
        gate.notify_one();

        assert_eq!(pending.await.unwrap().unwrap(), SubmitOutcome::Discarded);
        assert_eq!(html_of(&coordinator), before);
        assert_eq!(coordinator.chat().len(), 1);
        assert_eq!(coordinator.state(), CoordinatorState::Idle);
        assert_eq!(coordinator.submit("again").await.unwrap(), SubmitOutcome::Discarded);
    }
}
