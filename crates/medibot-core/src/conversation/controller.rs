use super::client::{SendReply, SessionClient};
use super::message::{Feedback, Message, MessageIdGenerator, MessageMetadata};
use super::reconciler::HistoryReconciler;
use super::state::{Activity, ConversationState, LifecyclePhase, NewConversationOutcome};
use crate::config::{ClientConfig, NewConversationFallback};
use crate::error::{MedibotError, Result};
use crate::session::{SessionInfo, SessionStatus, SessionStore};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Drives one conversation through its session lifecycle.
///
/// `ConversationController` is responsible for:
/// - Restoring the stored session on startup, or falling back to a fresh one
/// - Appending exchanged messages in request-issue order
/// - Adopting session ids allocated or rotated by the server
/// - Starting and clearing conversations
/// - Recording client-local feedback
///
/// At most one request is in flight at a time. A second `initialize`, `send`,
/// `new_conversation` or `clear_conversation` issued while one is pending is
/// refused with a precondition error.
pub struct ConversationController {
    store: Arc<dyn SessionStore>,
    client: Arc<dyn SessionClient>,
    config: ClientConfig,
    ids: MessageIdGenerator,
    state: Mutex<ConversationState>,
}

/// Marks a request as in flight for as long as it lives.
///
/// Dropping the guard clears `is_loading` and, if the request ended without
/// settling the phase (e.g. its future was dropped), restores `fallback`.
struct FlightGuard<'a> {
    state: &'a Mutex<ConversationState>,
    in_flight: LifecyclePhase,
    fallback: LifecyclePhase,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.is_loading = false;
        if state.phase == self.in_flight {
            state.phase = self.fallback;
        }
    }
}

impl ConversationController {
    /// Creates an uninitialized controller.
    ///
    /// # Arguments
    ///
    /// * `store` - Durable slot holding the current session id
    /// * `client` - Remote session operations
    /// * `config` - Messages, limits and fallback policy
    pub fn new(
        store: Arc<dyn SessionStore>,
        client: Arc<dyn SessionClient>,
        config: ClientConfig,
    ) -> Self {
        Self {
            store,
            client,
            config,
            ids: MessageIdGenerator::new(),
            state: Mutex::new(ConversationState::default()),
        }
    }

    /// Returns a snapshot of the conversation.
    pub fn state(&self) -> ConversationState {
        self.lock_state().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock_state().is_loading
    }

    /// Restores the stored session, or starts from a welcome message.
    ///
    /// A stored session the server no longer recognizes is discarded
    /// (fail-safe reset). Calling this again from `Ready` reloads the
    /// history and replaces the message list wholesale.
    ///
    /// # Errors
    ///
    /// - `Precondition` if a request is in flight
    /// - The store's error if a stale session could not be cleared; the
    ///   controller is then left in `LifecyclePhase::Error`
    /// - The history error when reloading from `Ready` fails for a reason
    ///   other than an invalid session; the transcript is kept as it was
    pub async fn initialize(&self) -> Result<()> {
        let flight = self.begin_initialize()?;
        let reloading = flight.fallback == LifecyclePhase::Ready(Activity::Idle);

        let stored = self.store.get().await;
        let Some(session_id) = stored.session_id.clone() else {
            tracing::info!("[Conversation] No stored session, starting fresh");
            self.reset_messages(SessionInfo::none(), SessionStatus::None);
            return Ok(());
        };

        if !self.client.check_active(&session_id).await {
            return self.fail_safe_reset(&session_id).await;
        }

        match self.client.fetch_history(&session_id).await {
            Ok(records) => {
                let messages = HistoryReconciler::reconcile(&records, &self.ids);
                tracing::info!(
                    "[Conversation] Restored {} messages from session {}",
                    messages.len(),
                    session_id
                );
                if messages.is_empty() {
                    self.reset_messages(stored, SessionStatus::Active);
                } else {
                    let mut state = self.lock_state();
                    state.messages = messages;
                    state.session_info = stored;
                    state.session_status = SessionStatus::Active;
                    state.started = true;
                    state.phase = LifecyclePhase::Ready(Activity::Idle);
                }
                Ok(())
            }
            Err(e) if e.is_session_invalid() => self.fail_safe_reset(&session_id).await,
            Err(e) if reloading => {
                tracing::warn!(
                    "[Conversation] Failed to reload history for session {}, keeping transcript: {}",
                    session_id,
                    e
                );
                Err(e)
            }
            Err(e) => {
                tracing::warn!(
                    "[Conversation] Failed to load history for session {}: {}",
                    session_id,
                    e
                );
                self.reset_messages(stored, SessionStatus::Active);
                Ok(())
            }
        }
    }

    /// Sends a user message and appends the reply.
    ///
    /// The user message is appended before the request is issued and is
    /// never removed. If the exchange fails, a single synthetic assistant
    /// message with `is_error` set is appended after it instead of a reply.
    ///
    /// # Returns
    ///
    /// The appended assistant message (the reply or the error message).
    ///
    /// # Errors
    ///
    /// `Precondition` if the controller is not idle or the text is blank or
    /// too long. Nothing is appended in that case. Remote failures are never
    /// returned. A session the server rejects is dropped from the store so
    /// the next send starts a fresh one.
    pub async fn send(&self, text: &str) -> Result<Message> {
        let text = text.trim();
        self.validate_input(text)?;

        let (sent_session, _flight) = {
            let mut state = self.lock_state();
            Self::ensure_idle(&state, "send")?;
            state.messages.push(Message::user(self.ids.next_id(), text));
            let sent_session = state.session_info.session_id.clone();
            (sent_session, self.mark_in_flight(&mut state))
        };

        match self.client.send_message(sent_session.as_deref(), text).await {
            Ok(reply) => {
                let session_id = self.adopt_session(sent_session.as_deref(), &reply).await;
                let message = Message::assistant(
                    self.ids.next_id(),
                    reply.response,
                    MessageMetadata {
                        has_context: reply.has_context,
                        sources: reply.sources,
                        generation_time: Some(reply.generation_time),
                    },
                );
                if message.metadata.as_ref().is_some_and(|m| m.has_context) {
                    tracing::debug!("[Conversation] Reply used conversation context");
                }

                let mut state = self.lock_state();
                state.session_info = SessionInfo::from_optional(session_id);
                state.session_status = SessionStatus::Active;
                state.messages.push(message.clone());
                state.started = true;
                state.phase = LifecyclePhase::Ready(Activity::Idle);
                Ok(message)
            }
            Err(e) => {
                tracing::warn!("[Conversation] Send failed: {}", e);
                let expired = e.is_session_invalid();
                if expired {
                    // The next send goes out without an id and adopts whatever the server allocates.
                    if let Err(e) = self.store.clear().await {
                        tracing::warn!("[Conversation] Failed to clear rejected session id: {}", e);
                    }
                }
                let message = Message::error(self.ids.next_id(), &self.config.error_message);

                let mut state = self.lock_state();
                if expired {
                    state.session_info = SessionInfo::none();
                    state.session_status = SessionStatus::Expired;
                }
                state.messages.push(message.clone());
                state.phase = LifecyclePhase::Ready(Activity::Idle);
                Ok(message)
            }
        }
    }

    /// Starts a new conversation and resets the local history.
    ///
    /// The local reset happens even if the server cannot be reached; what
    /// happens to the held session id then depends on
    /// `ClientConfig::on_new_conversation_failure`.
    ///
    /// # Errors
    ///
    /// `Precondition` if the controller is not idle.
    pub async fn new_conversation(&self) -> Result<NewConversationOutcome> {
        let _flight = self.begin_exchange("new conversation")?;

        match self.client.start_new_conversation().await {
            Ok(session_id) => {
                if let Err(e) = self.store.set(&session_id).await {
                    tracing::warn!("[Conversation] Failed to persist new session id: {}", e);
                }
                tracing::info!("[Conversation] Started new conversation {}", session_id);
                self.reset_messages(SessionInfo::with_id(&session_id), SessionStatus::Active);
                Ok(NewConversationOutcome::Started { session_id })
            }
            Err(error) => {
                tracing::warn!(
                    "[Conversation] Failed to start new conversation, resetting locally: {}",
                    error
                );
                let kept_session = match self.config.on_new_conversation_failure {
                    NewConversationFallback::KeepSession => {
                        let (info, status) = {
                            let state = self.lock_state();
                            (state.session_info.clone(), state.session_status)
                        };
                        let kept = info.session_id.clone();
                        self.reset_messages(info, status);
                        kept
                    }
                    NewConversationFallback::DiscardSession => {
                        if let Err(e) = self.store.clear().await {
                            tracing::warn!("[Conversation] Failed to clear session store: {}", e);
                        }
                        self.reset_messages(SessionInfo::none(), SessionStatus::None);
                        None
                    }
                };
                Ok(NewConversationOutcome::Degraded {
                    error,
                    kept_session,
                })
            }
        }
    }

    /// Wipes the conversation history, keeping the session id.
    ///
    /// Local history is only cleared once the server confirms.
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: history cleared
    /// - `Ok(false)`: the server declined; local state is untouched
    ///
    /// # Errors
    ///
    /// `Precondition` if the controller is not idle, or the remote error;
    /// local state is untouched in both cases.
    pub async fn clear_conversation(&self) -> Result<bool> {
        let _flight = self.begin_exchange("clear conversation")?;

        let (info, status) = {
            let state = self.lock_state();
            (state.session_info.clone(), state.session_status)
        };

        let Some(session_id) = info.session_id.clone() else {
            // Nothing is stored remotely without a session.
            self.reset_messages(info, status);
            return Ok(true);
        };

        match self.client.clear_conversation(&session_id).await {
            Ok(true) => {
                tracing::info!("[Conversation] Cleared session {}", session_id);
                self.reset_messages(info, status);
                Ok(true)
            }
            Ok(false) => {
                tracing::warn!("[Conversation] Server did not clear session {}", session_id);
                Ok(false)
            }
            Err(e) => {
                tracing::warn!("[Conversation] Failed to clear session {}: {}", session_id, e);
                Err(e)
            }
        }
    }

    /// Sets or removes the feedback of a message.
    ///
    /// Always allowed, including while a request is in flight. Returns
    /// `false` if no message has the given id.
    pub fn record_feedback(&self, message_id: u64, feedback: Option<Feedback>) -> bool {
        let mut state = self.lock_state();
        match state.messages.iter_mut().find(|m| m.id == message_id) {
            Some(message) => {
                message.feedback = feedback;
                tracing::debug!(
                    "[Conversation] Feedback for message {}: {:?}",
                    message_id,
                    feedback
                );
                true
            }
            None => false,
        }
    }

    // ============================================================================
    // Internals
    // ============================================================================

    fn lock_state(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn validate_input(&self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Err(MedibotError::precondition("message is empty"));
        }
        let length = text.chars().count();
        if length > self.config.max_message_chars {
            return Err(MedibotError::precondition(format!(
                "message is {} characters long, the limit is {}",
                length, self.config.max_message_chars
            )));
        }
        Ok(())
    }

    fn ensure_idle(state: &ConversationState, operation: &str) -> Result<()> {
        if state.is_loading || !state.phase.is_idle() {
            return Err(MedibotError::precondition(format!(
                "cannot {} while {:?}",
                operation, state.phase
            )));
        }
        Ok(())
    }

    fn mark_in_flight(&self, state: &mut ConversationState) -> FlightGuard<'_> {
        state.is_loading = true;
        state.phase = LifecyclePhase::Ready(Activity::Sending);
        FlightGuard {
            state: &self.state,
            in_flight: LifecyclePhase::Ready(Activity::Sending),
            fallback: LifecyclePhase::Ready(Activity::Idle),
        }
    }

    fn begin_exchange(&self, operation: &str) -> Result<FlightGuard<'_>> {
        let mut state = self.lock_state();
        Self::ensure_idle(&state, operation)?;
        Ok(self.mark_in_flight(&mut state))
    }

    fn begin_initialize(&self) -> Result<FlightGuard<'_>> {
        let mut state = self.lock_state();
        let allowed = matches!(
            state.phase,
            LifecyclePhase::Uninitialized | LifecyclePhase::Error | LifecyclePhase::Ready(Activity::Idle)
        );
        if state.is_loading || !allowed {
            return Err(MedibotError::precondition(format!(
                "cannot initialize while {:?}",
                state.phase
            )));
        }
        let fallback = state.phase;
        state.is_loading = true;
        state.phase = LifecyclePhase::Initializing;
        Ok(FlightGuard {
            state: &self.state,
            in_flight: LifecyclePhase::Initializing,
            fallback,
        })
    }

    fn welcome_message(&self) -> Message {
        Message::assistant(
            self.ids.next_id(),
            &self.config.welcome_message,
            MessageMetadata::default(),
        )
    }

    /// Replaces the history with the welcome message and settles in Idle.
    fn reset_messages(&self, session_info: SessionInfo, status: SessionStatus) {
        let welcome = self.welcome_message();
        let mut state = self.lock_state();
        state.messages = vec![welcome];
        state.session_info = session_info;
        state.session_status = status;
        state.started = false;
        state.phase = LifecyclePhase::Ready(Activity::Idle);
    }

    async fn fail_safe_reset(&self, session_id: &str) -> Result<()> {
        tracing::warn!(
            "[Conversation] Session {} is no longer active, starting fresh",
            session_id
        );
        let cleared = self.store.clear().await;
        self.reset_messages(SessionInfo::none(), SessionStatus::Expired);

        if let Err(e) = cleared {
            tracing::warn!("[Conversation] Failed to clear stale session id: {}", e);
            self.lock_state().phase = LifecyclePhase::Error;
            return Err(e);
        }
        Ok(())
    }

    /// Persists a session id allocated or rotated by the server.
    ///
    /// Returns the id the conversation continues under.
    async fn adopt_session(&self, sent: Option<&str>, reply: &SendReply) -> Option<String> {
        let returned = reply.session_id.as_str();
        if returned.is_empty() || sent == Some(returned) {
            return sent.map(str::to_string);
        }

        match sent {
            None => tracing::info!("[Conversation] Server allocated session {}", returned),
            Some(previous) => tracing::info!(
                "[Conversation] Session rotated: {} -> {}",
                previous,
                returned
            ),
        }
        if let Err(e) = self.store.set(returned).await {
            tracing::warn!("[Conversation] Failed to persist session id {}: {}", returned, e);
        }
        Some(returned.to_string())
    }
}
