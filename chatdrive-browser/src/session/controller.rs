//! Session lifecycle and operation sequencing.

use super::account;
use super::driver;
use super::extractor;
use super::message::ChatMessage;
use super::options::SessionOptions;
use super::store::MessageStore;
use crate::error::{Result, SessionError};
use crate::handle::{AutomationHandle, HandleFactory};
use crate::humanize;
use crate::ids::{ConversationId, MessageId};
use crate::wait::{poll_until, WaitOutcome};
use chatdrive_common::util::truncate_with_ellipsis;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Uninitialized,
    Active,
    Terminated,
}

/// How a completion wait ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Completed,
    Cancelled,
}

/// One conversation driven through an automation handle.
///
/// Operations take `&mut self`; a session serves a single caller.
pub struct Session<F: HandleFactory> {
    factory: F,
    options: SessionOptions,
    handle: Option<F::Handle>,
    state: SessionState,
    store: MessageStore,
    /// Exchanges recorded before the last submission.
    traffic_mark: usize,
}

impl<F: HandleFactory> Session<F> {
    pub fn new(factory: F, options: SessionOptions) -> Self {
        Self {
            factory,
            options,
            handle: None,
            state: SessionState::Uninitialized,
            store: MessageStore::new(),
            traffic_mark: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Open a fresh handle on a new conversation, or on `conversation_id`.
    ///
    /// Any previous handle is released first. The id is validated before
    /// anything else happens. A terminated session cannot be restarted.
    pub async fn start(&mut self, conversation_id: Option<&str>) -> Result<()> {
        if self.state == SessionState::Terminated {
            return Err(SessionError::SessionNotInitialized);
        }
        let conversation = conversation_id.map(ConversationId::parse).transpose()?;

        self.release_handle().await;
        self.store.clear();
        self.traffic_mark = 0;
        self.state = SessionState::Uninitialized;

        let url = self.options.start_url(conversation.as_ref());
        let mut handle = self.factory.create().await?;

        if let Err(e) = self.open(&handle, &url).await {
            if let Err(close_err) = handle.close().await {
                warn!(error = %close_err, "Failed to close handle after start failure");
            }
            return Err(e);
        }

        info!(
            url = %url,
            conversation = conversation.as_ref().map(|id| id.as_str()).unwrap_or("new"),
            "Session started"
        );
        self.handle = Some(handle);
        self.state = SessionState::Active;
        Ok(())
    }

    async fn open(&self, handle: &F::Handle, url: &str) -> Result<()> {
        handle.navigate(url).await?;

        let timeout = self.options.ready_timeout;
        let never = CancellationToken::new();
        let outcome = poll_until(timeout, self.options.poll_interval, &never, move || async move {
            Ok(handle.is_document_ready().await?.then_some(()))
        })
        .await?;

        match outcome {
            WaitOutcome::Ready(()) => Ok(()),
            WaitOutcome::TimedOut | WaitOutcome::Cancelled => {
                Err(SessionError::NotReady { timeout })
            }
        }
    }

    /// Conversation the page currently shows, if any.
    pub async fn current_conversation_id(&self) -> Result<Option<ConversationId>> {
        let handle = self.active_handle()?;
        let location = handle.current_url().await?;
        Ok(location.and_then(|location| self.options.conversation_from_location(&location)))
    }

    /// Type `text` into the page and submit it. Never retried.
    pub async fn send_message(&mut self, text: &str) -> Result<()> {
        self.ensure_active()?;
        let handle = self
            .handle
            .as_ref()
            .ok_or(SessionError::SessionNotInitialized)?;

        debug!(
            chars = text.chars().count(),
            text = %truncate_with_ellipsis(text, 80),
            "Sending message"
        );

        if self.options.completion.uses_traffic() {
            self.traffic_mark = handle.exchange_count().await?;
        }

        driver::send(handle, &self.options, text).await?;
        info!("Message submitted");
        Ok(())
    }

    /// Block until the reply to the last message is complete.
    ///
    /// A zero `timeout` waits indefinitely. Cancellation is reported as
    /// [`Completion::Cancelled`], not as an error.
    pub async fn wait_completion(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Completion> {
        let handle = self.active_handle()?;
        let strategy = &self.options.completion;
        let since = self.traffic_mark;

        let outcome = poll_until(timeout, self.options.poll_interval, cancel, move || async move {
            Ok(strategy.check(handle, since).await?.then_some(()))
        })
        .await?;

        match outcome {
            WaitOutcome::Ready(()) => {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(Completion::Cancelled),
                    _ = humanize::random_sleep(&self.options.settle) => {}
                }
                info!("Reply complete");
                Ok(Completion::Completed)
            }
            WaitOutcome::Cancelled => {
                info!("Completion wait cancelled");
                Ok(Completion::Cancelled)
            }
            WaitOutcome::TimedOut => Err(SessionError::CompletionTimeout { timeout }),
        }
    }

    /// Messages currently rendered, in page order.
    pub async fn get_messages(&mut self) -> Result<Vec<ChatMessage>> {
        self.ensure_active()?;
        let handle = self
            .handle
            .as_ref()
            .ok_or(SessionError::SessionNotInitialized)?;
        extractor::collect(handle, &self.options, &mut self.store).await
    }

    /// Cached message by id, including ones no longer rendered.
    pub fn message(&self, id: &MessageId) -> Result<Option<&ChatMessage>> {
        self.ensure_active()?;
        Ok(self.store.get(id))
    }

    /// Flip the account's chat history setting.
    pub async fn toggle_history(&mut self) -> Result<()> {
        let handle = self.active_handle()?;
        account::toggle_history(handle, &self.options).await
    }

    /// Release the handle and forget all observed messages. Never fails.
    pub async fn quit(&mut self) {
        self.release_handle().await;
        self.store.clear();
        self.traffic_mark = 0;
        if self.state != SessionState::Terminated {
            info!("Session terminated");
        }
        self.state = SessionState::Terminated;
    }

    async fn release_handle(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if let Err(e) = handle.close().await {
                warn!(error = %e, "Failed to close automation handle");
            }
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.state == SessionState::Active && self.handle.is_some() {
            Ok(())
        } else {
            Err(SessionError::SessionNotInitialized)
        }
    }

    fn active_handle(&self) -> Result<&F::Handle> {
        self.ensure_active()?;
        self.handle
            .as_ref()
            .ok_or(SessionError::SessionNotInitialized)
    }
}

impl<F: HandleFactory> Drop for Session<F> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("Session dropped without quit; releasing handle");
            drop(handle);
        }
    }
}
