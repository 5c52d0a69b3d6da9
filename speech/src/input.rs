use crate::engine::RecognitionEngine;
use async_trait::async_trait;
use dali_voice_types::{RecognitionErrorCode, RecognitionEvent};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Command surface of the speech input adapter.
#[async_trait]
pub trait SpeechInput: Send {
    /// Begins a single-shot recognition session. No-op while one is active.
    async fn start(&mut self);

    /// Ends the active session, if any.
    async fn stop(&mut self);
}

struct ActiveSession {
    cancel: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl ActiveSession {
    fn is_listening(&self) -> bool {
        self.cancel.is_some() && !self.handle.is_finished()
    }
}

/// Drives a [`RecognitionEngine`] and reports its progress as
/// [`RecognitionEvent`]s on the caller's queue.
pub struct RecognitionAdapter<R, E> {
    engine: Arc<R>,
    events: mpsc::Sender<E>,
    active: Option<ActiveSession>,
    disabled: Arc<AtomicBool>,
}

impl<R, E> RecognitionAdapter<R, E>
where
    R: RecognitionEngine,
    E: From<RecognitionEvent> + Send + 'static,
{
    pub fn new(engine: R, events: mpsc::Sender<E>) -> Self {
        Self {
            engine: Arc::new(engine),
            events,
            active: None,
            disabled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_listening(&self) -> bool {
        self.active.as_ref().is_some_and(ActiveSession::is_listening)
    }

    /// True once a capability error has been reported.
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R, E> SpeechInput for RecognitionAdapter<R, E>
where
    R: RecognitionEngine,
    E: From<RecognitionEvent> + Send + 'static,
{
    async fn start(&mut self) {
        if self.is_disabled() {
            tracing::debug!("speech recognition is disabled, ignoring start");
            return;
        }
        if self.is_listening() {
            tracing::debug!("speech recognition already active, ignoring start");
            return;
        }
        if !self.engine.is_supported() {
            tracing::warn!("speech recognition is not supported on this platform");
            self.disabled.store(true, Ordering::SeqCst);
            // Spawned so a full queue cannot block the caller that drains it.
            let events = self.events.clone();
            tokio::spawn(async move {
                let code = RecognitionErrorCode::Unsupported;
                emit(&events, RecognitionEvent::Error { code }).await;
            });
            return;
        }

        // A stopped session may still be flushing its terminal events; the
        // next one waits for it so sessions never interleave on the queue.
        let previous = self.active.take().map(|session| session.handle);
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let engine = self.engine.clone();
        let events = self.events.clone();
        let disabled = self.disabled.clone();

        let handle = tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            emit(&events, RecognitionEvent::Started).await;

            let terminal = tokio::select! {
                _ = cancel_rx => RecognitionEvent::Error { code: RecognitionErrorCode::Aborted },
                result = engine.recognize_once() => match result {
                    Ok(text) if !text.trim().is_empty() => RecognitionEvent::FinalTranscript {
                        text: text.trim().to_string(),
                    },
                    Ok(_) => RecognitionEvent::Error { code: RecognitionErrorCode::NoSpeech },
                    Err(code) => {
                        if code.is_capability_error() {
                            disabled.store(true, Ordering::SeqCst);
                        }
                        RecognitionEvent::Error { code }
                    }
                },
            };
            tracing::debug!("recognition session finished: {:?}", terminal);

            emit(&events, terminal).await;
            emit(&events, RecognitionEvent::Ended).await;
        });

        self.active = Some(ActiveSession {
            cancel: Some(cancel_tx),
            handle,
        });
    }

    async fn stop(&mut self) {
        if let Some(session) = self.active.as_mut() {
            if let Some(cancel) = session.cancel.take() {
                tracing::debug!("stopping speech recognition");
                let _ = cancel.send(());
            }
        }
    }
}

async fn emit<E: From<RecognitionEvent>>(events: &mpsc::Sender<E>, event: RecognitionEvent) {
    if let Err(e) = events.send(E::from(event)).await {
        tracing::warn!("failed to deliver recognition event: {}", e);
    }
}
