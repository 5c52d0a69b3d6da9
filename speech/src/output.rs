use crate::engine::{SynthesisEngine, SynthesisError};
use async_trait::async_trait;
use dali_voice_types::SynthesisEvent;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Command surface of the speech output adapter.
#[async_trait]
pub trait SpeechOutput: Send {
    /// Speaks `text`, cancelling any utterance still in flight.
    async fn speak(&mut self, text: String, language: Option<String>);

    async fn cancel(&mut self);
}

/// Drives a [`SynthesisEngine`] with cancel-then-speak semantics.
pub struct SynthesisAdapter<S, E> {
    engine: Arc<S>,
    events: mpsc::Sender<E>,
    current: Option<JoinHandle<()>>,
    disabled: Arc<AtomicBool>,
}

impl<S, E> SynthesisAdapter<S, E>
where
    S: SynthesisEngine,
    E: From<SynthesisEvent> + Send + 'static,
{
    pub fn new(engine: S, events: mpsc::Sender<E>) -> Self {
        Self {
            engine: Arc::new(engine),
            events,
            current: None,
            disabled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.current.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S, E> SpeechOutput for SynthesisAdapter<S, E>
where
    S: SynthesisEngine,
    E: From<SynthesisEvent> + Send + 'static,
{
    async fn speak(&mut self, text: String, language: Option<String>) {
        if self.is_disabled() {
            tracing::debug!("speech synthesis is disabled, dropping utterance");
            return;
        }
        self.cancel().await;

        if !self.engine.is_supported() {
            tracing::warn!("speech synthesis is not supported on this platform");
            self.disabled.store(true, Ordering::SeqCst);
            // Spawned so a full queue cannot block the caller that drains it.
            let events = self.events.clone();
            tokio::spawn(async move { emit(&events, SynthesisEvent::Unsupported).await });
            return;
        }

        let engine = self.engine.clone();
        let events = self.events.clone();
        let disabled = self.disabled.clone();
        self.current = Some(tokio::spawn(async move {
            tracing::debug!("speaking {} chars (language={:?})", text.len(), language);
            let event = match engine.speak(&text, language.as_deref()).await {
                Ok(()) => SynthesisEvent::Finished,
                Err(SynthesisError::Unsupported) => {
                    disabled.store(true, Ordering::SeqCst);
                    SynthesisEvent::Unsupported
                }
                Err(SynthesisError::Failed(reason)) => SynthesisEvent::Failed { reason },
            };
            emit(&events, event).await;
        }));
    }

    async fn cancel(&mut self) {
        if let Some(handle) = self.current.take() {
            if !handle.is_finished() {
                tracing::debug!("cancelling in-flight utterance");
            }
            handle.abort();
        }
    }
}

async fn emit<E: From<SynthesisEvent>>(events: &mpsc::Sender<E>, event: SynthesisEvent) {
    if let Err(e) = events.send(E::from(event)).await {
        tracing::warn!("failed to deliver synthesis event: {}", e);
    }
}
