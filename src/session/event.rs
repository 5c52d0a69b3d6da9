use crate::client::TransportEvent;
use crate::types::{RecognitionEvent, SynthesisEvent};

/// Actions initiated by the person at the keyboard or microphone button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    SubmitText(String),
    ToggleVoiceMode,
    ToggleTts,
    Reconnect,
    Quit,
}

/// Everything that can arrive on the session's event queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Transport(TransportEvent),
    Recognition(RecognitionEvent),
    Synthesis(SynthesisEvent),
    User(UserAction),
    /// Voice mode saw no recognition activity for the configured period.
    VoiceIdleTimeout,
}

impl From<TransportEvent> for SessionEvent {
    fn from(event: TransportEvent) -> Self {
        Self::Transport(event)
    }
}

impl From<RecognitionEvent> for SessionEvent {
    fn from(event: RecognitionEvent) -> Self {
        Self::Recognition(event)
    }
}

impl From<SynthesisEvent> for SessionEvent {
    fn from(event: SynthesisEvent) -> Self {
        Self::Synthesis(event)
    }
}

impl From<UserAction> for SessionEvent {
    fn from(action: UserAction) -> Self {
        Self::User(action)
    }
}
