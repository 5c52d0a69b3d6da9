use crate::types::OutboundMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicState {
    Idle,
    Active,
    /// Recognition is not available for the rest of the session.
    Unavailable,
}

/// UI-facing changes produced by one transition, in the order they should be
/// applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEffect {
    RenderUserMessage(String),
    RenderBotMessage(String),
    RenderSystem(String),
    RenderError(String),
    SetConnectionStatus { connected: bool, label: String },
    SetInputEnabled(bool),
    ClearInput,
    SetMicState(MicState),
    /// The listening indicator shown while voice mode is active.
    SetVoiceModeIndicator(bool),
    SetSpeakerState(bool),
    SetLanguageIndicator { tag: String, glyph: &'static str },
    ShowTypingIndicator,
    HideTypingIndicator,
}

/// Side effects the session asks the runtime to perform.
///
/// This keeps the session's decision-making apart from the adapters that
/// actually touch the network and the speech engines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect,
    Close,
    Send(OutboundMessage),
    StartRecognition,
    StopRecognition,
    Speak {
        text: String,
        language: Option<String>,
    },
    CancelSpeech,
}

/// Result of handling one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    pub effects: Vec<UiEffect>,
    pub commands: Vec<Command>,
}

impl Transition {
    pub(crate) fn effect(&mut self, effect: UiEffect) {
        self.effects.push(effect);
    }

    pub(crate) fn command(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub(crate) fn system(&mut self, text: &str) {
        self.effects.push(UiEffect::RenderSystem(text.to_string()));
    }

    pub(crate) fn error(&mut self, text: String) {
        self.effects.push(UiEffect::RenderError(text));
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty() && self.commands.is_empty()
    }

    /// Outbound frames this transition sends.
    pub fn sent_messages(&self) -> impl Iterator<Item = &OutboundMessage> {
        self.commands.iter().filter_map(|command| match command {
            Command::Send(message) => Some(message),
            _ => None,
        })
    }

    pub fn has_command(&self, command: &Command) -> bool {
        self.commands.contains(command)
    }
}
