use crate::client::TransportEvent;
use crate::types::{InboundMessage, OutboundMessage, RecognitionErrorCode, RecognitionEvent, SynthesisEvent};

mod effect;
mod event;
pub mod language;

use language::glyph_for;
pub use effect::{Command, MicState, Transition, UiEffect};
pub use event::{SessionEvent, UserAction};

pub const STATUS_CONNECTING: &str = "Connecting...";
pub const STATUS_CONNECTED: &str = "Connected";
pub const STATUS_DISCONNECTED: &str = "Disconnected";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceMode {
    Idle,
    Active,
}

/// Who last wrote the voice mode. The most recent writer wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceModeSource {
    User,
    Backend,
}

/// Client session state and the transition function over it.
///
/// `handle` never performs I/O. Everything the session wants done comes back
/// in the returned [`Transition`], and the results of that work arrive later
/// as new events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    connection_state: ConnectionState,
    voice_mode: VoiceMode,
    voice_mode_source: Option<VoiceModeSource>,
    tts_enabled: bool,
    is_listening: bool,
    // A stop was requested for the session that is still listening.
    stop_requested: bool,
    // Voice mode wants a new session once the stopped one ends.
    rearm_pending: bool,
    is_speaking: bool,
    pending_transcript: Option<String>,
    last_language_tag: Option<String>,
    session_id: Option<String>,
    awaiting_reply: bool,
    recognition_available: bool,
    synthesis_available: bool,
    // `Errored` was seen and the attempt's `Closed` has not arrived yet.
    awaiting_close: bool,
    reconnect_deferred: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            connection_state: ConnectionState::Connecting,
            voice_mode: VoiceMode::Idle,
            voice_mode_source: None,
            tts_enabled: true,
            is_listening: false,
            stop_requested: false,
            rearm_pending: false,
            is_speaking: false,
            pending_transcript: None,
            last_language_tag: None,
            session_id: None,
            awaiting_reply: false,
            recognition_available: true,
            synthesis_available: true,
            awaiting_close: false,
            reconnect_deferred: false,
        }
    }

    pub fn with_tts_enabled(mut self, enabled: bool) -> Self {
        self.tts_enabled = enabled;
        self
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    pub fn voice_mode(&self) -> VoiceMode {
        self.voice_mode
    }

    pub fn voice_mode_source(&self) -> Option<VoiceModeSource> {
        self.voice_mode_source
    }

    pub fn is_voice_mode_active(&self) -> bool {
        self.voice_mode == VoiceMode::Active
    }

    pub fn tts_enabled(&self) -> bool {
        self.tts_enabled
    }

    pub fn is_listening(&self) -> bool {
        self.is_listening
    }

    pub fn is_speaking(&self) -> bool {
        self.is_speaking
    }

    pub fn pending_transcript(&self) -> Option<&str> {
        self.pending_transcript.as_deref()
    }

    pub fn last_language_tag(&self) -> Option<&str> {
        self.last_language_tag.as_deref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    pub fn recognition_available(&self) -> bool {
        self.recognition_available
    }

    pub fn synthesis_available(&self) -> bool {
        self.synthesis_available
    }

    /// Initial effects and the first connection attempt.
    pub fn start(&mut self) -> Transition {
        let mut t = Transition::default();
        self.connection_state = ConnectionState::Connecting;
        t.effect(UiEffect::SetConnectionStatus {
            connected: false,
            label: STATUS_CONNECTING.to_string(),
        });
        t.effect(UiEffect::SetInputEnabled(false));
        t.effect(UiEffect::SetSpeakerState(self.tts_enabled));
        t.effect(UiEffect::SetMicState(self.mic_state()));
        t.effect(UiEffect::SetVoiceModeIndicator(false));
        t.command(Command::Connect);
        t
    }

    pub fn handle(&mut self, event: SessionEvent) -> Transition {
        let mut t = Transition::default();
        match event {
            SessionEvent::Transport(event) => self.on_transport(event, &mut t),
            SessionEvent::Recognition(event) => self.on_recognition(event, &mut t),
            SessionEvent::Synthesis(event) => self.on_synthesis(event, &mut t),
            SessionEvent::User(action) => self.on_user(action, &mut t),
            SessionEvent::VoiceIdleTimeout => self.on_voice_idle_timeout(&mut t),
        }
        t
    }

    fn mic_state(&self) -> MicState {
        if !self.recognition_available {
            MicState::Unavailable
        } else if self.is_listening {
            MicState::Active
        } else {
            MicState::Idle
        }
    }

    fn on_transport(&mut self, event: TransportEvent, t: &mut Transition) {
        match event {
            TransportEvent::Opened => {
                if self.connection_state == ConnectionState::Open {
                    tracing::warn!("channel reported open twice, ignoring");
                    return;
                }
                self.connection_state = ConnectionState::Open;
                t.effect(UiEffect::SetConnectionStatus {
                    connected: true,
                    label: STATUS_CONNECTED.to_string(),
                });
                t.effect(UiEffect::SetInputEnabled(true));
                t.system("Connected to DALI");
                if self.is_voice_mode_active() {
                    self.arm_recognition(t);
                }
            }
            TransportEvent::Errored(cause) => {
                tracing::warn!("transport error: {}", cause);
                if self.connection_state != ConnectionState::Closed {
                    self.awaiting_close = true;
                }
                self.disconnect(t);
            }
            TransportEvent::Closed => {
                self.awaiting_close = false;
                self.disconnect(t);
                if self.reconnect_deferred {
                    self.reconnect_deferred = false;
                    self.reconnect(t);
                }
            }
            TransportEvent::MessageReceived(message) => self.on_message(message, t),
        }
    }

    fn disconnect(&mut self, t: &mut Transition) {
        if self.connection_state == ConnectionState::Closed {
            tracing::debug!("channel already closed");
            return;
        }
        self.connection_state = ConnectionState::Closed;
        t.effect(UiEffect::SetConnectionStatus {
            connected: false,
            label: STATUS_DISCONNECTED.to_string(),
        });
        t.effect(UiEffect::SetInputEnabled(false));
        if self.awaiting_reply {
            self.awaiting_reply = false;
            t.effect(UiEffect::HideTypingIndicator);
        }
        if self.is_listening {
            self.stop_recognition(t);
        }
    }

    fn on_message(&mut self, message: InboundMessage, t: &mut Transition) {
        match message {
            InboundMessage::SystemNotice { text, session_id } => {
                if let Some(id) = session_id {
                    tracing::info!("backend session id: {}", id);
                    self.session_id = Some(id);
                }
                t.effect(UiEffect::RenderSystem(text));
            }
            InboundMessage::BotReply {
                text,
                speak,
                language,
            } => self.on_bot_reply(text, speak, language, t),
            InboundMessage::ErrorNotice { text } => {
                self.reply_arrived(t);
                t.error(text);
                self.turn_finished(t);
            }
            InboundMessage::VoiceModeDirective { enabled } => {
                self.set_voice_mode(enabled, VoiceModeSource::Backend, t);
            }
            InboundMessage::Pong => tracing::trace!("pong"),
        }
    }

    fn reply_arrived(&mut self, t: &mut Transition) {
        self.awaiting_reply = false;
        t.effect(UiEffect::HideTypingIndicator);
    }

    fn on_bot_reply(&mut self, text: String, speak: bool, language: Option<String>, t: &mut Transition) {
        self.reply_arrived(t);
        t.effect(UiEffect::RenderBotMessage(text.clone()));

        if let Some(tag) = &language {
            self.last_language_tag = Some(tag.clone());
            t.effect(UiEffect::SetLanguageIndicator {
                tag: tag.clone(),
                glyph: glyph_for(tag),
            });
        }

        if speak && self.tts_enabled && self.synthesis_available {
            self.is_speaking = true;
            t.command(Command::Speak { text, language });
        } else {
            self.turn_finished(t);
        }
    }

    /// Submits user text. Returns `false` when nothing was sent.
    fn submit(&mut self, text: &str, t: &mut Transition) -> bool {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!("ignoring empty submission");
            return false;
        }
        if self.connection_state != ConnectionState::Open {
            tracing::debug!("ignoring submission: channel is {:?}", self.connection_state);
            return false;
        }

        t.effect(UiEffect::RenderUserMessage(text.to_string()));
        t.effect(UiEffect::ClearInput);
        t.effect(UiEffect::ShowTypingIndicator);
        t.command(Command::Send(OutboundMessage::user_text(text)));
        self.awaiting_reply = true;
        self.pending_transcript = None;
        true
    }

    fn on_recognition(&mut self, event: RecognitionEvent, t: &mut Transition) {
        match event {
            RecognitionEvent::Started => {
                if self.is_listening {
                    tracing::warn!("recognition started while already listening, ignoring");
                    return;
                }
                self.is_listening = true;
                t.effect(UiEffect::SetMicState(MicState::Active));
                t.system("Listening...");
            }
            RecognitionEvent::FinalTranscript { text } => {
                tracing::info!("transcript: {:?}", text);
                if !self.submit(&text, t) && !text.trim().is_empty() {
                    tracing::info!("holding transcript until the channel is open");
                    self.pending_transcript = Some(text.trim().to_string());
                }
            }
            RecognitionEvent::Error { code } => {
                self.on_recognition_error(code, t);
                self.end_listening(t);
            }
            RecognitionEvent::Ended => {
                if !self.is_listening {
                    tracing::debug!("recognition ended while not listening");
                    return;
                }
                self.end_listening(t);
            }
        }
    }

    fn on_recognition_error(&mut self, code: RecognitionErrorCode, t: &mut Transition) {
        if code == RecognitionErrorCode::Aborted {
            tracing::debug!("recognition aborted");
            return;
        }
        if !code.is_capability_error() {
            tracing::warn!("recognition error: {}", code);
            t.error(format!("Speech recognition error: {code}"));
            return;
        }
        if !self.recognition_available {
            tracing::debug!("recognition already unavailable: {}", code);
            return;
        }

        tracing::warn!("speech recognition unavailable: {}", code);
        self.recognition_available = false;
        t.error(format!("Speech recognition unavailable: {code}"));
        if self.is_voice_mode_active() {
            self.voice_mode = VoiceMode::Idle;
            t.effect(UiEffect::SetVoiceModeIndicator(false));
            t.system("Voice mode off");
        }
    }

    fn end_listening(&mut self, t: &mut Transition) {
        self.is_listening = false;
        self.stop_requested = false;
        t.effect(UiEffect::SetMicState(self.mic_state()));

        if std::mem::take(&mut self.rearm_pending)
            && self.is_voice_mode_active()
            && self.connection_state == ConnectionState::Open
        {
            self.arm_recognition(t);
        }
    }

    fn stop_recognition(&mut self, t: &mut Transition) {
        if self.is_listening {
            self.stop_requested = true;
        }
        t.command(Command::StopRecognition);
    }

    fn on_synthesis(&mut self, event: SynthesisEvent, t: &mut Transition) {
        self.is_speaking = false;
        match event {
            SynthesisEvent::Finished => {}
            SynthesisEvent::Failed { reason } => {
                tracing::warn!("speech output failed: {}", reason);
                t.error(format!("Speech output error: {reason}"));
            }
            SynthesisEvent::Unsupported => {
                if self.synthesis_available {
                    tracing::warn!("speech output unavailable");
                    self.synthesis_available = false;
                    t.error("Speech output is not available on this device".to_string());
                    t.effect(UiEffect::SetSpeakerState(false));
                }
            }
        }
        self.turn_finished(t);
    }

    /// Re-arms recognition once a bot turn is over.
    fn turn_finished(&mut self, t: &mut Transition) {
        if self.is_voice_mode_active() && self.connection_state == ConnectionState::Open {
            self.arm_recognition(t);
        }
    }

    fn arm_recognition(&mut self, t: &mut Transition) {
        if !self.recognition_available {
            return;
        }
        if !self.is_listening {
            t.command(Command::StartRecognition);
        } else if self.stop_requested {
            self.rearm_pending = true;
        }
    }

    fn set_voice_mode(&mut self, enabled: bool, source: VoiceModeSource, t: &mut Transition) {
        tracing::info!("voice mode {} ({:?})", if enabled { "on" } else { "off" }, source);

        if enabled {
            if !self.recognition_available {
                if source == VoiceModeSource::User {
                    t.system("Voice mode is unavailable");
                }
                return;
            }
            self.voice_mode_source = Some(source);
            if self.voice_mode == VoiceMode::Idle {
                self.voice_mode = VoiceMode::Active;
                t.effect(UiEffect::SetVoiceModeIndicator(true));
                t.system("Voice mode on");
            }
            self.arm_recognition(t);
        } else {
            self.voice_mode_source = Some(source);
            if self.voice_mode == VoiceMode::Active {
                self.voice_mode = VoiceMode::Idle;
                t.effect(UiEffect::SetVoiceModeIndicator(false));
                t.system("Voice mode off");
                self.rearm_pending = false;
                self.stop_recognition(t);
            }
        }
    }

    fn on_user(&mut self, action: UserAction, t: &mut Transition) {
        match action {
            UserAction::SubmitText(text) => {
                self.submit(&text, t);
            }
            UserAction::ToggleVoiceMode => {
                let enabled = self.voice_mode == VoiceMode::Idle;
                self.set_voice_mode(enabled, VoiceModeSource::User, t);
            }
            UserAction::ToggleTts => self.toggle_tts(t),
            UserAction::Reconnect => {
                if self.connection_state != ConnectionState::Closed {
                    tracing::debug!("ignoring reconnect: channel is {:?}", self.connection_state);
                    return;
                }
                if self.awaiting_close {
                    tracing::debug!("deferring reconnect until the failed attempt closes");
                    self.reconnect_deferred = true;
                    return;
                }
                self.reconnect(t);
            }
            UserAction::Quit => {
                self.rearm_pending = false;
                if self.is_listening {
                    self.stop_recognition(t);
                }
                if self.is_speaking {
                    self.is_speaking = false;
                    t.command(Command::CancelSpeech);
                }
                t.effect(UiEffect::SetInputEnabled(false));
                t.command(Command::Close);
            }
        }
    }

    fn toggle_tts(&mut self, t: &mut Transition) {
        self.tts_enabled = !self.tts_enabled;
        t.effect(UiEffect::SetSpeakerState(self.tts_enabled));
        t.system(if self.tts_enabled {
            "Voice output on"
        } else {
            "Voice output off"
        });

        if !self.tts_enabled && self.is_speaking {
            self.is_speaking = false;
            t.command(Command::CancelSpeech);
            self.turn_finished(t);
        }
        if self.connection_state == ConnectionState::Open {
            t.command(Command::Send(OutboundMessage::toggle_tts(self.tts_enabled)));
        }
    }

    fn on_voice_idle_timeout(&mut self, t: &mut Transition) {
        if !self.is_voice_mode_active() {
            return;
        }
        tracing::info!("voice mode idle, switching off");
        self.voice_mode = VoiceMode::Idle;
        t.effect(UiEffect::SetVoiceModeIndicator(false));
        t.system("Voice mode timed out");
        self.rearm_pending = false;
        self.stop_recognition(t);
    }

    fn reconnect(&mut self, t: &mut Transition) {
        self.connection_state = ConnectionState::Connecting;
        t.effect(UiEffect::SetConnectionStatus {
            connected: false,
            label: STATUS_CONNECTING.to_string(),
        });
        t.command(Command::Connect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::decode_frame;

    fn open_session() -> Session {
        let mut session = Session::new();
        session.start();
        session.handle(TransportEvent::Opened.into());
        session
    }

    fn inbound(json: &str) -> Vec<SessionEvent> {
        decode_frame(json)
            .unwrap()
            .into_iter()
            .map(|m| TransportEvent::MessageReceived(m).into())
            .collect()
    }

    fn feed(session: &mut Session, events: Vec<SessionEvent>) -> Transition {
        let mut all = Transition::default();
        for event in events {
            let t = session.handle(event);
            all.effects.extend(t.effects);
            all.commands.extend(t.commands);
        }
        all
    }

    fn count_commands(t: &Transition, command: &Command) -> usize {
        t.commands.iter().filter(|c| *c == command).count()
    }

    #[test]
    fn test_start_connects() {
        let mut session = Session::new();
        let t = session.start();

        assert_eq!(session.connection_state(), ConnectionState::Connecting);
        assert_eq!(t.commands, vec![Command::Connect]);
        assert!(t.effects.contains(&UiEffect::SetInputEnabled(false)));
    }

    #[test]
    fn test_opened_enables_input() {
        let mut session = Session::new();
        session.start();
        let t = session.handle(TransportEvent::Opened.into());

        assert_eq!(session.connection_state(), ConnectionState::Open);
        assert!(t.effects.contains(&UiEffect::SetInputEnabled(true)));
        assert!(t.effects.contains(&UiEffect::SetConnectionStatus {
            connected: true,
            label: STATUS_CONNECTED.to_string()
        }));
    }

    #[test]
    fn test_submit_while_open() {
        let mut session = open_session();
        let t = session.handle(UserAction::SubmitText("  hello ".to_string()).into());

        let bubbles: Vec<_> = t
            .effects
            .iter()
            .filter(|e| matches!(e, UiEffect::RenderUserMessage(_)))
            .collect();
        assert_eq!(bubbles, vec![&UiEffect::RenderUserMessage("hello".to_string())]);
        assert!(t.effects.contains(&UiEffect::ShowTypingIndicator));
        assert!(t.effects.contains(&UiEffect::ClearInput));
        assert_eq!(
            t.sent_messages().collect::<Vec<_>>(),
            vec![&OutboundMessage::user_text("hello")]
        );
        assert_eq!(session.voice_mode(), VoiceMode::Idle);
        assert!(session.awaiting_reply());
    }

    #[test]
    fn test_submit_ignores_blank_and_closed() {
        let mut session = open_session();
        assert!(session.handle(UserAction::SubmitText("   ".to_string()).into()).is_empty());

        session.handle(TransportEvent::Closed.into());
        let t = session.handle(UserAction::SubmitText("hello".to_string()).into());
        assert!(t.is_empty());
    }

    #[test]
    fn test_spoken_reply() {
        let mut session = open_session();
        session.handle(UserAction::SubmitText("hello".to_string()).into());

        let t = feed(&mut session, inbound(r#"{"text":"hi there","speak":true}"#));

        assert!(t.effects.contains(&UiEffect::RenderBotMessage("hi there".to_string())));
        assert!(t.effects.contains(&UiEffect::HideTypingIndicator));
        let speaks: Vec<_> = t
            .commands
            .iter()
            .filter(|c| matches!(c, Command::Speak { .. }))
            .collect();
        assert_eq!(
            speaks,
            vec![&Command::Speak {
                text: "hi there".to_string(),
                language: None
            }]
        );
        assert!(!session.awaiting_reply());
        assert!(session.is_speaking());
    }

    #[test]
    fn test_reply_not_spoken_when_tts_off() {
        let mut session = Session::new().with_tts_enabled(false);
        session.start();
        session.handle(TransportEvent::Opened.into());

        let t = feed(&mut session, inbound(r#"{"text":"hi there","speak":true}"#));
        assert!(!t.commands.iter().any(|c| matches!(c, Command::Speak { .. })));
    }

    #[test]
    fn test_reply_language_updates_indicator() {
        let mut session = open_session();
        let t = feed(
            &mut session,
            inbound(r#"{"text":"namaste","language":"hindi"}"#),
        );

        assert!(t.effects.contains(&UiEffect::SetLanguageIndicator {
            tag: "hindi".to_string(),
            glyph: language::HINDI_GLYPH
        }));
        assert_eq!(session.last_language_tag(), Some("hindi"));

        let t = feed(&mut session, inbound(r#"{"text":"bonjour","language":"fr"}"#));
        assert!(t.effects.contains(&UiEffect::SetLanguageIndicator {
            tag: "fr".to_string(),
            glyph: language::DEFAULT_GLYPH
        }));
    }

    #[test]
    fn test_voice_mode_directive_starts_recognition() {
        let mut session = open_session();
        // local toggles before the directive do not matter
        session.handle(UserAction::ToggleVoiceMode.into());
        session.handle(UserAction::ToggleVoiceMode.into());

        let t = feed(&mut session, inbound(r#"{"event":"voice_mode","enabled":true}"#));

        assert_eq!(count_commands(&t, &Command::StartRecognition), 1);
        assert!(t.effects.contains(&UiEffect::SetVoiceModeIndicator(true)));
        assert_eq!(session.voice_mode(), VoiceMode::Active);
        assert_eq!(session.voice_mode_source(), Some(VoiceModeSource::Backend));

        let t = session.handle(RecognitionEvent::Started.into());
        assert!(t.effects.contains(&UiEffect::SetMicState(MicState::Active)));
        assert!(session.is_listening());
    }

    #[test]
    fn test_directive_overrides_local_toggle() {
        let mut session = open_session();
        session.handle(UserAction::ToggleVoiceMode.into());
        assert_eq!(session.voice_mode(), VoiceMode::Active);

        let t = feed(&mut session, inbound(r#"{"event":"voice_mode","enabled":false}"#));
        assert_eq!(session.voice_mode(), VoiceMode::Idle);
        assert!(t.has_command(&Command::StopRecognition));

        // a later local toggle wins again
        session.handle(UserAction::ToggleVoiceMode.into());
        assert_eq!(session.voice_mode(), VoiceMode::Active);
        assert_eq!(session.voice_mode_source(), Some(VoiceModeSource::User));
    }

    #[test]
    fn test_closed_while_listening() {
        let mut session = open_session();
        session.handle(UserAction::ToggleVoiceMode.into());
        session.handle(RecognitionEvent::Started.into());

        let t = session.handle(TransportEvent::Closed.into());

        assert!(t.has_command(&Command::StopRecognition));
        assert!(t.effects.contains(&UiEffect::SetInputEnabled(false)));
        assert_eq!(session.connection_state(), ConnectionState::Closed);

        assert!(session.handle(TransportEvent::Closed.into()).is_empty());
        assert!(
            session
                .handle(TransportEvent::Errored("reset".to_string()).into())
                .is_empty()
        );
    }

    #[test]
    fn test_disconnect_hides_typing_indicator() {
        let mut session = open_session();
        session.handle(UserAction::SubmitText("hello".to_string()).into());

        let t = session.handle(TransportEvent::Errored("connection reset".to_string()).into());
        assert!(t.effects.contains(&UiEffect::HideTypingIndicator));
        assert!(!session.awaiting_reply());
    }

    #[test]
    fn test_malformed_frame_changes_nothing() {
        // the channel drops frames that fail to decode, so the session sees nothing
        assert!(decode_frame(r#"{"text": 123}"#).is_err());

        let mut session = open_session();
        let before = session.clone();
        let t = feed(&mut session, decode_frame(r#"{"text": 123}"#).map(|_| vec![]).unwrap_or_default());
        assert!(t.is_empty());
        assert_eq!(session, before);
    }

    #[test]
    fn test_transcript_is_submitted() {
        let mut session = open_session();
        session.handle(UserAction::ToggleVoiceMode.into());
        session.handle(RecognitionEvent::Started.into());

        let t = session.handle(
            RecognitionEvent::FinalTranscript {
                text: "what time is it".to_string(),
            }
            .into(),
        );
        assert_eq!(
            t.sent_messages().collect::<Vec<_>>(),
            vec![&OutboundMessage::user_text("what time is it")]
        );

        let t = session.handle(RecognitionEvent::Ended.into());
        assert_eq!(t.effects, vec![UiEffect::SetMicState(MicState::Idle)]);
        assert!(!session.is_listening());
    }

    #[test]
    fn test_transcript_held_while_closed() {
        let mut session = Session::new();
        session.start();
        session.handle(RecognitionEvent::Started.into());

        let t = session.handle(
            RecognitionEvent::FinalTranscript {
                text: "hello".to_string(),
            }
            .into(),
        );
        assert_eq!(t.sent_messages().count(), 0);
        assert_eq!(session.pending_transcript(), Some("hello"));

        session.handle(TransportEvent::Opened.into());
        session.handle(UserAction::SubmitText("typed instead".to_string()).into());
        assert_eq!(session.pending_transcript(), None);
    }

    #[test]
    fn test_aborted_is_not_rendered() {
        let mut session = open_session();
        session.handle(RecognitionEvent::Started.into());

        let t = session.handle(
            RecognitionEvent::Error {
                code: RecognitionErrorCode::Aborted,
            }
            .into(),
        );
        assert_eq!(t.effects, vec![UiEffect::SetMicState(MicState::Idle)]);
        assert!(session.handle(RecognitionEvent::Ended.into()).is_empty());
    }

    #[test]
    fn test_no_speech_is_rendered() {
        let mut session = open_session();
        session.handle(RecognitionEvent::Started.into());

        let t = session.handle(
            RecognitionEvent::Error {
                code: RecognitionErrorCode::NoSpeech,
            }
            .into(),
        );
        assert!(
            t.effects
                .iter()
                .any(|e| matches!(e, UiEffect::RenderError(text) if text.contains("no-speech")))
        );
        assert!(!session.is_listening());
    }

    #[test]
    fn test_unsupported_recognition_disables_voice_mode() {
        let mut session = open_session();
        let t = session.handle(UserAction::ToggleVoiceMode.into());
        assert!(t.has_command(&Command::StartRecognition));

        let t = session.handle(
            RecognitionEvent::Error {
                code: RecognitionErrorCode::Unsupported,
            }
            .into(),
        );
        assert!(!session.recognition_available());
        assert_eq!(session.voice_mode(), VoiceMode::Idle);
        assert!(t.effects.contains(&UiEffect::SetMicState(MicState::Unavailable)));
        assert_eq!(
            t.effects
                .iter()
                .filter(|e| matches!(e, UiEffect::RenderError(_)))
                .count(),
            1
        );

        // surfaced once, and later starts are suppressed
        let t = session.handle(UserAction::ToggleVoiceMode.into());
        assert!(!t.has_command(&Command::StartRecognition));
        assert_eq!(session.voice_mode(), VoiceMode::Idle);
        let t = feed(&mut session, inbound(r#"{"event":"voice_mode","enabled":true}"#));
        assert!(t.is_empty());
    }

    #[test]
    fn test_voice_mode_rearms_after_bot_turn() {
        let mut session = open_session();
        session.handle(UserAction::ToggleVoiceMode.into());
        session.handle(RecognitionEvent::Started.into());
        session.handle(
            RecognitionEvent::FinalTranscript {
                text: "tell me a joke".to_string(),
            }
            .into(),
        );
        session.handle(RecognitionEvent::Ended.into());

        let t = feed(&mut session, inbound(r#"{"text":"knock knock","speak":true}"#));
        assert!(!t.has_command(&Command::StartRecognition));

        let t = session.handle(SynthesisEvent::Finished.into());
        assert_eq!(t.commands, vec![Command::StartRecognition]);
        assert!(!session.is_speaking());

        // an unspoken reply re-arms immediately
        session.handle(RecognitionEvent::Started.into());
        session.handle(RecognitionEvent::Ended.into());
        let t = feed(&mut session, inbound(r#"{"text":"quiet reply"}"#));
        assert!(t.has_command(&Command::StartRecognition));
    }

    #[test]
    fn test_synthesis_unsupported_surfaced_once() {
        let mut session = open_session();
        feed(&mut session, inbound(r#"{"text":"one","speak":true}"#));

        let t = session.handle(SynthesisEvent::Unsupported.into());
        assert!(!session.synthesis_available());
        assert!(t.effects.contains(&UiEffect::SetSpeakerState(false)));

        let t = feed(&mut session, inbound(r#"{"text":"two","speak":true}"#));
        assert!(!t.commands.iter().any(|c| matches!(c, Command::Speak { .. })));
        assert!(session.handle(SynthesisEvent::Unsupported.into()).is_empty());
    }

    #[test]
    fn test_toggle_tts() {
        let mut session = open_session();
        feed(&mut session, inbound(r#"{"text":"long answer","speak":true}"#));

        let t = session.handle(UserAction::ToggleTts.into());
        assert!(!session.tts_enabled());
        assert!(t.effects.contains(&UiEffect::SetSpeakerState(false)));
        assert!(t.has_command(&Command::CancelSpeech));
        assert!(t.has_command(&Command::Send(OutboundMessage::toggle_tts(false))));

        session.handle(TransportEvent::Closed.into());
        let t = session.handle(UserAction::ToggleTts.into());
        assert!(session.tts_enabled());
        assert_eq!(t.sent_messages().count(), 0);
    }

    #[test]
    fn test_system_notice_records_session_id() {
        let mut session = open_session();
        let t = feed(
            &mut session,
            inbound(r#"{"type":"system","message":"Welcome","session_id":"abc-123"}"#),
        );
        assert_eq!(t.effects, vec![UiEffect::RenderSystem("Welcome".to_string())]);
        assert_eq!(session.session_id(), Some("abc-123"));
    }

    #[test]
    fn test_error_notice_hides_typing() {
        let mut session = open_session();
        session.handle(UserAction::SubmitText("hello".to_string()).into());

        let t = feed(&mut session, inbound(r#"{"type":"error","message":"backend busy"}"#));
        assert_eq!(
            t.effects,
            vec![
                UiEffect::HideTypingIndicator,
                UiEffect::RenderError("backend busy".to_string())
            ]
        );
    }

    #[test]
    fn test_reconnect_only_when_closed() {
        let mut session = open_session();
        assert!(session.handle(UserAction::Reconnect.into()).is_empty());

        session.handle(TransportEvent::Closed.into());
        let t = session.handle(UserAction::Reconnect.into());
        assert_eq!(t.commands, vec![Command::Connect]);
        assert_eq!(session.connection_state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_reconnect_waits_for_failed_attempt_to_close() {
        let mut session = open_session();
        session.handle(TransportEvent::Errored("connection reset".to_string()).into());
        assert_eq!(session.connection_state(), ConnectionState::Closed);

        let t = session.handle(UserAction::Reconnect.into());
        assert!(t.is_empty());

        let t = session.handle(TransportEvent::Closed.into());
        assert_eq!(t.commands, vec![Command::Connect]);
        assert_eq!(session.connection_state(), ConnectionState::Connecting);
        assert!(t.effects.contains(&UiEffect::SetConnectionStatus {
            connected: false,
            label: STATUS_CONNECTING.to_string()
        }));

        let t = session.handle(TransportEvent::Opened.into());
        assert!(t.effects.contains(&UiEffect::SetInputEnabled(true)));
        assert_eq!(session.connection_state(), ConnectionState::Open);
    }

    #[test]
    fn test_voice_mode_rearms_after_stopped_session_ends() {
        let mut session = open_session();
        session.handle(UserAction::ToggleVoiceMode.into());
        session.handle(RecognitionEvent::Started.into());
        let t = session.handle(UserAction::ToggleVoiceMode.into());
        assert!(t.has_command(&Command::StopRecognition));

        // switched back on before the stopped session has ended
        let t = feed(&mut session, inbound(r#"{"event":"voice_mode","enabled":true}"#));
        assert!(!t.has_command(&Command::StartRecognition));
        assert_eq!(session.voice_mode(), VoiceMode::Active);

        let t = feed(
            &mut session,
            vec![
                RecognitionEvent::Error {
                    code: RecognitionErrorCode::Aborted,
                }
                .into(),
                RecognitionEvent::Ended.into(),
            ],
        );
        assert_eq!(count_commands(&t, &Command::StartRecognition), 1);
        assert_eq!(session.voice_mode(), VoiceMode::Active);

        let t = session.handle(RecognitionEvent::Started.into());
        assert!(t.effects.contains(&UiEffect::SetMicState(MicState::Active)));
    }

    #[test]
    fn test_opened_rearms_voice_mode() {
        let mut session = open_session();
        session.handle(UserAction::ToggleVoiceMode.into());
        session.handle(TransportEvent::Closed.into());
        session.handle(UserAction::Reconnect.into());

        let t = session.handle(TransportEvent::Opened.into());
        assert!(t.has_command(&Command::StartRecognition));
    }

    #[test]
    fn test_voice_idle_timeout() {
        let mut session = open_session();
        assert!(session.handle(SessionEvent::VoiceIdleTimeout).is_empty());

        session.handle(UserAction::ToggleVoiceMode.into());
        let t = session.handle(SessionEvent::VoiceIdleTimeout);
        assert_eq!(session.voice_mode(), VoiceMode::Idle);
        assert!(t.has_command(&Command::StopRecognition));
    }

    #[test]
    fn test_quit_stops_everything() {
        let mut session = open_session();
        session.handle(RecognitionEvent::Started.into());
        feed(&mut session, inbound(r#"{"text":"bye","speak":true}"#));

        let t = session.handle(UserAction::Quit.into());
        assert_eq!(
            t.commands,
            vec![Command::StopRecognition, Command::CancelSpeech, Command::Close]
        );
    }

    #[test]
    fn test_toggle_voice_mode_twice_is_idempotent() {
        for active in [false, true] {
            let mut session = open_session();
            session.handle(UserAction::ToggleVoiceMode.into());
            if !active {
                session.handle(UserAction::ToggleVoiceMode.into());
            }
            let before = session.clone();

            let first = session.handle(UserAction::ToggleVoiceMode.into());
            let second = session.handle(UserAction::ToggleVoiceMode.into());

            assert_eq!(session, before);
            let mut indicators: Vec<_> = first
                .effects
                .iter()
                .chain(&second.effects)
                .filter_map(|e| match e {
                    UiEffect::SetVoiceModeIndicator(on) => Some(*on),
                    _ => None,
                })
                .collect();
            indicators.sort();
            assert_eq!(indicators, vec![false, true]);
        }
    }

    fn alphabet() -> Vec<SessionEvent> {
        vec![
            TransportEvent::Opened.into(),
            TransportEvent::Closed.into(),
            TransportEvent::Errored("boom".to_string()).into(),
            UserAction::SubmitText("hello".to_string()).into(),
            UserAction::Reconnect.into(),
            UserAction::ToggleVoiceMode.into(),
            RecognitionEvent::Started.into(),
            RecognitionEvent::FinalTranscript {
                text: "spoken".to_string(),
            }
            .into(),
            RecognitionEvent::Error {
                code: RecognitionErrorCode::NoSpeech,
            }
            .into(),
            RecognitionEvent::Error {
                code: RecognitionErrorCode::Aborted,
            }
            .into(),
            RecognitionEvent::Ended.into(),
        ]
    }

    fn for_each_sequence(len: usize, mut check: impl FnMut(&[SessionEvent])) {
        let alphabet = alphabet();
        let n = alphabet.len();
        let total = n.pow(len as u32);
        for mut index in 0..total {
            let mut sequence = Vec::with_capacity(len);
            for _ in 0..len {
                sequence.push(alphabet[index % n].clone());
                index /= n;
            }
            check(&sequence);
        }
    }

    #[test]
    fn test_user_text_only_sent_while_open() {
        for_each_sequence(5, |sequence| {
            let mut session = Session::new();
            session.start();
            for event in sequence {
                let was_open = session.connection_state() == ConnectionState::Open;
                let t = session.handle(event.clone());
                let sent_text = t
                    .sent_messages()
                    .any(|m| matches!(m, OutboundMessage::UserText { .. }));
                if sent_text {
                    assert!(was_open, "text sent while not open: {sequence:?}");
                    assert_eq!(session.connection_state(), ConnectionState::Open);
                }
            }
        });
    }

    #[test]
    fn test_listening_tracks_started_and_ended() {
        for_each_sequence(5, |sequence| {
            let mut session = open_session();
            let mut listening = false;
            for event in sequence {
                session.handle(event.clone());
                match event {
                    SessionEvent::Recognition(RecognitionEvent::Started) => listening = true,
                    SessionEvent::Recognition(
                        RecognitionEvent::Ended | RecognitionEvent::Error { .. },
                    ) => listening = false,
                    _ => {}
                }
                assert_eq!(session.is_listening(), listening, "{sequence:?}");
            }
        });
    }
}
