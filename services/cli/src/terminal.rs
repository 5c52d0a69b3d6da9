use dali_voice::UiProjection;
use dali_voice::session::{MicState, Session, UiEffect};
use std::io::Write;

/// Prints the conversation as plain lines.
pub struct TerminalProjection<W> {
    out: W,
    mic: MicState,
}

impl TerminalProjection<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TerminalProjection<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            mic: MicState::Idle,
        }
    }

    fn line(&self, session: &Session, effect: &UiEffect) -> Option<String> {
        match effect {
            UiEffect::RenderUserMessage(text) => Some(format!("you> {text}")),
            UiEffect::RenderBotMessage(text) => {
                let glyph = session
                    .last_language_tag()
                    .map(dali_voice::session::language::glyph_for)
                    .map(|g| format!("{g} "))
                    .unwrap_or_default();
                Some(format!("dali> {glyph}{text}"))
            }
            UiEffect::RenderSystem(text) => Some(format!("* {text}")),
            UiEffect::RenderError(text) => Some(format!("! {text}")),
            UiEffect::SetConnectionStatus { label, .. } => Some(format!("[{label}]")),
            UiEffect::SetMicState(state) if *state != self.mic => Some(match state {
                MicState::Active => "[mic on]".to_string(),
                MicState::Idle => "[mic off]".to_string(),
                MicState::Unavailable => "[mic unavailable]".to_string(),
            }),
            UiEffect::SetSpeakerState(on) => {
                Some(format!("[speaker {}]", if *on { "on" } else { "off" }))
            }
            UiEffect::SetLanguageIndicator { tag, glyph } => Some(format!("[{glyph} {tag}]")),
            UiEffect::ShowTypingIndicator => Some("dali is typing...".to_string()),
            _ => None,
        }
    }
}

impl<W: Write + Send> UiProjection for TerminalProjection<W> {
    fn apply(&mut self, session: &Session, effect: &UiEffect) {
        let line = self.line(session, effect);
        if let UiEffect::SetMicState(state) = effect {
            self.mic = *state;
        }
        let Some(line) = line else {
            return;
        };
        if let Err(e) = writeln!(self.out, "{line}").and_then(|_| self.out.flush()) {
            tracing::warn!("failed to write to terminal: {}", e);
        }
    }
}
