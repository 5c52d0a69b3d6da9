pub mod error;

use error::ProtocolError;

pub const KIND_SYSTEM: &str = "system";
pub const KIND_ERROR: &str = "error";
pub const KIND_RESPONSE: &str = "response";
pub const KIND_PONG: &str = "pong";
pub const EVENT_VOICE_MODE: &str = "voice_mode";

/// A raw frame received from the backend.
///
/// Every field is optional and independently interpretable, so a single frame
/// may carry a notice, a reply and a directive at once. Fields of the wrong
/// JSON type fail deserialization for the whole frame.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct InboundFrame {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    speak: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
}

impl InboundFrame {
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn speak(&self) -> Option<bool> {
        self.speak
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn event(&self) -> Option<&str> {
        self.event.as_deref()
    }

    pub fn enabled(&self) -> Option<bool> {
        self.enabled
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn with_kind(mut self, kind: &str) -> Self {
        self.kind = Some(kind.to_string());
        self
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn with_speak(mut self, speak: bool) -> Self {
        self.speak = Some(speak);
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn with_voice_mode(mut self, enabled: bool) -> Self {
        self.event = Some(EVENT_VOICE_MODE.to_string());
        self.enabled = Some(enabled);
        self
    }

    pub fn with_session_id(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }

    /// Interprets the frame's fields, in the order notice, reply, directive.
    pub fn into_messages(self) -> Result<Vec<InboundMessage>, ProtocolError> {
        let mut messages = Vec::new();
        let language = self.language.filter(|l| !l.trim().is_empty());

        match self.kind.as_deref() {
            Some(KIND_SYSTEM) => {
                let text = self.message.clone().ok_or(ProtocolError::MissingField {
                    kind: KIND_SYSTEM,
                    field: "message",
                })?;
                messages.push(InboundMessage::SystemNotice {
                    text,
                    session_id: self.session_id.clone(),
                });
            }
            Some(KIND_ERROR) => {
                let text = self.message.clone().ok_or(ProtocolError::MissingField {
                    kind: KIND_ERROR,
                    field: "message",
                })?;
                messages.push(InboundMessage::ErrorNotice { text });
            }
            Some(KIND_PONG) => messages.push(InboundMessage::Pong),
            // The backend historically sent replies as `{"type":"response","message":..}`.
            Some(KIND_RESPONSE) if self.text.is_none() => {
                let text = self.message.clone().ok_or(ProtocolError::MissingField {
                    kind: KIND_RESPONSE,
                    field: "message",
                })?;
                messages.push(InboundMessage::BotReply {
                    text,
                    speak: self.speak.unwrap_or(false),
                    language: language.clone(),
                });
            }
            _ => {}
        }

        if let Some(text) = self.text {
            messages.push(InboundMessage::BotReply {
                text,
                speak: self.speak.unwrap_or(false),
                language,
            });
        }

        if self.event.as_deref() == Some(EVENT_VOICE_MODE) {
            let enabled = self.enabled.ok_or(ProtocolError::MissingField {
                kind: EVENT_VOICE_MODE,
                field: "enabled",
            })?;
            messages.push(InboundMessage::VoiceModeDirective { enabled });
        }

        if messages.is_empty() {
            return Err(ProtocolError::Unrecognized {
                kind: self.kind,
                event: self.event,
            });
        }
        Ok(messages)
    }
}

/// A validated message from the backend, consumed exactly once by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    SystemNotice {
        text: String,
        session_id: Option<String>,
    },
    BotReply {
        text: String,
        speak: bool,
        language: Option<String>,
    },
    ErrorNotice {
        text: String,
    },
    VoiceModeDirective {
        enabled: bool,
    },
    Pong,
}

/// Parses one text frame into the messages it carries.
pub fn decode_frame(text: &str) -> Result<Vec<InboundMessage>, ProtocolError> {
    let frame: InboundFrame = serde_json::from_str(text)?;
    frame.into_messages()
}
