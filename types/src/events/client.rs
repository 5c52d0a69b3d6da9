/// Frames sent from the client to the dialogue backend.
///
/// Serialized as a JSON object tagged by `type`:
/// `{"type":"text","message":"hello"}`, `{"type":"toggle_tts","enabled":false}`
/// and `{"type":"ping"}`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    /// `text` frame carrying a user utterance.
    #[serde(rename = "text")]
    UserText {
        #[serde(rename = "message")]
        text: String,
    },
    /// `toggle_tts` frame telling the backend whether replies should be spoken.
    #[serde(rename = "toggle_tts")]
    ToggleTts { enabled: bool },
    /// `ping` keep-alive, answered by the backend with `pong`.
    #[serde(rename = "ping")]
    Ping,
}

impl OutboundMessage {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::UserText { text: text.into() }
    }

    pub fn toggle_tts(enabled: bool) -> Self {
        Self::ToggleTts { enabled }
    }

    /// The wire name of this frame's `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UserText { .. } => "text",
            Self::ToggleTts { .. } => "toggle_tts",
            Self::Ping => "ping",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
