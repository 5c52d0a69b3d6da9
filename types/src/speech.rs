use std::fmt;

/// Why a recognition session ended without a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorCode {
    /// The platform has no recognition capability.
    Unsupported,
    /// Microphone or recognition permission was denied.
    NotAllowed,
    NoSpeech,
    /// The session was stopped by the client.
    Aborted,
    Network,
    Other(String),
}

impl RecognitionErrorCode {
    /// Capability errors disable recognition for the rest of the session.
    pub fn is_capability_error(&self) -> bool {
        matches!(self, Self::Unsupported | Self::NotAllowed)
    }
}

impl fmt::Display for RecognitionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported => f.write_str("unsupported"),
            Self::NotAllowed => f.write_str("not-allowed"),
            Self::NoSpeech => f.write_str("no-speech"),
            Self::Aborted => f.write_str("aborted"),
            Self::Network => f.write_str("network"),
            Self::Other(code) => f.write_str(code),
        }
    }
}

impl From<&str> for RecognitionErrorCode {
    fn from(code: &str) -> Self {
        match code {
            "unsupported" => Self::Unsupported,
            "not-allowed" | "service-not-allowed" => Self::NotAllowed,
            "no-speech" => Self::NoSpeech,
            "aborted" => Self::Aborted,
            "network" => Self::Network,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Normalized events from the speech input adapter.
///
/// A session always reads `Started`, then one of `FinalTranscript` or `Error`,
/// then `Ended`. An unsupported platform yields a lone `Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Started,
    FinalTranscript { text: String },
    Error { code: RecognitionErrorCode },
    Ended,
}

/// Completion events from the speech output adapter.
///
/// Cancelled utterances report nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisEvent {
    Finished,
    Failed { reason: String },
    Unsupported,
}
