use async_trait::async_trait;
use dali_voice_types::RecognitionErrorCode;

/// A platform speech-recognition capability.
///
/// Implementations only have to produce one transcript per call; the
/// [`RecognitionAdapter`](crate::RecognitionAdapter) owns the event contract,
/// cancellation and the at-most-one-session rule.
#[async_trait]
pub trait RecognitionEngine: Send + Sync + 'static {
    fn is_supported(&self) -> bool;

    /// Captures a single utterance and returns its final transcript.
    async fn recognize_once(&self) -> Result<String, RecognitionErrorCode>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    #[error("speech synthesis is not supported")]
    Unsupported,
    #[error("speech synthesis failed: {0}")]
    Failed(String),
}

/// A platform speech-synthesis capability.
///
/// `speak` resolves when the utterance has finished playing. Dropping the
/// future must stop playback.
#[async_trait]
pub trait SynthesisEngine: Send + Sync + 'static {
    fn is_supported(&self) -> bool;

    async fn speak(&self, text: &str, language: Option<&str>) -> Result<(), SynthesisError>;
}

/// Stands in for a platform without speech recognition.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRecognizer;

#[async_trait]
impl RecognitionEngine for NoRecognizer {
    fn is_supported(&self) -> bool {
        false
    }

    async fn recognize_once(&self) -> Result<String, RecognitionErrorCode> {
        Err(RecognitionErrorCode::Unsupported)
    }
}

/// Stands in for a platform without speech synthesis.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSynthesizer;

#[async_trait]
impl SynthesisEngine for NoSynthesizer {
    fn is_supported(&self) -> bool {
        false
    }

    async fn speak(&self, _text: &str, _language: Option<&str>) -> Result<(), SynthesisError> {
        Err(SynthesisError::Unsupported)
    }
}

#[async_trait]
impl RecognitionEngine for Box<dyn RecognitionEngine> {
    fn is_supported(&self) -> bool {
        (**self).is_supported()
    }

    async fn recognize_once(&self) -> Result<String, RecognitionErrorCode> {
        (**self).recognize_once().await
    }
}

#[async_trait]
impl SynthesisEngine for Box<dyn SynthesisEngine> {
    fn is_supported(&self) -> bool {
        (**self).is_supported()
    }

    async fn speak(&self, text: &str, language: Option<&str>) -> Result<(), SynthesisError> {
        (**self).speak(text, language).await
    }
}
