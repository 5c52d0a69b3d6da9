//! Speech input and output adapters.
//!
//! Each adapter wraps a platform engine and turns its callbacks into the
//! normalized [`RecognitionEvent`] / [`SynthesisEvent`] streams the session
//! consumes. Events are written straight into the caller's queue, so the
//! adapters are generic over any event type that can be built from them.
//!
//! [`RecognitionEvent`]: dali_voice_types::RecognitionEvent
//! [`SynthesisEvent`]: dali_voice_types::SynthesisEvent

pub mod command;
pub mod engine;
pub mod input;
pub mod output;

pub use command::{CommandRecognizer, CommandSynthesizer};
pub use engine::{NoRecognizer, NoSynthesizer, RecognitionEngine, SynthesisEngine, SynthesisError};
pub use input::{RecognitionAdapter, SpeechInput};
pub use output::{SpeechOutput, SynthesisAdapter};
