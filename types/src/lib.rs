pub mod events;
pub mod speech;

pub use events::client::OutboundMessage;
pub use events::server::{InboundFrame, InboundMessage, decode_frame};
pub use events::server::error::ProtocolError;
pub use speech::{RecognitionErrorCode, RecognitionEvent, SynthesisEvent};
