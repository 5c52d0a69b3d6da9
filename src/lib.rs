pub mod client;
pub mod runtime;
pub mod session;
pub mod ui;

pub use dali_voice_speech as speech;
pub use dali_voice_types as types;

pub use client::{Channel, ChannelState, Transport, TransportConfig, TransportEvent};
pub use runtime::Runtime;
pub use session::{Command, Session, SessionEvent, Transition, UiEffect, UserAction};
pub use ui::UiProjection;
