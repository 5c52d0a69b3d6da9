use crate::session::{Session, UiEffect};

/// Boundary to whatever renders the session.
///
/// Effects arrive in the order the session produced them, together with the
/// state after the transition that produced them.
pub trait UiProjection: Send {
    fn apply(&mut self, session: &Session, effect: &UiEffect);
}
