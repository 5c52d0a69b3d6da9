/// Reasons an inbound frame could not be turned into messages.
///
/// Protocol errors are never shown to the user; the transport logs them and
/// drops the frame.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("`{kind}` frame is missing `{field}`")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
    #[error("unrecognized frame (type={kind:?}, event={event:?})")]
    Unrecognized {
        kind: Option<String>,
        event: Option<String>,
    },
}
