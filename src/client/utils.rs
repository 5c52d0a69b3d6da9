use crate::client::config::TransportConfig;
use crate::client::consts::USER_AGENT_HEADER;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("endpoint must be a ws:// or wss:// url, got `{0}`")]
    InvalidScheme(String),
    #[error("invalid websocket request: {0}")]
    Request(#[from] tungstenite::Error),
    #[error("invalid header value: {0}")]
    Header(#[from] tungstenite::http::header::InvalidHeaderValue),
}

pub fn build_request(config: &TransportConfig) -> Result<Request, TransportError> {
    let url = config.url();
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        return Err(TransportError::InvalidScheme(url.to_string()));
    }

    let mut request = url.into_client_request()?;
    request.headers_mut().insert(
        USER_AGENT_HEADER,
        format!("dali-voice/{}", env!("CARGO_PKG_VERSION")).parse()?,
    );
    Ok(request)
}
