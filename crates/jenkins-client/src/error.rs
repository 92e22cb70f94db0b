use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unexpected response status code. status={status}, body={body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("no {0} header in response")]
    MissingHeader(&'static str),

    #[error("invalid {name} header value: {value}")]
    InvalidHeader { name: &'static str, value: String },

    #[error("invalid HTTP Location header value. location={0}")]
    InvalidLocation(String),

    #[error("unable to extract queue item ID. location={0}")]
    QueueItemIdNotFound(String),

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid Jenkins base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ProtocolError {
    /// `true` when the request never produced a response (connect, TLS, reset).
    pub fn is_transport(&self) -> bool {
        matches!(self, ProtocolError::Transport(_))
    }
}
