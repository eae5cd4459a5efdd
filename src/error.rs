use httpclient::{InMemoryError, ProtocolError};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-2xx status.
    #[error("http error: status {status}")]
    Http { status: u16 },

    /// The refresh endpoint answered, but not with a 2xx.
    #[error("refresh rejected with status {status}")]
    RefreshRejected { status: u16 },

    /// There is no session to make the call with.
    #[error("unauthorized")]
    Unauthorized,

    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("token storage: {0}")]
    Storage(#[from] std::io::Error),

    #[error("invalid {key}: {message}")]
    Config { key: &'static str, message: String },
}

impl Error {
    pub(crate) fn transport(e: impl std::fmt::Debug) -> Self {
        Self::Transport(format!("{e:?}"))
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<InMemoryError> for Error {
    fn from(e: InMemoryError) -> Self {
        match e {
            InMemoryError::HttpError(res) => Self::Http {
                status: res.status().as_u16(),
            },
            InMemoryError::Protocol(e) => e.into(),
        }
    }
}
