use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} not found in environment variables")]
    MissingApiKey(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("space group unavailable: {0}")]
    SpaceGroupUnavailable(String),

    #[error("normalization failed: {0}")]
    Normalization(String),
}

impl Error {
    /// True for failures raised before any remote call was attempted.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::MissingApiKey(_) | Error::InvalidConfig(_))
    }
}
