use thiserror::Error;

/// Result type alias for relay operations
pub type Result<T, E = RelayError> = std::result::Result<T, E>;

/// Errors that can occur while relaying a request to Stash
#[derive(Error, Debug)]
pub enum RelayError {
    /// The pull request URL does not have the expected shape
    #[error("wrong url")]
    InvalidUrl,

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The inbound path is neither `/{group}` nor `/{group}/{pull-request}`
    #[error("%group%(/%pull-request%)?")]
    BadRequest,

    #[error("invalid stash url: {0}")]
    InvalidBaseUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::UpstreamUnavailable(err.to_string())
    }
}
