use thiserror::Error;

/// Why a call to the console didn't produce what we wanted.
///
/// These never abort a workflow by themselves. The call site logs them and
/// hands back `None` or an outcome enum instead.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("Status Code: {status} - {body}")]
    Status { status: u16, body: String },
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response has no `{0}` field")]
    MissingField(&'static str),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}
