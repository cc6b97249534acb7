use reqwest::StatusCode;

/// Failure modes of the login call, the one fatal path of the pipeline.
///
/// Distinguishes a transport failure from a non-2xx response and from a 2xx
/// response that carries no token, so the caller can decide what to surface.
#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("login request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("login returned {status}")]
    Status { status: StatusCode, body: String },
    #[error("login response carried no token")]
    MissingToken { body: String },
}

impl AuthError {
    /// The raw response body, when a response was received at all.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            AuthError::Network(_) => None,
            AuthError::Status { body, .. } | AuthError::MissingToken { body } => Some(body),
        }
    }
}
