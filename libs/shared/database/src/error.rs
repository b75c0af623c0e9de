use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Unique or exclusion constraint violation (HTTP 409 / SQLSTATE 23505).
    #[error("Constraint conflict: {0}")]
    Conflict(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for DatabaseError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            DatabaseError::Decode(e.to_string())
        } else {
            DatabaseError::Unavailable(e.to_string())
        }
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(e: serde_json::Error) -> Self {
        DatabaseError::Decode(e.to_string())
    }
}
