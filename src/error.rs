use thiserror::Error;

#[derive(Error, Debug)]
pub enum AttributionError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Pipeline not found for project: {0}")]
    PipelineNotFound(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Visualization provider error: {0}")]
    Provider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AttributionError {
    /// HTTP-style status code the service boundary reports for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AttributionError::Validation(_) | AttributionError::Encoding(_) => 400,
            AttributionError::PipelineNotFound(_) => 404,
            _ => 500,
        }
    }

    /// Message the caller may see verbatim; `None` for internal failures,
    /// which are reported with a generic message.
    pub fn client_message(&self) -> Option<String> {
        match self {
            AttributionError::Validation(message)
            | AttributionError::Encoding(message)
            | AttributionError::Generation(message) => Some(message.clone()),
            AttributionError::PipelineNotFound(project_id) => {
                Some(format!("Pipeline not found for project: {}", project_id))
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AttributionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AttributionError::Validation("x".into()).status_code(), 400);
        assert_eq!(AttributionError::Encoding("x".into()).status_code(), 400);
        assert_eq!(AttributionError::PipelineNotFound("p".into()).status_code(), 404);
        assert_eq!(AttributionError::Generation("g".into()).status_code(), 500);
        assert_eq!(AttributionError::Provider("down".into()).status_code(), 500);
    }

    #[test]
    fn test_internal_errors_have_no_client_message() {
        assert_eq!(AttributionError::Provider("stack".into()).client_message(), None);
        assert_eq!(AttributionError::Config("bad tz".into()).client_message(), None);
        assert_eq!(
            AttributionError::Validation("bad".into()).client_message().as_deref(),
            Some("bad")
        );
    }
}
