use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViabilityError {
    #[error("Invalid input: {field} — {reason}")]
    Validation { field: String, reason: String },

    #[error("Computation failed in year {year} ({metric}): {reason}")]
    Computation {
        year: u32,
        metric: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ViabilityError {
    fn from(e: serde_json::Error) -> Self {
        ViabilityError::Serialization(e.to_string())
    }
}
