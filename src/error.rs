use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightsError {
    #[error("Missing required input: {field}")]
    MissingInput { field: String },

    #[error("Input '{field}' must be a collection, got {found}")]
    NotACollection { field: String, found: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Text generation failed: {0}")]
    Generation(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl InsightsError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingInput {
            field: field.into(),
        }
    }

    /// True for the input-shape failures a request layer should report as
    /// "unable to compute insights" rather than as an internal fault.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::MissingInput { .. } | Self::NotACollection { .. } | Self::InvalidConfig(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, InsightsError>;
