use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Schema error: expected a column `{column}`")]
    MissingColumn { column: String },

    #[error("Schema error: column `{column}` has no value for unit {unit_id}")]
    MissingValue { column: String, unit_id: String },

    #[error("Run '{run_id}' has no '{stage}' table")]
    RunNotFound { run_id: String, stage: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SimError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn { column: column.into() }
    }

    /// True for errors caused by a table lacking a required column or value.
    pub fn is_schema_error(&self) -> bool {
        matches!(self, Self::MissingColumn { .. } | Self::MissingValue { .. })
    }
}

pub type SimResult<T> = Result<T, SimError>;
