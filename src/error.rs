use crate::schema::EntityKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Invalid month window {0}: must be between 1 and 36")]
    InvalidWindow(u32),

    #[error("Invalid configuration for '{field}': {details}")]
    InvalidConfig { field: String, details: String },

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Report request #{ticket} was superseded by request #{current}")]
    Superseded { ticket: u64, current: u64 },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Failure to load rows for one entity kind. Kept separate from
/// [`AnalyticsError`] so a report section can hold it without failing the
/// whole report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Network error while fetching {entity}: {message}")]
    Network { entity: EntityKind, message: String },

    #[error("Permission denied while fetching {entity}: {message}")]
    Permission { entity: EntityKind, message: String },

    #[error("Could not decode {entity} rows: {message}")]
    Decode { entity: EntityKind, message: String },

    #[error("Backend returned status {status} for {entity}: {message}")]
    Backend {
        entity: EntityKind,
        status: u16,
        message: String,
    },
}

impl FetchError {
    pub fn entity(&self) -> EntityKind {
        match self {
            FetchError::Network { entity, .. }
            | FetchError::Permission { entity, .. }
            | FetchError::Decode { entity, .. }
            | FetchError::Backend { entity, .. } => *entity,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Outcome of a single dashboard section.
pub type SectionResult<T> = std::result::Result<T, FetchError>;
