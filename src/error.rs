use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistError {
    #[error("missing required input: {0}")]
    MissingInput(&'static str),

    #[error("adjustment not found: {0}")]
    UnknownAdjustment(String),

    #[error("invalid date (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),

    #[error("catalog could not be loaded: {0}")]
    CatalogLoad(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl AssistError {
    /// Stable error code reported over IPC.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingInput(_) => "missing_input",
            Self::UnknownAdjustment(_) => "not_found",
            Self::InvalidDate(_) => "bad_params",
            Self::CatalogLoad(_) => "catalog_invalid",
            Self::StorageUnavailable(_) => "storage_unavailable",
        }
    }
}

impl From<rusqlite::Error> for AssistError {
    fn from(e: rusqlite::Error) -> Self {
        Self::StorageUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AssistError>;
