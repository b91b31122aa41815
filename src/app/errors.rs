#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("failed to load feature table: {0}")]
    Load(String),

    #[error("no speaker named {0:?}")]
    NotFound(String),

    #[error("not enough data: {0}")]
    InsufficientData(String),

    #[error("classifier model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Errors caused by the caller's input or by the data on disk, as opposed
    /// to failures of the process itself.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, AppError::IO(_) | AppError::Other(_))
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Load(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
