use thiserror::Error;

#[derive(Error, Debug)]
pub enum PeriscopeError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Scraping error: {0}")]
    Scraping(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Insufficient content gathered from sources to generate a report")]
    InsufficientContent,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl PeriscopeError {
    /// Input errors are the caller's fault and must not mutate any state.
    pub fn is_input_error(&self) -> bool {
        matches!(self, PeriscopeError::Validation(_))
    }
}
