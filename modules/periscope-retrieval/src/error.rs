use crate::search::UnreachableSource;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// The search capability failed outright or reported `success: false`.
    /// Carries any sources the capability reported as unreachable so the
    /// caller can surface them in the run's failure message.
    #[error("Search failed: {message}")]
    SearchFailed {
        message: String,
        unreachable: Vec<UnreachableSource>,
    },

    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Mail delivery failed: {0}")]
    MailFailed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
