use thiserror::Error;

/// Failures of one reporting cycle that reach the scheduler
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The bulk body stream failed while the request was in flight
    #[error("Bulk payload serialization error: {0}")]
    Serialization(#[source] reqwest::Error),
}

impl ReportError {
    pub(crate) fn from_send(err: reqwest::Error) -> Self {
        if err.is_body() {
            Self::Serialization(err)
        } else {
            Self::Transport(err)
        }
    }
}
