use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Browser session setup failed. Not retried inside the pipeline; the
    /// queue applies its standard retry policy.
    #[error("session init failed: {reason}")]
    Init { reason: String },

    /// Navigation attempts exhausted. `timed_out` distinguishes the hard
    /// timeout from unreachable/HTTP failures for attempt logging.
    #[error("navigation to {url} failed after {attempts} attempts")]
    Navigation {
        url: String,
        attempts: u32,
        timed_out: bool,
    },

    /// Structural failure reading the page. Individual missing fields are
    /// absorbed with defaults and never raise this.
    #[error("extraction failed: {reason}")]
    Extraction { reason: String },

    /// Storage write failure. Logged by the pipeline; never masks a
    /// successful extraction.
    #[error("persistence failed: {0}")]
    Persistence(#[from] koltrack_db::DbError),
}
