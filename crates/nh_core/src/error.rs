use thiserror::Error;

/// Failure to obtain a page from a remote site.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("access forbidden (403)")]
    Forbidden,

    #[error("transient server failure (status {0})")]
    TransientServer(u16),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("fetch transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("fetch cancelled")]
    Cancelled,

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<FetchError> },
}

impl FetchError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout | FetchError::TransientServer(_) | FetchError::Connection(_)
        )
    }

    /// Whether the transport behind the fetcher is gone for the rest of the pass.
    pub fn is_fatal(&self) -> bool {
        match self {
            FetchError::TransportUnavailable(_) => true,
            FetchError::Exhausted { last, .. } => last.is_fatal(),
            _ => false,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl PersistenceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PersistenceError::ConnectionLost(_))
    }
}

/// Why the validator turned a candidate away.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("missing title")]
    MissingTitle,

    #[error("missing content")]
    MissingContent,

    #[error("title too short ({len} < {min} chars)")]
    TitleTooShort { len: usize, min: usize },

    #[error("content too short ({len} < {min} chars)")]
    ContentTooShort { len: usize, min: usize },

    #[error("matches spam pattern `{0}`")]
    Spam(String),

    #[error("no publish date")]
    MissingDate,

    #[error("published {published} is older than cutoff {cutoff}")]
    TooOld { published: String, cutoff: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("No extraction strategy produced an article: {0}")]
    ExtractionMiss(String),

    #[error("Validation rejected: {0}")]
    Validation(#[from] RejectReason),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    /// Conditions that must stop harvesting the current source.
    pub fn is_fatal_for_source(&self) -> bool {
        matches!(self, Error::Fetch(e) if e.is_fatal())
    }

    pub fn is_retryable_persistence(&self) -> bool {
        matches!(self, Error::Persistence(e) if e.is_retryable())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Config(format!("invalid pattern: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
