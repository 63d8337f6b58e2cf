pub mod config;
pub mod error;
pub mod retry;
pub mod storage;
pub mod types;

pub use error::{Error, FetchError, PersistenceError, RejectReason, Result};
pub use types::{Article, Candidate, FetchMode, SaveOutcome, ScrapeStatus, SourceDescriptor, SourceStats, Stats};

pub use tokio_util::sync::CancellationToken;
