use thiserror::Error;

pub type Result<T> = std::result::Result<T, OracleError>;

/// The error taxonomy every component boundary translates into. No lower-layer
/// error type (`sqlx::Error`, `reqwest::Error`, `redis::RedisError`, ...) crosses
/// a component boundary unwrapped — see spec §7's propagation policy.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found")]
    NotFound,

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("job queue unavailable")]
    QueueUnavailable,

    #[error("schedule is disabled")]
    Disabled,

    #[error("worker failed: {0}")]
    WorkerFailure(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl OracleError {
    /// HTTP status code the composition root maps this to.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::NotFound => 404,
            Self::AlreadyExists(_) => 409,
            Self::QueueUnavailable | Self::Disabled => 503,
            Self::WorkerFailure(_) | Self::Internal(_) => 500,
        }
    }
}

/// `TransientUpstream`, `StoreUnavailable`, and `CacheUnavailable` (spec §7) are
/// deliberately *not* variants of [`OracleError`]: they never reach a caller.
/// They are swallowed at the component boundary that produces them (the
/// upstream adapter, the store, the cache) and turned into `Ok(None)` /
/// `Ok(vec![])`, per spec §4.2/§4.3's degraded-mode contract. `degraded` below
/// is the shared logging hook for that swallow.
pub fn degraded(component: &str, detail: impl std::fmt::Display) {
    tracing::warn!(component, %detail, "component unavailable, continuing in degraded mode");
}
