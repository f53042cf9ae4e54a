//! Database query timeout helpers
//!
//! Wraps storage futures so a stuck connection surfaces as
//! [`TournamentError::Timeout`] instead of hanging a tournament's writer.

use std::time::Duration;
use tokio::time::timeout;

use crate::tournament::{TournamentError, TournamentResult};

/// Default timeout for database queries (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for transactions (10 seconds)
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Run a sqlx future, mapping driver errors to `Storage` and an elapsed
/// deadline to `Timeout`.
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> TournamentResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(TournamentError::Storage(e)),
        Err(_) => Err(TournamentError::Timeout(duration)),
    }
}

/// Execute a query with default timeout (5 seconds)
pub async fn with_default_timeout<F, T>(future: F) -> TournamentResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}
