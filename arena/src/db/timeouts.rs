//! Deadlines for persistence and directory calls
//!
//! The engine has no retry logic of its own: an elapsed deadline surfaces as
//! [`ArenaError::Timeout`], which callers treat as retryable data unavailability.

use crate::errors::{ArenaError, ArenaResult};
use std::time::Duration;
use tokio::time::timeout;

/// Default timeout for database queries (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for transactions (10 seconds)
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for player directory lookups (3 seconds)
pub const DEFAULT_DIRECTORY_TIMEOUT: Duration = Duration::from_secs(3);

/// Deadlines applied by the engine and the PostgreSQL repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Single query deadline
    pub query: Duration,
    /// Whole-transaction deadline (round creation, standings replacement)
    pub transaction: Duration,
    /// Player directory lookup deadline
    pub directory: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            query: DEFAULT_QUERY_TIMEOUT,
            transaction: DEFAULT_TRANSACTION_TIMEOUT,
            directory: DEFAULT_DIRECTORY_TIMEOUT,
        }
    }
}

/// Run a fallible future under a deadline
///
/// # Arguments
///
/// * `duration` - Timeout duration
/// * `future` - Async operation to execute
///
/// # Returns
///
/// * `ArenaResult<T>` - Result, inner error converted, or `ArenaError::Timeout`
///
/// # Example
///
/// ```no_run
/// use arena::db::timeouts::{with_timeout, DEFAULT_QUERY_TIMEOUT};
/// # use sqlx::PgPool;
/// # async fn example(pool: &PgPool) -> arena::ArenaResult<()> {
///
/// let row = with_timeout(
///     DEFAULT_QUERY_TIMEOUT,
///     sqlx::query("SELECT 1 FROM ca_tournaments WHERE id = $1")
///         .bind(uuid::Uuid::nil())
///         .fetch_optional(pool)
/// ).await?;
///
/// # Ok(())
/// # }
/// ```
pub async fn with_timeout<F, T, E>(duration: Duration, future: F) -> ArenaResult<T>
where
    F: std::future::Future<Output = Result<T, E>>,
    E: Into<ArenaError>,
{
    match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(ArenaError::Timeout(duration)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timeout_defaults() {
        let config = TimeoutConfig::default();
        assert_eq!(config.query.as_secs(), 5);
        assert_eq!(config.transaction.as_secs(), 10);
        assert_eq!(config.directory.as_secs(), 3);
    }

    #[tokio::test]
    async fn test_elapsed_deadline_is_retryable_timeout() {
        let result: ArenaResult<()> = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, ArenaError>(())
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, ArenaError::Timeout(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let result: ArenaResult<()> = with_timeout(DEFAULT_QUERY_TIMEOUT, async {
            Err::<(), _>(sqlx::Error::RowNotFound)
        })
        .await;

        assert!(matches!(result, Err(ArenaError::Database(_))));
    }
}
