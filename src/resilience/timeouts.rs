//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap discovery backend calls with a deadline
//! - Cancel the pending call cleanly on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - No retry follows a timeout

use std::future::Future;
use std::time::Duration;

use tokio::time;

use crate::discovery::{BackendError, Operation};

/// Run `fut` with a deadline, mapping expiry to [`BackendError::Timeout`].
pub async fn bounded<T, F>(operation: Operation, after: Duration, fut: F) -> Result<T, BackendError>
where
    F: Future<Output = Result<T, BackendError>>,
{
    match time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout { operation, after }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_through_result() {
        let ok = bounded(Operation::Query, Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_deadline_maps_to_timeout() {
        let result: Result<(), _> = bounded(Operation::Publish, Duration::from_millis(20), async {
            time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        match result {
            Err(BackendError::Timeout { operation, after }) => {
                assert_eq!(operation, Operation::Publish);
                assert_eq!(after, Duration::from_millis(20));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
