//! Services Layer
//!
//! Business coordinators extracted from HTTP handlers. Each function loads
//! what it needs, hands it to the pure computations in `progress`, and
//! writes the result back. Multi-row writes run inside one transaction.

pub mod achievement_service;
pub mod backup_service;
pub mod community_service;
pub mod contact_service;
pub mod habit_service;
pub mod level_service;
pub mod shop_service;

use std::future::Future;

use crate::domain::DomainError;

/// Run a read, retrying exactly once if the store reported a transient
/// failure. Writes must not go through here.
pub async fn read_with_retry<T, F, Fut>(mut op: F) -> Result<T, DomainError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DomainError>>,
{
    match op().await {
        Err(e) if e.is_transient() => {
            tracing::warn!("Read failed ({}), retrying once", e);
            op().await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_failure_once() {
        let calls = AtomicU32::new(0);
        let result = read_with_retry(|| async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(DomainError::TransientStore("busy".into()))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_second_failure() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = read_with_retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(DomainError::TransientStore("down".into()))
        })
        .await;

        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn does_not_retry_other_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = read_with_retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(DomainError::NotFound)
        })
        .await;

        assert_eq!(result, Err(DomainError::NotFound));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
