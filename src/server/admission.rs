// Admission control - bounds the number of connections handled at once

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Hands out connection slots. A slot is held by a worker for the whole life of
/// its connection and given back when the permit is dropped.
#[derive(Debug, Clone)]
pub struct Admission {
    slots: Arc<Semaphore>,
    max_connections: usize,
    slot_wait: Duration,
}

/// One unit of the admission ceiling
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: OwnedSemaphorePermit,
}

impl Admission {
    pub fn new(max_connections: usize, slot_wait: Duration) -> Self {
        Admission {
            slots: Arc::new(Semaphore::new(max_connections)),
            max_connections,
            slot_wait,
        }
    }

    /// Take a slot, waiting up to the slot wait for one to free up.
    /// Returns `None` when the server is still full after the wait.
    pub async fn admit(&self) -> Option<ConnectionPermit> {
        if let Ok(permit) = self.slots.clone().try_acquire_owned() {
            return Some(ConnectionPermit { _permit: permit });
        }

        tracing::warn!(
            "Max connections {} reached. Waiting up to {}ms for a connection to complete",
            self.max_connections,
            self.slot_wait.as_millis()
        );

        match tokio::time::timeout(self.slot_wait, self.slots.clone().acquire_owned()).await {
            Ok(Ok(permit)) => {
                tracing::info!("Connection slot free, continuing to process request");
                Some(ConnectionPermit { _permit: permit })
            }
            _ => None,
        }
    }

    /// Connections currently holding a slot
    pub fn active(&self) -> usize {
        self.max_connections - self.slots.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_admit_up_to_max() {
        let admission = Admission::new(2, Duration::from_millis(20));

        let first = admission.admit().await;
        let second = admission.admit().await;
        assert!(first.is_some());
        assert!(second.is_some());
        assert_eq!(admission.active(), 2);

        assert!(admission.admit().await.is_none());
        assert_eq!(admission.active(), 2);
    }

    #[tokio::test]
    async fn test_dropped_permit_frees_slot() {
        let admission = Admission::new(1, Duration::from_millis(20));

        let permit = admission.admit().await;
        assert_eq!(admission.active(), 1);
        drop(permit);
        assert_eq!(admission.active(), 0);
        assert!(admission.admit().await.is_some());
    }

    #[tokio::test]
    async fn test_waits_for_slot_within_bound() {
        let admission = Admission::new(1, Duration::from_secs(2));
        let permit = admission.admit().await;

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            drop(permit);
        });

        assert!(admission.admit().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejects_after_wait_bound() {
        let admission = Admission::new(1, Duration::from_millis(1980));
        let _held = admission.admit().await;

        let started = tokio::time::Instant::now();
        assert!(admission.admit().await.is_none());
        assert!(started.elapsed() >= Duration::from_millis(1980));
    }
}
