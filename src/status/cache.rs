//! Process-wide cache of the last attendance snapshot.

use super::AttendanceStatusSnapshot;
use crate::gateway::{with_timeout, GatewayError, VerificationGateway};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Holds the most recent successful [`AttendanceStatusSnapshot`].
///
/// A failed refresh leaves the previous snapshot in place. Refreshes are
/// serialised so at most one status read is in flight.
pub struct AttendanceStatusCache {
    gateway: Arc<dyn VerificationGateway>,
    timeout: Duration,
    current: RwLock<Option<Arc<AttendanceStatusSnapshot>>>,
    refresh_gate: tokio::sync::Mutex<()>,
    refreshes: AtomicU64,
    failures: AtomicU64,
}

impl AttendanceStatusCache {
    /// An empty cache; each refresh is bounded by `timeout`.
    pub fn new(gateway: Arc<dyn VerificationGateway>, timeout: Duration) -> Self {
        Self {
            gateway,
            timeout,
            current: RwLock::new(None),
            refresh_gate: tokio::sync::Mutex::new(()),
            refreshes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Fetches a fresh snapshot and swaps it in.
    pub async fn refresh(&self) -> Result<Arc<AttendanceStatusSnapshot>, GatewayError> {
        let _gate = self.refresh_gate.lock().await;

        match with_timeout(self.timeout, self.gateway.fetch_status()).await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *self
                    .current
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Arc::clone(&snapshot));
                self.refreshes.fetch_add(1, Ordering::Relaxed);

                tracing::debug!(
                    attended = snapshot.attended.len(),
                    not_attended = snapshot.not_attended.len(),
                    "Attendance status refreshed"
                );
                Ok(snapshot)
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "Attendance status refresh failed, keeping previous snapshot");
                Err(e)
            }
        }
    }

    /// Last successful snapshot, if any.
    pub fn snapshot(&self) -> Option<Arc<AttendanceStatusSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Successful refreshes so far.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Failed refreshes so far.
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for AttendanceStatusCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttendanceStatusCache")
            .field("timeout", &self.timeout)
            .field("refreshes", &self.refresh_count())
            .field("failures", &self.failure_count())
            .finish()
    }
}
