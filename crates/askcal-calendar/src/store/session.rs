//! Single-flight memoized session

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;

/// Lazily established, shared session handle
///
/// The lock is held across the connection attempt, so callers arriving while
/// a handshake is in flight wait for its outcome instead of starting their
/// own. A failed attempt leaves the slot empty.
pub struct SessionSlot<T> {
    inner: Mutex<Option<Arc<T>>>,
}

impl<T> Default for SessionSlot<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }
}

impl<T> SessionSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the current session, connecting first if there is none
    pub async fn get_or_connect<F, Fut, E>(&self, connect: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut guard = self.inner.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(Arc::clone(session));
        }

        let session = Arc::new(connect().await?);
        *guard = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Drop `stale` so the next caller handshakes again
    ///
    /// A no-op when another caller has already replaced it.
    pub async fn invalidate(&self, stale: &Arc<T>) -> bool {
        let mut guard = self.inner.lock().await;
        match guard.as_ref() {
            Some(current) if Arc::ptr_eq(current, stale) => {
                *guard = None;
                true
            }
            _ => false,
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.is_some()
    }
}
