//! One outstanding request per logical operation kind.
//!
//! Starting a new request through a [`RequestSlot`] retires the previous one:
//! its token is cancelled and its generation no longer matches, so whatever it
//! eventually returns is ignored by the caller.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Default)]
struct SlotInner {
    generation: u64,
    active: Option<CancellationToken>,
}

#[derive(Debug, Default)]
pub struct RequestSlot {
    name: &'static str,
    inner: Mutex<SlotInner>,
}

#[derive(Debug, Clone)]
pub struct RequestHandle {
    generation: u64,
    token: CancellationToken,
}

impl RequestSlot {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Mutex::new(SlotInner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Retires the active request (if any) and hands out a fresh handle.
    pub fn begin(&self) -> RequestHandle {
        let mut inner = self.lock();
        if let Some(previous) = inner.active.take() {
            debug!(slot = self.name, generation = inner.generation, "superseding in-flight request");
            previous.cancel();
        }
        inner.generation += 1;
        let token = CancellationToken::new();
        inner.active = Some(token.clone());
        RequestHandle {
            generation: inner.generation,
            token,
        }
    }

    /// Retires the active request without starting another.
    pub fn cancel(&self) {
        let mut inner = self.lock();
        if let Some(previous) = inner.active.take() {
            debug!(slot = self.name, generation = inner.generation, "cancelling in-flight request");
            previous.cancel();
        }
        inner.generation += 1;
    }

    pub fn is_current(&self, handle: &RequestHandle) -> bool {
        let inner = self.lock();
        inner.generation == handle.generation && !handle.token.is_cancelled()
    }

    pub fn is_active(&self) -> bool {
        self.lock().active.is_some()
    }

    /// Releases the slot if `handle` still owns it.
    pub fn finish(&self, handle: &RequestHandle) {
        let mut inner = self.lock();
        if inner.generation == handle.generation {
            inner.active = None;
        }
    }
}

impl Drop for RequestSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl RequestHandle {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Drives `fut` until it completes or the handle is retired. Retirement
    /// drops `fut`, which aborts the underlying HTTP request.
    pub async fn run<T, F>(&self, fut: F) -> ApiResult<T>
    where
        F: Future<Output = ApiResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ApiError::Cancelled),
            result = fut => result,
        }
    }
}
