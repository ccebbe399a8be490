//! The single generation-in-flight flag and the state that travels with it.
//!
//! [`GenerationState`] is a cheap clonable handle, so a front end can keep one
//! to read the partial reply or stop the stream while the session is busy
//! awaiting it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Inner {
    active: AtomicBool,
    partial: Mutex<String>,
    cancel_token: Mutex<Option<CancellationToken>>,
}

#[derive(Clone, Default)]
pub struct GenerationState {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl GenerationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_generating(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Text received so far for the in-flight reply.
    pub fn partial_text(&self) -> String {
        lock(&self.inner.partial).clone()
    }

    /// Signals the in-flight request to stop. Returns false when nothing was
    /// running.
    pub fn stop(&self) -> bool {
        match lock(&self.inner.cancel_token).as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Claims the flag. Returns `None` while another generation is active.
    pub fn try_begin(&self) -> Option<GenerationGuard> {
        self.inner
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;

        let token = CancellationToken::new();
        lock(&self.inner.partial).clear();
        *lock(&self.inner.cancel_token) = Some(token.clone());
        Some(GenerationGuard {
            state: self.clone(),
            token,
        })
    }
}

/// Held for the lifetime of one request. Dropping it clears the flag, the
/// partial text and the cancellation token, whatever the outcome was.
pub struct GenerationGuard {
    state: GenerationState,
    token: CancellationToken,
}

impl GenerationGuard {
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn push_delta(&self, delta: &str) {
        lock(&self.state.inner.partial).push_str(delta);
    }

    pub fn partial_text(&self) -> String {
        self.state.partial_text()
    }
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        lock(&self.state.inner.partial).clear();
        lock(&self.state.inner.cancel_token).take();
        self.state.inner.active.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_one_generation_at_a_time() {
        let state = GenerationState::new();
        let guard = state.try_begin().expect("first begin");
        assert!(state.is_generating());
        assert!(state.try_begin().is_none());
        drop(guard);
        assert!(!state.is_generating());
        assert!(state.try_begin().is_some());
    }

    #[test]
    fn dropping_guard_resets_everything() {
        let state = GenerationState::new();
        let guard = state.try_begin().unwrap();
        guard.push_delta("Hel");
        guard.push_delta("lo");
        assert_eq!(state.partial_text(), "Hello");
        let token = guard.cancel_token().clone();
        drop(guard);
        assert_eq!(state.partial_text(), "");
        assert!(!state.stop());
        assert!(!token.is_cancelled());
    }

    #[test]
    fn stop_cancels_the_active_token() {
        let state = GenerationState::new();
        assert!(!state.stop());
        let guard = state.try_begin().unwrap();
        let handle = state.clone();
        assert!(handle.stop());
        assert!(guard.cancel_token().is_cancelled());
    }
}
