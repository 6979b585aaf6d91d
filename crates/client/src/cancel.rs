use event_listener::Event;
use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A caller-provided cancellation signal.
///
/// Clones share the same signal. Operations check the token before
/// starting and race [`CancelToken::cancelled`] against network I/O, so
/// a fire mid-transfer abandons the socket rather than waiting it out.
///
/// ```
/// use wbem_client::CancelToken;
///
/// let token = CancelToken::new();
/// let for_worker = token.clone();
/// assert!(!for_worker.is_cancelled());
/// token.cancel();
/// assert!(for_worker.is_cancelled());
/// ```
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    event: Event,
}

impl CancelToken {
    /// A fresh, un-fired token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the signal. Idempotent; wakes every waiter.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.event.notify(usize::MAX);
    }

    /// True once [`CancelToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves when the signal fires; immediately if it already has.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            let listener = self.inner.event.listen();
            if self.is_cancelled() {
                return;
            }
            listener.await;
        }
    }
}

impl Debug for CancelToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_and_stays_fired() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
        futures_lite::future::block_on(token.cancelled());
    }

    #[test]
    fn wakes_a_waiting_future() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = std::thread::spawn(move || {
            futures_lite::future::block_on(waiter.cancelled());
        });
        std::thread::sleep(std::time::Duration::from_millis(20));
        token.cancel();
        handle.join().unwrap();
    }
}
