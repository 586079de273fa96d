use std::{
    any::Any,
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use anyhow::anyhow;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::{Error, Result};

/// Cancellation flag shared between a goal session and whoever may stop it.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    canceled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.canceled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_canceled(&self) -> bool {
        self.inner.canceled.load(Ordering::SeqCst)
    }

    /// Resolves once [`CancelToken::cancel`] has been called.
    pub async fn canceled(&self) {
        // Registered before the flag check so a concurrent cancel is not lost.
        let notified = self.inner.notify.notified();
        if self.is_canceled() {
            return;
        }
        notified.await;
    }
}

/// Holds the token of the goal session in flight, at most one.
///
/// Goal dispatch and preemption are serialized: a goal is either sent before
/// a preempting stop, or not sent at all.
#[derive(Debug, Default)]
pub(crate) struct SessionSlot {
    active: Mutex<Option<CancelToken>>,
    dispatch: Mutex<()>,
}

impl SessionSlot {
    pub(crate) fn begin(&self) -> Result<SessionGuard<'_>> {
        let mut active = self.active.lock();
        if active.is_some() {
            return Err(Error::SessionInProgress);
        }
        let token = CancelToken::new();
        *active = Some(token.clone());
        Ok(SessionGuard { slot: self, token })
    }

    /// Returns `false` if no session was in flight.
    pub(crate) fn cancel(&self) -> bool {
        match &*self.active.lock() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Runs `send` unless `token` is already canceled. Returns `None` if it
    /// was.
    pub(crate) fn dispatch<T>(
        &self,
        token: &CancelToken,
        send: impl FnOnce() -> Result<T>,
    ) -> Result<Option<T>> {
        let _dispatch = self.dispatch.lock();
        if token.is_canceled() {
            return Ok(None);
        }
        send().map(Some)
    }

    /// Runs `stop`, then cancels the session in flight. Waits for a goal
    /// being dispatched to be sent first.
    ///
    /// The returned flag is `false` if no session was in flight.
    pub(crate) fn preempt<T>(&self, stop: impl FnOnce() -> T) -> (T, bool) {
        let _dispatch = self.dispatch.lock();
        let stopped = stop();
        (stopped, self.cancel())
    }
}

/// Frees the slot when dropped.
#[derive(Debug)]
pub(crate) struct SessionGuard<'a> {
    slot: &'a SessionSlot,
    token: CancelToken,
}

impl SessionGuard<'_> {
    pub(crate) fn token(&self) -> &CancelToken {
        &self.token
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        *self.slot.active.lock() = None;
    }
}

/// Drives `future` to completion on a dedicated thread with its own runtime
/// and blocks the caller until it finishes.
///
/// The runtime is multi-threaded so that clients calling
/// `tokio::task::block_in_place` keep working inside the future. A panic in
/// the worker is returned as [`Error::Other`].
pub(crate) fn block_on_worker<F, T>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send,
    T: Send,
{
    thread::scope(|scope| {
        let handle = thread::Builder::new()
            .name("goal-pursuit".to_owned())
            .spawn_scoped(scope, move || {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(1)
                    .enable_all()
                    .build()
                    .map_err(|e| Error::Other(e.into()))?;
                runtime.block_on(future)
            })
            .map_err(|e| Error::Other(e.into()))?;
        handle.join().unwrap_or_else(|payload| {
            Err(Error::Other(anyhow!(
                "goal pursuit worker panicked: {}",
                panic_message(&*payload)
            )))
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_cancel_wakes_waiter() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let task = tokio::spawn(async move { waiter.canceled().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!token.is_canceled());
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_canceled_before_wait() {
        let token = CancelToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_millis(100), token.canceled())
            .await
            .unwrap();
    }

    #[test]
    fn test_session_slot() {
        let slot = SessionSlot::default();
        assert!(!slot.cancel());
        {
            let guard = slot.begin().unwrap();
            assert!(slot.is_active());
            assert!(matches!(slot.begin(), Err(Error::SessionInProgress)));
            assert!(slot.cancel());
            assert!(guard.token().is_canceled());
        }
        assert!(!slot.is_active());
        let guard = slot.begin().unwrap();
        assert!(!guard.token().is_canceled());
    }

    #[test]
    fn test_dispatch_after_preempt_is_skipped() {
        let slot = SessionSlot::default();
        let guard = slot.begin().unwrap();
        let sent = slot.dispatch(guard.token(), || Ok(1)).unwrap();
        assert_eq!(sent, Some(1));

        let (stopped, canceled) = slot.preempt(|| "stopped");
        assert_eq!(stopped, "stopped");
        assert!(canceled);
        let sent = slot
            .dispatch(guard.token(), || -> Result<i32> { panic!("must not send") })
            .unwrap();
        assert_eq!(sent, None);
    }

    #[test]
    fn test_preempt_waits_for_dispatch() {
        let slot = SessionSlot::default();
        let guard = slot.begin().unwrap();
        let order = Mutex::new(vec![]);
        thread::scope(|s| {
            let sending = s.spawn(|| {
                slot.dispatch(guard.token(), || {
                    thread::sleep(Duration::from_millis(50));
                    order.lock().push("sent");
                    Ok(())
                })
            });
            thread::sleep(Duration::from_millis(10));
            slot.preempt(|| order.lock().push("stopped"));
            assert_eq!(sending.join().unwrap().unwrap(), Some(()));
        });
        assert_eq!(*order.lock(), vec!["sent", "stopped"]);
    }

    #[test]
    fn test_block_on_worker() {
        let value = block_on_worker(async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Ok(thread::current().name().map(str::to_owned))
        })
        .unwrap();
        assert_eq!(value.as_deref(), Some("goal-pursuit"));

        let err = block_on_worker(async { Err::<(), _>(Error::BaseOff) }).unwrap_err();
        assert!(matches!(err, Error::BaseOff));
    }

    #[test]
    fn test_block_on_worker_panic() {
        let err = block_on_worker(async {
            if true {
                panic!("boom");
            }
            Ok(())
        })
        .unwrap_err();
        assert!(err.to_string().contains("boom"), "{err}");
    }
}
