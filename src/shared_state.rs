//! A latest-value cell fed by a [SnapshotSource] that only runs while someone
//! is watching.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::sync::{Notify, watch};

use crate::live::SnapshotSource;

type StartSource<T> = Box<dyn Fn() -> Box<dyn SnapshotSource<T>> + Send + Sync>;

/// The current snapshot of a live query plus change notifications.
///
/// The upstream source is started by the first [SharedState::subscribe] and
/// shared by all subscribers. Once the last subscriber is dropped the source
/// keeps running for the idle grace period, then stops. Subscribing again
/// restarts it from a fresh query.
///
/// Subscribers immediately see the last known snapshot, which is empty until
/// the first query completes and may be stale while the source is restarting.
pub struct SharedState<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    value: watch::Sender<Vec<T>>,
    start_source: StartSource<T>,
    idle_grace_period: Duration,
    running: Mutex<bool>,
    subscribed: Notify,
}

impl<T> Clone for SharedState<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> SharedState<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a shared state that calls `start_source` every time it needs to
    /// (re)start watching.
    pub fn new<F, S>(idle_grace_period: Duration, start_source: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: SnapshotSource<T> + 'static,
    {
        let (value, _) = watch::channel(Vec::new());

        Self {
            inner: Arc::new(Inner {
                value,
                start_source: Box::new(move || -> Box<dyn SnapshotSource<T>> {
                    Box::new(start_source())
                }),
                idle_grace_period,
                running: Mutex::new(false),
                subscribed: Notify::new(),
            }),
        }
    }

    /// Watch the state.
    ///
    /// `borrow()` on the receiver gives the current snapshot and `changed()`
    /// resolves when a new one arrives. Dropping the receiver unsubscribes.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn subscribe(&self) -> watch::Receiver<Vec<T>> {
        let mut running = self.inner.lock_running();
        let receiver = self.inner.value.subscribe();

        if !*running {
            *running = true;
            tokio::spawn(drive(self.inner.clone()));
        }
        self.inner.subscribed.notify_one();

        receiver
    }

    /// The last known snapshot.
    pub fn current(&self) -> Vec<T> {
        self.inner.value.borrow().clone()
    }

    /// Whether the upstream source is currently running.
    pub fn is_active(&self) -> bool {
        *self.inner.lock_running()
    }
}

impl<T> Inner<T> {
    fn lock_running(&self) -> MutexGuard<'_, bool> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark the source as stopped if nobody is subscribed. Checked under the
    /// same lock that [SharedState::subscribe] takes, so a new subscriber
    /// either sees the source running or starts a new one.
    fn stop_if_unwatched(&self) -> bool {
        let mut running = self.lock_running();

        if self.value.receiver_count() == 0 {
            *running = false;
            true
        } else {
            false
        }
    }
}

async fn drive<T>(inner: Arc<Inner<T>>)
where
    T: Clone + Send + Sync + 'static,
{
    let mut source = (inner.start_source)();
    let idle = wait_until_idle(&inner);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            snapshot = source.next_snapshot() => match snapshot {
                Ok(Some(snapshot)) => {
                    inner.value.send_replace(snapshot);
                }
                Ok(None) => break,
                Err(error) => {
                    tracing::error!("Could not refresh shared state: {error}");
                }
            },
            _ = &mut idle => {
                tracing::debug!("Stopped shared state after idle grace period");
                return;
            }
        }
    }

    // The source ended, so there is nothing left to watch.
    *inner.lock_running() = false;
}

/// Resolves once nobody has been subscribed for the whole grace period, after
/// marking the source as stopped.
///
/// A subscription during the grace period restarts the wait from the moment
/// that subscriber is dropped.
async fn wait_until_idle<T>(inner: &Inner<T>) {
    loop {
        inner.value.closed().await;

        tokio::select! {
            _ = inner.subscribed.notified() => continue,
            _ = tokio::time::sleep(inner.idle_grace_period) => {}
        }

        if inner.stop_if_unwatched() {
            return;
        }
    }
}
