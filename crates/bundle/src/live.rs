//! A bundle that tells subscribers what changed.

use crate::broadcast::{Broadcaster, Delivery, Subscription};
use crate::reload::{Bundle, Reloaded};
use crate::snapshot::{Info, Snapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// [`Bundle`] plus [`Broadcaster`].
///
/// Publishing a snapshot and broadcasting its changes happen in one step, so
/// a subscriber never hears about a change before the snapshot containing it
/// can be read, and never hears about two cycles out of order.
pub struct Live {
    bundle: Bundle,
    broadcaster: Broadcaster,
    step: Mutex<()>,
    initialized: OnceCell<()>,
}

impl Live {
    pub fn new(bundle: Bundle, broadcaster: Broadcaster) -> Self {
        Self {
            bundle,
            broadcaster,
            step: Mutex::new(()),
            initialized: OnceCell::new(),
        }
    }

    pub fn bundle(&self) -> &Bundle {
        &self.bundle
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.bundle.snapshot()
    }

    pub fn info(&self, live: Option<&str>) -> Info {
        self.snapshot().info(live)
    }

    pub fn subscribe(&self) -> Subscription {
        self.broadcaster.register()
    }

    /// Run the first reload cycle if no cycle has run yet.
    pub async fn initialize(&self) {
        self.initialized
            .get_or_init(|| async {
                self.reload().await;
            })
            .await;
    }

    /// One reload cycle, then broadcast whatever it changed.
    pub async fn reload(&self) -> (Reloaded, Delivery) {
        let _step = self.step.lock().await;
        let reloaded = self.bundle.reload().await;
        for error in reloaded.errors.iter() {
            tracing::warn!(error = %**error, "Reload error");
        }
        let delivery = self.broadcaster.broadcast(&reloaded.changes);
        if delivery.resynced > 0 {
            tracing::info!(resynced = delivery.resynced, changes = reloaded.changes.len(), "Asked subscribers to resync");
        }
        if delivery.overflowed > 0 {
            tracing::warn!(overflowed = delivery.overflowed, "Disconnected subscribers that fell behind");
        }
        // Later calls to `initialize` have nothing left to do.
        let _ = self.initialized.set(());
        (reloaded, delivery)
    }

    /// Reload every `interval`, forever.
    ///
    /// The first tick fires immediately. A cycle that overruns the interval
    /// delays the next one instead of queueing a burst. The task only ends
    /// when it is aborted.
    pub fn spawn_monitor(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let live = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                live.reload().await;
            }
        })
    }
}
