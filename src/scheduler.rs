//! Background timers for the memory subsystem.
//!
//! Two independent tasks run against the shared store: a snapshot timer
//! (write-behind durability, saves only when the store is dirty) and a
//! consolidation timer (short-term → long-term promotion sweep). Both stop
//! on shutdown; dropping the scheduler aborts them so no orphan timer can
//! outlive the store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use crate::config::MemoryConfig;
use crate::error::Result;
use crate::memory::MemoryStore;

/// Handle owning the background snapshot and consolidation tasks.
pub struct Scheduler {
    store: Arc<MemoryStore>,
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Start both timers against `store`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(store: Arc<MemoryStore>, config: &MemoryConfig) -> Self {
        let (shutdown, _) = watch::channel(false);

        let handles = vec![
            tokio::spawn(snapshot_loop(
                store.clone(),
                config.snapshot_interval(),
                shutdown.subscribe(),
            )),
            tokio::spawn(consolidation_loop(
                store.clone(),
                config.consolidation_interval(),
                shutdown.subscribe(),
            )),
        ];

        Self {
            store,
            shutdown,
            handles,
        }
    }

    /// Stop both timers, wait for them, and flush a final snapshot.
    pub async fn shutdown(mut self) -> Result<()> {
        let _ = self.shutdown.send(true);
        for handle in self.handles.drain(..) {
            let _ = handle.await;
        }
        self.store.save()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

async fn snapshot_loop(
    store: Arc<MemoryStore>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it so the loop waits a
    // full interval before its first save.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match store.save_if_dirty() {
                    Ok(true) => debug!("background snapshot written"),
                    Ok(false) => {}
                    Err(e) => warn!(error = %e, "background snapshot failed"),
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}

async fn consolidation_loop(
    store: Arc<MemoryStore>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match store.consolidate() {
                    Ok(promoted) if promoted > 0 => {
                        debug!(promoted, "background consolidation sweep");
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "background consolidation failed"),
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}
