//! Fixed-interval background sync.
//!
//! Runs [`SyncReconciler::sync_pending`] periodically until stopped.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::identity::IdentityProvider;
use crate::local::LocalAssets;
use crate::mirror::RemoteMirror;
use crate::reconciler::SyncReconciler;

/// Owns at most one background sync timer.
///
/// Dropping an `AutoSync` stops its timer.
#[derive(Debug, Default)]
pub struct AutoSync {
    handle: Option<JoinHandle<()>>,
}

impl AutoSync {
    /// Create a stopped auto-sync.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start syncing every `period`, replacing any running timer.
    ///
    /// The first pass runs one `period` after starting. Errors from a pass
    /// are logged and the timer keeps running.
    pub fn start<R, I, L>(
        &mut self,
        reconciler: Arc<SyncReconciler<R, I>>,
        local: Arc<L>,
        period: Duration,
    ) where
        R: RemoteMirror + 'static,
        I: IdentityProvider + 'static,
        L: LocalAssets + 'static,
    {
        self.stop();

        let period = period.max(Duration::from_millis(1));
        tracing::info!("Auto-sync started (interval: {}s)", period.as_secs());

        self.handle = Some(tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;

                match reconciler.sync_pending(local.as_ref()).await {
                    Ok(outcome) => {
                        if outcome.uploaded > 0 || outcome.failed > 0 {
                            tracing::info!(
                                "Auto-sync: {} uploaded, {} failed",
                                outcome.uploaded,
                                outcome.failed
                            );
                        } else {
                            tracing::debug!("Auto-sync: nothing to upload");
                        }
                    }
                    Err(e) => {
                        tracing::error!("Auto-sync error: {}", e);
                    }
                }
            }
        }));
    }

    /// Stop the running timer, if any.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::info!("Auto-sync stopped");
        }
    }

    /// Whether a timer is running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for AutoSync {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
