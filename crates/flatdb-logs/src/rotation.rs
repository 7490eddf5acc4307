use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::manager::LogManager;

/// Handle to a background rotation task started by [`spawn_rotation`].
///
/// Dropping the handle also stops the task after its current sweep.
pub struct RotationHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl RotationHandle {
    /// Stop the task and wait for an in-progress sweep to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.task.await {
            warn!(error = %e, "log rotation task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Rotate every live topic once per `every`, starting one period from now.
///
/// Each sweep runs [`LogManager::rotate_all`] on the blocking pool. Sweep
/// failures are logged and the schedule continues.
pub fn spawn_rotation(manager: Arc<LogManager>, every: Duration) -> RotationHandle {
    let (tx, mut rx) = oneshot::channel();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = &mut rx => break,
                _ = ticker.tick() => {
                    let manager = Arc::clone(&manager);
                    match tokio::task::spawn_blocking(move || manager.rotate_all()).await {
                        Ok(Ok(report)) => info!(
                            archived = report.archived(),
                            failed = report.failed.len(),
                            "log rotation sweep complete"
                        ),
                        Ok(Err(e)) => warn!(error = %e, "log rotation sweep failed"),
                        Err(e) => warn!(error = %e, "log rotation sweep panicked"),
                    }
                }
            }
        }

        debug!("log rotation stopped");
    });

    RotationHandle {
        shutdown: Some(tx),
        task,
    }
}
