use crate::services::staging::StagingArea;
use tokio::sync::watch;
use tokio::time::{Duration, sleep};

/// Periodically deletes staged files abandoned by a crashed process.
pub struct StagingSweeper {
    staging: StagingArea,
    max_age: Duration,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl StagingSweeper {
    pub fn new(
        staging: StagingArea,
        max_age: Duration,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            staging,
            max_age,
            interval,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            "🚀 Staging sweeper started (max age {:?}, every {:?})",
            self.max_age,
            self.interval
        );

        self.sweep_once().await;

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Staging sweeper shutting down");
                    break;
                }
                _ = sleep(self.interval) => {
                    self.sweep_once().await;
                }
            }
        }
    }

    async fn sweep_once(&self) {
        match self.staging.sweep(self.max_age).await {
            Ok(0) => tracing::debug!("🧹 Staging area clean"),
            Ok(removed) => tracing::info!("🧹 Removed {} abandoned staged files", removed),
            Err(e) => tracing::error!("Staging sweep failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sweeps_on_start_and_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::open(dir.path(), 1024).await.unwrap();
        std::fs::write(dir.path().join("summary-1-1.pdf"), b"x").unwrap();

        let (tx, rx) = watch::channel(false);
        let sweeper = StagingSweeper::new(
            staging,
            Duration::ZERO,
            Duration::from_secs(3600),
            rx,
        );
        let handle = tokio::spawn(sweeper.run());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!dir.path().join("summary-1-1.pdf").exists());

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
