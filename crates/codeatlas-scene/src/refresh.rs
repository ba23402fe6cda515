use anyhow::{Context, Result};
use codeatlas_core::SurfaceEvent;
use crossbeam_channel::Sender;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

// Dropping the handle cancels the worker without joining it.
pub struct RefreshHandle {
    cancel: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    pub fn stop(mut self) {
        self.cancel.cancel();
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                tracing::warn!("refresh worker panicked");
            }
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

const MIN_INTERVAL: Duration = Duration::from_millis(1);

pub fn spawn(interval: Duration, tx: Sender<SurfaceEvent>) -> Result<RefreshHandle> {
    // tokio rejects a zero period.
    let interval = interval.max(MIN_INTERVAL);
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("build refresh runtime")?;

    let join = std::thread::Builder::new()
        .name("scene-refresh".into())
        .spawn(move || {
            rt.block_on(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = ticker.tick() => {
                            // Receiver gone means the surface shut down.
                            if tx.send(SurfaceEvent::AdvancePositions).is_err() {
                                break;
                            }
                        }
                    }
                }
            });
            tracing::debug!("refresh worker stopped");
        })
        .context("spawn refresh thread")?;

    tracing::debug!(interval_ms = interval.as_millis() as u64, "refresh worker started");
    Ok(RefreshHandle {
        cancel,
        join: Some(join),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_until_stopped() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = spawn(Duration::from_millis(5), tx).expect("spawn worker");
        let first = rx.recv_timeout(Duration::from_secs(2)).expect("tick");
        assert_eq!(first, SurfaceEvent::AdvancePositions);

        handle.stop();
        // Worker owned the only sender; once it exits the channel disconnects.
        while rx.recv_timeout(Duration::from_secs(2)).is_ok() {}
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn exits_when_receiver_is_dropped() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = spawn(Duration::from_millis(1), tx).expect("spawn worker");
        drop(rx);
        handle.stop();
    }

    #[test]
    fn zero_interval_is_clamped() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = spawn(Duration::ZERO, tx).expect("spawn worker");
        let first = rx.recv_timeout(Duration::from_secs(2)).expect("tick");
        assert_eq!(first, SurfaceEvent::AdvancePositions);
        handle.stop();
    }
}
