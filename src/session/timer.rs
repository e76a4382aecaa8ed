use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use super::state::SessionEvent;

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// One-second ticker bound to a live call
///
/// Ticks are delivered as `SessionEvent::Tick` carrying the call generation, so a tick that
/// races a stop is recognisable as stale. The counter itself lives with the session.
pub struct ElapsedTimer {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl ElapsedTimer {
    /// Start ticking; the first tick arrives one period from now
    pub fn start(generation: u64, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            loop {
                interval.tick().await;
                if tx.send(SessionEvent::Tick { generation }).is_err() {
                    break;
                }
            }
        });

        debug!("Elapsed timer started (generation={})", generation);

        Self {
            generation,
            task: Some(task),
        }
    }

    /// Cancel future ticks; safe to call repeatedly
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Elapsed timer stopped (generation={})", self.generation);
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for ElapsedTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Render seconds as `MM:SS` (minutes are not capped at 59)
pub fn format_elapsed(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "00:00");
        assert_eq!(format_elapsed(65), "01:05");
        assert_eq!(format_elapsed(119), "01:59");
        assert_eq!(format_elapsed(6_000), "100:00");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_second() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let started = Instant::now();
        let _timer = ElapsedTimer::start(3, tx);

        for expected in 1..=3u64 {
            assert_eq!(rx.recv().await, Some(SessionEvent::Tick { generation: 3 }));
            assert_eq!(started.elapsed(), Duration::from_secs(expected));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_future_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = ElapsedTimer::start(1, tx.clone());

        assert_eq!(rx.recv().await, Some(SessionEvent::Tick { generation: 1 }));
        timer.stop();
        timer.stop();
        assert!(!timer.is_running());

        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(tx);
        assert_eq!(rx.recv().await, None, "No ticks after stop");
    }
}
