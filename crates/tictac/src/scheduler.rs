//! Fixed-interval scheduling with at most one run in flight.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::MissedTickBehavior;

use tictac_vision::{BoardLocator, CellClassifier};

use crate::pipeline::Pipeline;
use crate::source::FrameSource;

/// A slot that admits one holder at a time.
#[derive(Debug, Default)]
pub struct SingleSlot {
    busy: AtomicBool,
}

/// Releases its [`SingleSlot`] on drop.
#[derive(Debug)]
pub struct SlotGuard {
    slot: Arc<SingleSlot>,
}

impl SingleSlot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// `None` while another guard is alive.
    pub fn try_acquire(self: &Arc<Self>) -> Option<SlotGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SlotGuard { slot: self.clone() })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.slot.busy.store(false, Ordering::Release);
    }
}

/// Counters for one [`Scheduler::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub ticks: u64,
    pub runs: u64,
    pub dropped_ticks: u64,
}

/// Returned by a job to keep going or end the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Stop,
}

/// Calls a blocking job every `interval`; ticks that land on a busy job are dropped.
#[derive(Clone, Debug)]
pub struct Scheduler {
    interval: Duration,
    max_ticks: Option<u64>,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_ticks: None,
        }
    }

    /// Stop after `max_ticks` ticks (fired or dropped).
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Tick until the job returns [`TickOutcome::Stop`] or `max_ticks` is hit,
    /// then wait for the last job to finish.
    pub async fn run<F>(&self, job: F) -> RunStats
    where
        F: Fn() -> TickOutcome + Send + Sync + 'static,
    {
        let job = Arc::new(job);
        let slot = SingleSlot::new();
        let stop = Arc::new(AtomicBool::new(false));
        let runs = Arc::new(AtomicU64::new(0));
        let mut stats = RunStats::default();
        let mut last = None;

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if stop.load(Ordering::Acquire) || self.max_ticks.is_some_and(|m| stats.ticks >= m) {
                break;
            }
            ticker.tick().await;
            // jobs store `stop` before releasing the slot
            let guard = slot.try_acquire();
            if stop.load(Ordering::Acquire) {
                break;
            }
            stats.ticks += 1;

            let Some(guard) = guard else {
                stats.dropped_ticks += 1;
                log::debug!("tick {} dropped: previous run still busy", stats.ticks);
                continue;
            };

            let (job, stop, runs) = (job.clone(), stop.clone(), runs.clone());
            last = Some(tokio::task::spawn_blocking(move || {
                let _guard = guard;
                runs.fetch_add(1, Ordering::AcqRel);
                if job() == TickOutcome::Stop {
                    stop.store(true, Ordering::Release);
                }
            }));
        }

        if let Some(handle) = last {
            if let Err(err) = handle.await {
                log::error!("scheduled job panicked: {err}");
            }
        }
        stats.runs = runs.load(Ordering::Acquire);
        log::info!(
            "scheduler stopped: {} ticks, {} runs, {} dropped",
            stats.ticks,
            stats.runs,
            stats.dropped_ticks
        );
        stats
    }
}

/// Pull frames from `source` on every tick and feed them to `pipeline`.
///
/// The run ends when the source is exhausted or `scheduler` hits its tick
/// limit. Errors are logged and the loop continues.
pub async fn run_pipeline<S, L, C>(
    scheduler: &Scheduler,
    source: S,
    pipeline: Arc<Pipeline<L, C>>,
) -> RunStats
where
    S: FrameSource + Send + 'static,
    L: BoardLocator + Send + Sync + 'static,
    C: CellClassifier + Send + Sync + 'static,
{
    let source = Mutex::new(source);
    scheduler
        .run(move || {
            let next = source
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .next_frame();
            let frame = match next {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    log::info!("frame source exhausted");
                    return TickOutcome::Stop;
                }
                Err(err) => {
                    log::warn!("frame capture failed: {err}");
                    return TickOutcome::Continue;
                }
            };
            match pipeline.process(&frame) {
                Ok(report) => log::debug!(
                    "frame at {} ms: {} (generation {})",
                    report.captured_at_ms,
                    report.board,
                    report.generation
                ),
                Err(err) if err.is_recoverable() => log::info!("frame skipped: {err}"),
                Err(err) => log::error!("pipeline defect: {err}"),
            }
            TickOutcome::Continue
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn slot_admits_one_holder() {
        let slot = SingleSlot::new();
        let guard = slot.try_acquire().expect("free slot");
        assert!(slot.is_busy());
        assert!(slot.try_acquire().is_none());
        drop(guard);
        assert!(!slot.is_busy());
        assert!(slot.try_acquire().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn slow_jobs_drop_ticks_instead_of_queueing() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (a, p) = (active.clone(), peak.clone());

        let stats = Scheduler::new(Duration::from_millis(20))
            .with_max_ticks(12)
            .run(move || {
                let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(70));
                a.fetch_sub(1, Ordering::SeqCst);
                TickOutcome::Continue
            })
            .await;

        assert_eq!(stats.ticks, 12);
        assert!(stats.dropped_ticks > 0, "{stats:?}");
        assert_eq!(stats.runs + stats.dropped_ticks, stats.ticks);
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stop_outcome_ends_the_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let stats = Scheduler::new(Duration::from_millis(5))
            .run(move || {
                if c.fetch_add(1, Ordering::SeqCst) + 1 >= 3 {
                    TickOutcome::Stop
                } else {
                    TickOutcome::Continue
                }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(stats.runs, 3);
    }
}
