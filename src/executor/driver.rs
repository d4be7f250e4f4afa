use tokio::time::{sleep_until, Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::executor::JobPhase;
use crate::log::{Event, EventBus};
use crate::model::PlannedJob;

/// How a timed phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hold {
    /// Whole seconds that actually passed.
    pub elapsed: u64,
    pub cancelled: bool,
}

/// Hold `phase` for `seconds`, publishing one tick per elapsed second.
///
/// Ticks are anchored to the start instant so slow sinks do not stretch the
/// phase. Cancellation is checked before every tick.
pub async fn hold<B>(
    bus: &B,
    job: &PlannedJob,
    phase: JobPhase,
    seconds: u64,
    cancel: &CancellationToken,
) -> Hold
where
    B: EventBus + ?Sized,
{
    let start = Instant::now();
    for elapsed in 1..=seconds {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Hold { elapsed: elapsed - 1, cancelled: true };
            }
            _ = sleep_until(start + Duration::from_secs(elapsed)) => {}
        }
        bus.publish(Event::Tick {
            job_id: job.id().to_string(),
            phase,
            elapsed,
            total: seconds,
        });
    }
    Hold { elapsed: seconds, cancelled: false }
}

#[cfg(test)]
mod tests;
