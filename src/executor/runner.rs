use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::executor::driver;
use crate::executor::JobReport;
use crate::log::{Event, EventBus};
use crate::model::PlannedJob;
use crate::session::SessionClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Pending,
    Opening,
    Active,
    Closing,
    Resting,
    Done,
    Failed,
}

impl JobPhase {
    pub fn can_transition_to(self, next: JobPhase) -> bool {
        use JobPhase::*;
        matches!(
            (self, next),
            (Pending, Opening)
                | (Opening, Active)
                | (Opening, Failed)
                | (Active, Closing)
                | (Active, Failed)
                | (Closing, Resting)
                | (Closing, Done)
                | (Closing, Failed)
                | (Resting, Done)
                | (Resting, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobPhase::Done | JobPhase::Failed)
    }
}

/// Current phase of one job; every move is published.
struct PhaseTracker<'a, B: ?Sized> {
    bus: &'a B,
    job_id: &'a str,
    phase: JobPhase,
}

impl<'a, B: EventBus + ?Sized> PhaseTracker<'a, B> {
    fn new(bus: &'a B, job_id: &'a str) -> Self {
        Self {
            bus,
            job_id,
            phase: JobPhase::Pending,
        }
    }

    fn advance(&mut self, to: JobPhase) {
        debug_assert!(
            self.phase.can_transition_to(to),
            "illegal transition {:?} -> {:?}",
            self.phase,
            to
        );
        self.bus.publish(Event::PhaseChanged {
            job_id: self.job_id.to_string(),
            from: self.phase,
            to,
        });
        self.phase = to;
    }

    fn fail(&mut self, err: Error) -> Error {
        self.advance(JobPhase::Failed);
        err
    }
}

/// Drive one job from open to done.
///
/// Once a session is open it is always closed, even when the active phase
/// is cut short; the close then reports the seconds that really elapsed.
pub async fn run_job<C, B>(
    client: &C,
    bus: &B,
    job: &PlannedJob,
    cancel: &CancellationToken,
) -> Result<JobReport>
where
    C: SessionClient + ?Sized,
    B: EventBus + ?Sized,
{
    info!(job = job.id(), "running experiment: {}", job.name());
    let mut tracker = PhaseTracker::new(bus, job.id());

    tracker.advance(JobPhase::Opening);
    let handle = match client.open(job).await {
        Ok(handle) => handle,
        Err(e) => return Err(tracker.fail(e)),
    };
    let session_id = handle.as_str().to_string();

    tracker.advance(JobPhase::Active);
    let active = driver::hold(bus, job, JobPhase::Active, job.total_time(), cancel).await;

    tracker.advance(JobPhase::Closing);
    let ack = match client.close(handle, active.elapsed, job.id()).await {
        Ok(ack) => ack,
        Err(e) => return Err(tracker.fail(e)),
    };
    if active.cancelled {
        warn!(job = job.id(), elapsed = active.elapsed, "cancelled while active, session closed early");
        return Err(tracker.fail(Error::Cancelled));
    }

    if job.sleep_time() > 0 {
        tracker.advance(JobPhase::Resting);
        let rest = driver::hold(bus, job, JobPhase::Resting, job.sleep_time(), cancel).await;
        if rest.cancelled {
            return Err(tracker.fail(Error::Cancelled));
        }
    }

    tracker.advance(JobPhase::Done);
    Ok(JobReport {
        job_id: job.id().to_string(),
        session_id,
        elapsed_seconds: active.elapsed,
        ack: ack.0,
    })
}
