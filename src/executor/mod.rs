pub mod driver;
pub mod runner;

pub use runner::{run_job, JobPhase};

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, RunAborted};
use crate::log::{Event, EventBus};
use crate::model::{PlannedJob, RunPlan};
use crate::session::SessionClient;
use crate::state::timeline::{compute_eta, Timeline};

/// Outcome of one job that reached done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub job_id: String,
    pub session_id: String,
    pub elapsed_seconds: u64,
    pub ack: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub completed: Vec<JobReport>,
    pub total_seconds: u64,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

/// Runs a plan one job at a time and stops at the first failure.
pub struct Orchestrator<C, B> {
    client: C,
    bus: B,
    cancel: CancellationToken,
}

impl<C, B> Orchestrator<C, B>
where
    C: SessionClient,
    B: EventBus,
{
    pub fn new(client: C, bus: B) -> Self {
        Self {
            client,
            bus,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops the run at the next tick.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub async fn execute_plan(&self, plan: &RunPlan) -> Result<RunReport, RunAborted> {
        for job in plan.jobs() {
            if let Err(source) = self.client.check_ready(job).await {
                return Err(self.abort(plan, job, Vec::new(), source));
            }
        }

        let mut timeline = Timeline::start(plan);
        self.bus.publish(Event::RunStarted {
            run_id: plan.run_id(),
            jobs: plan.len(),
            total_seconds: timeline.total(),
            started_at: timeline.started_at(),
            eta: timeline.eta(),
        });

        let mut completed = Vec::with_capacity(plan.len());
        for (index, job) in plan.jobs().iter().enumerate() {
            self.bus.publish(Event::JobStarted {
                job_id: job.id().to_string(),
                name: job.name().to_string(),
                position: index + 1,
                count: plan.len(),
                active_until: compute_eta(Local::now(), job.total_time()),
            });

            match run_job(&self.client, &self.bus, job, &self.cancel).await {
                Ok(report) => completed.push(report),
                Err(source) => return Err(self.abort(plan, job, completed, source)),
            }

            timeline.job_completed(plan, index);
            self.bus.publish(Event::TimelineUpdated {
                remaining_seconds: timeline.remaining(),
                eta: timeline.eta(),
            });
        }

        info!(run_id = %plan.run_id(), "run complete");
        self.bus.publish(Event::RunFinished {
            run_id: plan.run_id(),
            completed: completed.len(),
        });
        Ok(RunReport {
            run_id: plan.run_id(),
            completed,
            total_seconds: timeline.total(),
            started_at: timeline.started_at(),
            finished_at: Local::now(),
        })
    }

    fn abort(&self, plan: &RunPlan, job: &PlannedJob, completed: Vec<JobReport>, source: Error) -> RunAborted {
        self.bus.publish(Event::RunAborted {
            run_id: plan.run_id(),
            job_id: job.id().to_string(),
            completed: completed.len(),
            reason: source.to_string(),
        });
        RunAborted {
            job_id: job.id().to_string(),
            completed,
            source,
        }
    }
}

#[cfg(test)]
pub(crate) mod stub;
