use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, trace};
use uuid::Uuid;

use crate::executor::JobPhase;
use crate::state::timeline::{format_timestamp, humanize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    RunStarted {
        run_id: Uuid,
        jobs: usize,
        total_seconds: u64,
        started_at: DateTime<Local>,
        eta: DateTime<Local>,
    },
    JobStarted {
        job_id: String,
        name: String,
        position: usize,
        count: usize,
        active_until: DateTime<Local>,
    },
    PhaseChanged {
        job_id: String,
        from: JobPhase,
        to: JobPhase,
    },
    Tick {
        job_id: String,
        phase: JobPhase,
        elapsed: u64,
        total: u64,
    },
    TimelineUpdated {
        remaining_seconds: u64,
        eta: DateTime<Local>,
    },
    RunFinished {
        run_id: Uuid,
        completed: usize,
    },
    RunAborted {
        run_id: Uuid,
        job_id: String,
        completed: usize,
        reason: String,
    },
}

/// Receives every run event. Implementations must not block.
pub trait EventBus: Send + Sync {
    fn publish(&self, event: Event);
}

/// Renders events as log lines.
#[derive(Debug, Clone, Default)]
pub struct TracingBus;

impl EventBus for TracingBus {
    fn publish(&self, event: Event) {
        match event {
            Event::RunStarted { run_id, jobs, total_seconds, started_at, eta } => {
                info!(%run_id, jobs, "start time: {}", format_timestamp(&started_at));
                info!("estimated finish: {}", format_timestamp(&eta));
                info!("estimated total: {}", humanize(total_seconds));
            }
            Event::JobStarted { job_id, name, position, count, active_until } => {
                info!(job = %job_id, "running {} ({}/{})", name, position, count);
                info!(job = %job_id, "this experiment should finish at {}", format_timestamp(&active_until));
            }
            Event::PhaseChanged { job_id, from, to } => match to {
                JobPhase::Failed => error!(job = %job_id, ?from, "job failed"),
                _ if to.is_terminal() => info!(job = %job_id, "experiment done"),
                _ => debug!(job = %job_id, ?from, ?to, "phase change"),
            },
            Event::Tick { job_id, phase, elapsed, total } => {
                if elapsed % 60 == 0 || elapsed == total {
                    info!(job = %job_id, ?phase, "{} / {}", humanize(elapsed), humanize(total));
                } else {
                    trace!(job = %job_id, ?phase, elapsed, total, "tick");
                }
            }
            Event::TimelineUpdated { remaining_seconds, eta } => {
                info!("updated finish estimate: {}", format_timestamp(&eta));
                info!("time remaining: {}", humanize(remaining_seconds));
            }
            Event::RunFinished { run_id, completed } => {
                info!(%run_id, completed, "all experiments finished");
            }
            Event::RunAborted { run_id, job_id, completed, reason } => {
                error!(%run_id, job = %job_id, completed, "run aborted: {}", reason);
            }
        }
    }
}

/// Forwards events to an unbounded channel, for callers that render or
/// inspect progress themselves.
#[derive(Debug, Clone)]
pub struct ChannelBus {
    tx: UnboundedSender<Event>,
}

impl ChannelBus {
    pub fn new() -> (Self, UnboundedReceiver<Event>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventBus for ChannelBus {
    fn publish(&self, event: Event) {
        // receiver gone means nobody is watching
        let _ = self.tx.send(event);
    }
}

impl<B: EventBus + ?Sized> EventBus for std::sync::Arc<B> {
    fn publish(&self, event: Event) {
        (**self).publish(event)
    }
}
