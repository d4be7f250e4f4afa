use chrono::{DateTime, Duration, Local};

use crate::model::RunPlan;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn compute_total(plan: &RunPlan) -> u64 {
    plan.jobs()
        .iter()
        .fold(0, |acc: u64, j| acc.saturating_add(j.duration()))
}

pub fn compute_eta(start: DateTime<Local>, total: u64) -> DateTime<Local> {
    start + Duration::seconds(total as i64)
}

/// Seconds still ahead once the job at `completed_index` is done.
pub fn recompute_remaining(plan: &RunPlan, completed_index: usize) -> u64 {
    plan.jobs()
        .iter()
        .skip(completed_index + 1)
        .fold(0, |acc: u64, j| acc.saturating_add(j.duration()))
}

pub fn format_timestamp(ts: &DateTime<Local>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn humanize(seconds: u64) -> String {
    humantime::format_duration(std::time::Duration::from_secs(seconds)).to_string()
}

/// Run-level clock: fixed start, remaining seconds that only go down.
#[derive(Debug, Clone)]
pub struct Timeline {
    started_at: DateTime<Local>,
    total: u64,
    remaining: u64,
    eta: DateTime<Local>,
}

impl Timeline {
    pub fn start(plan: &RunPlan) -> Self {
        Self::start_at(plan, Local::now())
    }

    pub fn start_at(plan: &RunPlan, started_at: DateTime<Local>) -> Self {
        let total = compute_total(plan);
        Self {
            started_at,
            total,
            remaining: total,
            eta: compute_eta(started_at, total),
        }
    }

    /// Record that job `index` reached done and re-anchor the ETA on the
    /// current wall clock.
    pub fn job_completed(&mut self, plan: &RunPlan, index: usize) {
        self.job_completed_at(plan, index, Local::now());
    }

    pub fn job_completed_at(&mut self, plan: &RunPlan, index: usize, now: DateTime<Local>) {
        let remaining = recompute_remaining(plan, index);
        debug_assert_eq!(
            Some(remaining),
            self.remaining.checked_sub(plan.jobs()[index].duration()),
            "jobs must complete in plan order"
        );
        self.remaining = remaining.min(self.remaining);
        self.eta = compute_eta(now, self.remaining);
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn eta(&self) -> DateTime<Local> {
        self.eta
    }
}
