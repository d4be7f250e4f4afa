use rand::Rng;
use std::ops::RangeInclusive;

use crate::model::{ExperimentDefinition, PlannedJob, RunPlan};

/// Seconds added on top of the nominal active time.
pub const ACTIVE_JITTER: RangeInclusive<u64> = 1..=60;
/// Seconds added on top of the nominal rest time.
pub const REST_JITTER: RangeInclusive<u64> = 1..=30;

/// Jitter a single definition into a concrete job. Both durations come
/// out strictly greater than nominal, saturating at `u64::MAX`.
pub fn randomize<R: Rng + ?Sized>(def: &ExperimentDefinition, rng: &mut R) -> PlannedJob {
    let total_time = def.total_time.saturating_add(rng.gen_range(ACTIVE_JITTER));
    let sleep_time = def.sleep_time.saturating_add(rng.gen_range(REST_JITTER));
    PlannedJob::new(def.id.clone(), def.name.clone(), total_time, sleep_time)
}

/// Build a run plan in selection order.
pub fn plan<R: Rng + ?Sized>(selection: &[ExperimentDefinition], rng: &mut R) -> RunPlan {
    RunPlan::new(selection.iter().map(|def| randomize(def, rng)).collect())
}
