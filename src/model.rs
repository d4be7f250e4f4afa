use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentDefinition {
    pub id: String,
    pub name: String,
    pub total_time: u64,
    #[serde(default)]
    pub sleep_time: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub category: String,
    #[serde(default)]
    pub experiments: Vec<ExperimentDefinition>,
}

/// Ordered categories of experiments. Menu positions run 1..=N across
/// categories in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    pub categories: Vec<Category>,
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.categories.iter().map(|c| c.experiments.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Experiments with their 1-based menu position, in menu order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &Category, &ExperimentDefinition)> {
        self.categories
            .iter()
            .flat_map(|c| c.experiments.iter().map(move |e| (c, e)))
            .enumerate()
            .map(|(i, (c, e))| (i + 1, c, e))
    }

    /// Resolve `all` or a comma separated list of menu positions.
    pub fn select(&self, expr: &str) -> Result<Vec<ExperimentDefinition>> {
        let expr = expr.trim();
        if expr.eq_ignore_ascii_case("all") {
            return Ok(self.entries().map(|(_, _, e)| e.clone()).collect());
        }

        let all: Vec<&ExperimentDefinition> = self.entries().map(|(_, _, e)| e).collect();
        let mut selected = Vec::new();
        for part in expr.split(',') {
            let part = part.trim();
            let index: usize = part
                .parse()
                .map_err(|_| Error::InvalidSelection(format!("'{part}' is not a menu number")))?;
            if index == 0 || index > all.len() {
                return Err(Error::InvalidSelection(format!(
                    "{index} is out of range 1..={}",
                    all.len()
                )));
            }
            selected.push(all[index - 1].clone());
        }
        Ok(selected)
    }
}

/// One experiment with concrete, already jittered durations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedJob {
    id: String,
    name: String,
    total_time: u64,
    sleep_time: u64,
}

impl PlannedJob {
    pub fn new(id: impl Into<String>, name: impl Into<String>, total_time: u64, sleep_time: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            total_time,
            sleep_time,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn total_time(&self) -> u64 {
        self.total_time
    }

    pub fn sleep_time(&self) -> u64 {
        self.sleep_time
    }

    /// Active plus rest seconds.
    pub fn duration(&self) -> u64 {
        self.total_time.saturating_add(self.sleep_time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunPlan {
    run_id: Uuid,
    jobs: Vec<PlannedJob>,
}

impl RunPlan {
    pub fn new(jobs: Vec<PlannedJob>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            jobs,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn jobs(&self) -> &[PlannedJob] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
