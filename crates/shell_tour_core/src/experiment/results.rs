use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, PlanResult, Result, experiment::tasks::Task};

/// Outcome of one task as persisted in the results file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub task_index: usize,
    pub run_time_seconds: f64,
    pub final_path_length: f64,
    pub goals_visited_count: usize,
    pub planner_name: String,
    pub planner_parameters: Value,
    pub scene_name: String,
    pub target_count: usize,
}

impl RunRecord {
    pub fn new(task: &Task, result: &PlanResult, elapsed: Duration) -> Self {
        Self {
            task_index: task.index,
            run_time_seconds: elapsed.as_secs_f64(),
            final_path_length: result.length(),
            goals_visited_count: result.goals_visited(),
            planner_name: task.planner_name.clone(),
            planner_parameters: task.planner_parameters.clone(),
            scene_name: task.scene_name().to_string(),
            target_count: task.target_count(),
        }
    }

    /// Whether this record was produced by `task`, judged on the fields
    /// that identify a task.
    pub fn matches(&self, task: &Task) -> bool {
        self.task_index == task.index
            && self.planner_name == task.planner_name
            && self.planner_parameters == task.planner_parameters
            && self.scene_name == task.scene_name()
            && self.target_count == task.target_count()
    }
}

/// Indexed result collection backed by a JSON array file (`null` = not run).
#[derive(Debug)]
pub struct ResultStore {
    path: PathBuf,
    records: Vec<Option<RunRecord>>,
}

impl ResultStore {
    /// Loads previous results from `path` and checks them against the
    /// regenerated task list. A missing file starts an empty collection.
    pub fn open(path: &Path, tasks: &[Task], batch_size: usize) -> Result<Self> {
        let mut records = if path.exists() {
            let file = File::open(path)?;
            let records: Vec<Option<RunRecord>> = serde_json::from_reader(BufReader::new(file))
                .map_err(|e| {
                    Error::corruption(format!("{} is not a results file: {e}", path.display()))
                })?;
            validate(&records, tasks, batch_size)?;
            records
        } else {
            Vec::new()
        };
        records.resize(tasks.len(), None);

        let store = Self {
            path: path.to_path_buf(),
            records,
        };
        log::info!(
            "results.open: path={} tasks={} completed={}",
            store.path.display(),
            tasks.len(),
            store.completed()
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[Option<RunRecord>] {
        &self.records
    }

    pub fn is_done(&self, index: usize) -> bool {
        self.records.get(index).is_some_and(Option::is_some)
    }

    pub fn completed(&self) -> usize {
        self.records.iter().filter(|r| r.is_some()).count()
    }

    pub fn insert(&mut self, record: RunRecord) -> Result<()> {
        let index = record.task_index;
        let slot = self.records.get_mut(index).ok_or_else(|| {
            Error::invariant(format!("result for task {index} is outside the task list"))
        })?;
        if slot.is_some() {
            return Err(Error::invariant(format!("task {index} was recorded twice")));
        }
        *slot = Some(record);
        Ok(())
    }

    /// Rewrites the whole file through a temporary sibling and a rename.
    pub fn checkpoint(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, &self.records)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        log::debug!(
            "results.checkpoint: path={} completed={}",
            self.path.display(),
            self.completed()
        );
        Ok(())
    }
}

fn validate(records: &[Option<RunRecord>], tasks: &[Task], batch_size: usize) -> Result<()> {
    let len = records.len();
    if len > tasks.len() || (len != tasks.len() && len % batch_size.max(1) != 0) {
        return Err(Error::corruption(format!(
            "results hold {len} entries for {} tasks with batch size {batch_size}",
            tasks.len()
        )));
    }
    for (index, record) in records.iter().enumerate() {
        let Some(record) = record else {
            continue;
        };
        if !record.matches(&tasks[index]) {
            return Err(Error::corruption(format!(
                "entry {index} ({} on {} with {} targets) does not match task {} ({} on {} with {} \
                 targets)",
                record.planner_name,
                record.scene_name,
                record.target_count,
                tasks[index].index,
                tasks[index].planner_name,
                tasks[index].scene_name(),
                tasks[index].target_count()
            )));
        }
    }
    Ok(())
}
