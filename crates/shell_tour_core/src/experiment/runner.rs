use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use rayon::BroadcastContext;

use crate::{
    Error, Result, Termination,
    experiment::{
        results::{ResultStore, RunRecord},
        tasks::Task,
    },
    planners::ContextFactory,
    shutdown,
};

/// Where and how an experiment runs.
#[derive(Clone, Debug)]
pub struct RunSettings {
    pub results: PathBuf,
    pub batch_size: usize,
    /// Worker threads; 0 lets rayon pick one per core.
    pub workers: usize,
    pub task_budget: Duration,
}

struct CoordinatorState {
    cursor: usize,
    store: ResultStore,
}

/// Owns the task list, the shared claim cursor and the result collection.
///
/// The lock is held for bookkeeping only, never across a planning call.
pub struct ExperimentCoordinator {
    tasks: Vec<Task>,
    batch_size: usize,
    state: Mutex<CoordinatorState>,
}

impl ExperimentCoordinator {
    /// Loads and validates earlier results for `tasks`.
    pub fn start(tasks: Vec<Task>, results: &Path, batch_size: usize) -> Result<Self> {
        let batch_size = batch_size.max(1);
        let store = ResultStore::open(results, &tasks, batch_size)?;
        Ok(Self {
            tasks,
            batch_size,
            state: Mutex::new(CoordinatorState { cursor: 0, store }),
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    fn lock(&self) -> Result<MutexGuard<'_, CoordinatorState>> {
        self.state
            .lock()
            .map_err(|_| Error::other("experiment state lock poisoned"))
    }

    /// Next task without a recorded result, or `None` once the list is
    /// exhausted.
    pub fn claim_next(&self) -> Result<Option<&Task>> {
        let mut state = self.lock()?;
        while state.cursor < self.tasks.len() {
            let index = state.cursor;
            state.cursor += 1;
            if !state.store.is_done(index) {
                return Ok(Some(&self.tasks[index]));
            }
        }
        Ok(None)
    }

    /// Stores a result and rewrites the checkpoint whenever the completed
    /// count reaches a multiple of the batch size.
    pub fn record(&self, record: RunRecord) -> Result<()> {
        let mut state = self.lock()?;
        state.store.insert(record)?;
        if state.store.completed() % self.batch_size == 0 {
            state.store.checkpoint()?;
        }
        Ok(())
    }

    /// Writes the final checkpoint and hands back the results.
    pub fn finish(self) -> Result<ResultStore> {
        let state = self
            .state
            .into_inner()
            .map_err(|_| Error::other("experiment state lock poisoned"))?;
        state.store.checkpoint()?;
        Ok(state.store)
    }
}

/// Mean outcome of one planner over its recorded runs.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannerSummary {
    pub planner: String,
    pub runs: usize,
    pub mean_path_length: f64,
    pub mean_goals_visited: f64,
    pub mean_run_time_seconds: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExperimentSummary {
    pub executed: usize,
    pub interrupted: usize,
    pub failed: usize,
    pub completed: usize,
    pub total: usize,
    pub planners: Vec<PlannerSummary>,
}

#[derive(Clone, Copy, Debug, Default)]
struct WorkerStats {
    executed: usize,
    interrupted: usize,
    failed: usize,
}

enum TaskOutcome {
    Completed(RunRecord),
    Interrupted,
}

/// Runs every task without a recorded result on a pool of workers.
///
/// Ctrl-C stops the workers; tasks cut short by it are not recorded so a
/// resume re-runs them. Integrity errors stop all workers and are returned
/// after the final checkpoint.
pub fn run_experiment(
    tasks: Vec<Task>,
    factory: &dyn ContextFactory,
    settings: &RunSettings,
) -> Result<ExperimentSummary> {
    let cancelled = Arc::new(AtomicBool::new(false));
    shutdown::register_for_interrupt(&cancelled);
    let outcome = run_with_flag(tasks, factory, settings, &cancelled);
    shutdown::unregister_for_interrupt(&cancelled);
    outcome
}

fn run_with_flag(
    tasks: Vec<Task>,
    factory: &dyn ContextFactory,
    settings: &RunSettings,
    cancelled: &Arc<AtomicBool>,
) -> Result<ExperimentSummary> {
    let total = tasks.len();
    let coordinator = ExperimentCoordinator::start(tasks, &settings.results, settings.batch_size)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.workers)
        .thread_name(|idx| format!("worker-{idx}"))
        .build()
        .map_err(|e| Error::other(format!("rayon pool: {e}")))?;

    log::info!(
        "experiment: start tasks={total} workers={} batch_size={} results={}",
        pool.current_num_threads(),
        settings.batch_size,
        settings.results.display()
    );

    let worker_results: Vec<Result<WorkerStats>> = pool.broadcast(|ctx: BroadcastContext<'_>| {
        let stats = worker_loop(ctx.index(), &coordinator, factory, settings, cancelled);
        if let Err(err) = &stats {
            log::error!("experiment.worker: fatal worker={} err={err}", ctx.index());
            cancelled.store(true, Ordering::SeqCst);
        }
        stats
    });

    let store = coordinator.finish()?;

    let mut summary = ExperimentSummary {
        total,
        completed: store.completed(),
        ..ExperimentSummary::default()
    };
    let mut first_error = None;
    for result in worker_results {
        match result {
            Ok(stats) => {
                summary.executed += stats.executed;
                summary.interrupted += stats.interrupted;
                summary.failed += stats.failed;
            }
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
    }
    if let Some(err) = first_error {
        return Err(err);
    }

    summary.planners = summarize(store.records());
    log::info!(
        "experiment: done executed={} interrupted={} failed={} completed={}/{}",
        summary.executed,
        summary.interrupted,
        summary.failed,
        summary.completed,
        summary.total
    );
    for planner in &summary.planners {
        log::info!(
            "experiment.summary: planner={} runs={} mean_length={:.4} mean_goals={:.2} \
             mean_time_s={:.3}",
            planner.planner,
            planner.runs,
            planner.mean_path_length,
            planner.mean_goals_visited,
            planner.mean_run_time_seconds
        );
    }
    Ok(summary)
}

fn worker_loop(
    worker: usize,
    coordinator: &ExperimentCoordinator,
    factory: &dyn ContextFactory,
    settings: &RunSettings,
    cancelled: &Arc<AtomicBool>,
) -> Result<WorkerStats> {
    let mut stats = WorkerStats::default();
    while !cancelled.load(Ordering::SeqCst) {
        let Some(task) = coordinator.claim_next()? else {
            break;
        };
        log::debug!(
            "experiment.task: start worker={worker} index={} planner={} scene={} targets={}",
            task.index,
            task.planner_name,
            task.scene_name(),
            task.target_count()
        );

        match run_task(task, factory, settings.task_budget, cancelled) {
            Ok(TaskOutcome::Completed(record)) => {
                log::info!(
                    "experiment.task: done index={} planner={} visited={}/{} length={:.4} time_s={:.3}",
                    task.index,
                    record.planner_name,
                    record.goals_visited_count,
                    record.target_count,
                    record.final_path_length,
                    record.run_time_seconds
                );
                coordinator.record(record)?;
                stats.executed += 1;
            }
            Ok(TaskOutcome::Interrupted) => {
                log::warn!("experiment.task: interrupted index={} not recorded", task.index);
                stats.interrupted += 1;
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                log::warn!("experiment.task: failed index={} err={err}", task.index);
                stats.failed += 1;
            }
        }
    }
    Ok(stats)
}

fn run_task(
    task: &Task,
    factory: &dyn ContextFactory,
    budget: Duration,
    cancelled: &Arc<AtomicBool>,
) -> Result<TaskOutcome> {
    let problem = &task.problem;
    let termination = Termination::with_flag(Arc::clone(cancelled)).child(budget);
    let mut ctx = factory.context(&problem.scene, problem.seed)?;
    let mut planner = task.planner.allocate();

    let started = Instant::now();
    let result = planner.plan(
        &mut ctx,
        &problem.start,
        &problem.targets,
        &problem.scene,
        &termination,
    )?;
    let elapsed = started.elapsed();

    if termination.is_cancelled() {
        return Ok(TaskOutcome::Interrupted);
    }
    Ok(TaskOutcome::Completed(RunRecord::new(task, &result, elapsed)))
}

fn summarize(records: &[Option<RunRecord>]) -> Vec<PlannerSummary> {
    let mut grouped: BTreeMap<&str, Vec<&RunRecord>> = BTreeMap::new();
    for record in records.iter().flatten() {
        grouped.entry(record.planner_name.as_str()).or_default().push(record);
    }
    grouped
        .into_iter()
        .map(|(planner, runs)| {
            let n = runs.len() as f64;
            PlannerSummary {
                planner: planner.to_string(),
                runs: runs.len(),
                mean_path_length: runs.iter().map(|r| r.final_path_length).sum::<f64>() / n,
                mean_goals_visited: runs.iter().map(|r| r.goals_visited_count as f64).sum::<f64>()
                    / n,
                mean_run_time_seconds: runs.iter().map(|r| r.run_time_seconds).sum::<f64>() / n,
            }
        })
        .collect()
}
