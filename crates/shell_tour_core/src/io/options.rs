use std::{
    fmt::{Display, Formatter},
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{Parser, ValueEnum};
use log::LevelFilter;

use crate::{Error, Result, planners::config::PlannerConfig};

/// Command-line options for an experiment run.
#[derive(Clone, Debug, Parser)]
#[command(
    name = "shell-tour",
    about = "Compare multi-goal tour planners over seeded task lists"
)]
pub struct ExperimentOptions {
    /// Planner to evaluate, `<kind>[:key=value,...]`; repeat for several.
    /// Defaults to `shell-path`, `knn` and `random`.
    #[arg(long = "planner", value_parser = parse_planner)]
    pub planners: Vec<PlannerConfig>,
    /// Results file, rewritten on every checkpoint and reloaded on resume.
    #[arg(long, default_value = "results.json")]
    pub results: PathBuf,
    /// Problems generated per scene and target count.
    #[arg(long, default_value_t = 1)]
    pub runs: usize,
    /// Target subset sizes, comma separated.
    #[arg(long, value_delimiter = ',', default_value = "5,10")]
    pub targets: Vec<usize>,
    /// Worker threads; 0 uses one per core.
    #[arg(long, default_value_t = 0)]
    pub workers: usize,
    /// Completed tasks between checkpoints.
    #[arg(long = "batch-size", default_value_t = 8)]
    pub batch_size: usize,
    /// Seed for problem generation and task shuffling.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
    /// Scene JSON file; repeat for several. None means one procedural scene.
    #[arg(long = "scene")]
    pub scenes: Vec<PathBuf>,
    /// Target count of the procedural scene.
    #[arg(long = "scene-targets", default_value_t = 20)]
    pub scene_targets: usize,
    /// Time budget (seconds) of one point-to-point planning call.
    #[arg(long = "ptp-time", default_value_t = 1.0)]
    pub ptp_time: f64,
    /// Time budget (seconds) of one whole planning task.
    #[arg(long = "task-time", default_value_t = 30.0)]
    pub task_time: f64,
    /// End-effector distance (meters) under which a target counts as reached.
    #[arg(long = "goal-radius", default_value_t = 0.05)]
    pub goal_radius: f64,
    /// Minimum end-effector distance (meters) to any obstacle.
    #[arg(long, default_value_t = 0.02)]
    pub clearance: f64,
    /// Structured logging level.
    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
    /// Logging output format.
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
    /// Omit timestamps from log lines.
    #[arg(long = "no-log-timestamp")]
    pub no_log_timestamp: bool,
    /// Optional output file path for logs. Empty or `-` means stderr.
    #[arg(long = "log-output", default_value = "")]
    pub log_output: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum LogLevel {
    Error,
    #[value(alias = "warning")]
    Warn,
    Info,
    Debug,
    Trace,
    Off,
}

impl LogLevel {
    pub fn to_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
            Self::Off => LevelFilter::Off,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Pretty,
}

impl Default for ExperimentOptions {
    fn default() -> Self {
        Self::parse_from(["shell-tour"])
    }
}

impl ExperimentOptions {
    /// Parses the process arguments; `--help` and malformed input exit the
    /// process with clap's usage message.
    pub fn from_args() -> Result<Self> {
        let options = Self::parse();
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.runs == 0 {
            return Err(Error::invalid_input("--runs must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(Error::invalid_input("--batch-size must be at least 1"));
        }
        if self.targets.is_empty() || self.targets.contains(&0) {
            return Err(Error::invalid_input(
                "--targets must list positive subset sizes",
            ));
        }
        for (name, value) in [
            ("ptp-time", self.ptp_time),
            ("task-time", self.task_time),
            ("goal-radius", self.goal_radius),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::invalid_input(format!(
                    "--{name} must be a positive number, got {value}"
                )));
            }
        }
        if !(self.clearance.is_finite() && self.clearance >= 0.0) {
            return Err(Error::invalid_input(format!(
                "--clearance must be non-negative, got {}",
                self.clearance
            )));
        }
        Ok(())
    }

    pub fn planner_configs(&self) -> Vec<PlannerConfig> {
        if !self.planners.is_empty() {
            return self.planners.clone();
        }
        ["shell-path", "knn", "random"]
            .into_iter()
            .filter_map(|spec| spec.parse().ok())
            .collect()
    }

    pub fn ptp_budget(&self) -> Duration {
        Duration::from_secs_f64(self.ptp_time)
    }

    pub fn task_budget(&self) -> Duration {
        Duration::from_secs_f64(self.task_time)
    }

    pub fn log_timestamp(&self) -> bool {
        !self.no_log_timestamp
    }

    pub fn log_output_path(&self) -> Option<&Path> {
        let log_output = self.log_output.trim();
        if log_output.is_empty() || log_output == "-" {
            None
        } else {
            Some(Path::new(log_output))
        }
    }
}

impl Display for ExperimentOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let planners: Vec<String> = self
            .planner_configs()
            .iter()
            .map(ToString::to_string)
            .collect();
        let targets: Vec<String> = self.targets.iter().map(ToString::to_string).collect();
        let scenes: Vec<String> = self
            .scenes
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        write!(
            f,
            "planners=[{}] results={} runs={} targets={} workers={} batch_size={} seed={} \
             scenes=[{}] scene_targets={} ptp_time={} task_time={} goal_radius={} clearance={}",
            planners.join(" "),
            self.results.display(),
            self.runs,
            targets.join(","),
            self.workers,
            self.batch_size,
            self.seed,
            scenes.join(" "),
            self.scene_targets,
            ryu::Buffer::new().format(self.ptp_time),
            ryu::Buffer::new().format(self.task_time),
            ryu::Buffer::new().format(self.goal_radius),
            ryu::Buffer::new().format(self.clearance),
        )
    }
}

fn parse_planner(spec: &str) -> Result<PlannerConfig> {
    spec.parse()
}
