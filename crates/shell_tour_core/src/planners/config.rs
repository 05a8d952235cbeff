use std::{
    fmt::{Display, Formatter},
    str::FromStr,
    time::Duration,
};

use crate::{
    Error, Result,
    ordering::{heuristics::HeuristicKind, strategy::OrderingStrategyKind},
    planners::{
        MultiGoalPlanner, knn::KnnPlanner, ordered::OrderedPlanner, prm::MultiGoalPrm,
        random_order::RandomOrderPlanner, shell_path::ShellPathPlanner,
    },
    shell::EnclosingSphereBuilder,
};

/// Clearance added around the scene when building the enclosing shell.
pub const SHELL_PADDING: f64 = 0.25;

/// A planner selection as written on the command line:
/// `<kind>[:key=value[,key=value]*]`.
#[derive(Clone, Debug, PartialEq)]
pub enum PlannerConfig {
    ShellPath {
        optimize_approaches: bool,
        optimize_segments: bool,
    },
    Knn {
        k: usize,
        union: bool,
    },
    Random {
        seed: u64,
    },
    Ordered {
        strategy: OrderingStrategyKind,
        heuristic: HeuristicKind,
        optimize_segments: bool,
    },
    Prm {
        build_time: Duration,
        samples_per_goal: usize,
        roadmap_size: usize,
        optimize_segments: bool,
        seed: u64,
    },
}

impl PlannerConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ShellPath { .. } => "shell-path",
            Self::Knn { .. } => "knn",
            Self::Random { .. } => "random",
            Self::Ordered { .. } => "ordered",
            Self::Prm { .. } => "prm",
        }
    }

    /// A fresh planner; planners hold no state across tasks.
    pub fn allocate(&self) -> Box<dyn MultiGoalPlanner> {
        match *self {
            Self::ShellPath {
                optimize_approaches,
                optimize_segments,
            } => Box::new(ShellPathPlanner::new(
                Box::new(EnclosingSphereBuilder::new(SHELL_PADDING)),
                optimize_approaches,
                optimize_segments,
            )),
            Self::Knn { k, union } => Box::new(KnnPlanner::new(k, union)),
            Self::Random { seed } => Box::new(RandomOrderPlanner::new(seed)),
            Self::Ordered {
                strategy,
                heuristic,
                optimize_segments,
            } => Box::new(OrderedPlanner::new(strategy, heuristic, optimize_segments)),
            Self::Prm {
                build_time,
                samples_per_goal,
                roadmap_size,
                optimize_segments,
                seed,
            } => Box::new(MultiGoalPrm::new(
                build_time,
                samples_per_goal,
                roadmap_size,
                optimize_segments,
                seed,
            )),
        }
    }

    fn default_for(kind: &str) -> Result<Self> {
        match kind {
            "shell-path" | "shell" => Ok(Self::ShellPath {
                optimize_approaches: true,
                optimize_segments: true,
            }),
            "knn" => Ok(Self::Knn { k: 1, union: false }),
            "random" => Ok(Self::Random { seed: 0 }),
            "ordered" => Ok(Self::Ordered {
                strategy: OrderingStrategyKind::Routing,
                heuristic: HeuristicKind::Euclidean,
                optimize_segments: false,
            }),
            "prm" => Ok(Self::Prm {
                build_time: Duration::from_secs(1),
                samples_per_goal: 3,
                roadmap_size: 1_000,
                optimize_segments: true,
                seed: 0,
            }),
            other => Err(Error::invalid_input(format!(
                "unknown planner kind: {other} (expected shell-path|knn|random|ordered|prm)"
            ))),
        }
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let kind = self.kind();
        match (self, key) {
            (
                Self::ShellPath {
                    optimize_approaches,
                    ..
                },
                "optimize_approaches",
            ) => *optimize_approaches = parse_bool(kind, key, value)?,
            (
                Self::ShellPath {
                    optimize_segments, ..
                }
                | Self::Ordered {
                    optimize_segments, ..
                }
                | Self::Prm {
                    optimize_segments, ..
                },
                "optimize_segments",
            ) => *optimize_segments = parse_bool(kind, key, value)?,
            (Self::Knn { k, .. }, "k") => {
                *k = parse_value(kind, key, value)?;
                if *k == 0 {
                    return Err(Error::invalid_input("knn k must be at least 1"));
                }
            }
            (Self::Knn { union, .. }, "union") => *union = parse_bool(kind, key, value)?,
            (Self::Random { seed } | Self::Prm { seed, .. }, "seed") => {
                *seed = parse_value(kind, key, value)?
            }
            (Self::Ordered { strategy, .. }, "strategy") => *strategy = value.parse()?,
            (Self::Ordered { heuristic, .. }, "heuristic") => *heuristic = value.parse()?,
            (Self::Prm { build_time, .. }, "build_time") => {
                let secs: f64 = parse_value(kind, key, value)?;
                *build_time = Duration::try_from_secs_f64(secs).map_err(|_| {
                    Error::invalid_input(format!("invalid {kind} build_time: {value}"))
                })?;
            }
            (
                Self::Prm {
                    samples_per_goal, ..
                },
                "samples_per_goal",
            ) => *samples_per_goal = parse_value(kind, key, value)?,
            (Self::Prm { roadmap_size, .. }, "roadmap_size") => {
                *roadmap_size = parse_value(kind, key, value)?
            }
            (_, other) => {
                return Err(Error::invalid_input(format!(
                    "unknown key for planner {kind}: {other}"
                )));
            }
        }
        Ok(())
    }
}

impl FromStr for PlannerConfig {
    type Err = Error;

    fn from_str(spec: &str) -> Result<Self> {
        let (kind, rest) = match spec.trim().split_once(':') {
            Some((kind, rest)) => (kind, Some(rest)),
            None => (spec.trim(), None),
        };
        let mut config = Self::default_for(&kind.to_ascii_lowercase())?;
        for pair in rest.into_iter().flat_map(|r| r.split(',')) {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let Some((key, value)) = pair.split_once('=') else {
                return Err(Error::invalid_input(format!(
                    "planner option must be key=value: {pair}"
                )));
            };
            config.apply(key.trim(), value.trim())?;
        }
        Ok(config)
    }
}

impl Display for PlannerConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:", self.kind())?;
        match self {
            Self::ShellPath {
                optimize_approaches,
                optimize_segments,
            } => write!(
                f,
                "optimize_approaches={optimize_approaches},optimize_segments={optimize_segments}"
            ),
            Self::Knn { k, union } => write!(f, "k={k},union={union}"),
            Self::Random { seed } => write!(f, "seed={seed}"),
            Self::Ordered {
                strategy,
                heuristic,
                optimize_segments,
            } => write!(
                f,
                "strategy={strategy},heuristic={heuristic},optimize_segments={optimize_segments}"
            ),
            Self::Prm {
                build_time,
                samples_per_goal,
                roadmap_size,
                optimize_segments,
                seed,
            } => write!(
                f,
                "build_time={},samples_per_goal={samples_per_goal},roadmap_size={roadmap_size},\
                 optimize_segments={optimize_segments},seed={seed}",
                build_time.as_secs_f64()
            ),
        }
    }
}

fn parse_value<T: FromStr>(kind: &str, key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::invalid_input(format!("invalid {kind} {key}: {value}")))
}

fn parse_bool(kind: &str, key: &str, value: &str) -> Result<bool> {
    match value {
        "1" | "true" | "TRUE" | "True" | "yes" | "YES" | "on" | "ON" => Ok(true),
        "0" | "false" | "FALSE" | "False" | "no" | "NO" | "off" | "OFF" => Ok(false),
        _ => Err(Error::invalid_input(format!(
            "invalid boolean for {kind} {key}: {value} (expected true/false)"
        ))),
    }
}
