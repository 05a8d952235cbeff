//! `env_logger` backend for the experiment binary.

use std::{env, fs::File, io::Write, thread};

use env_logger::{Builder, Target, fmt::Formatter};
use log::{Level, Record};

use crate::io::options::{ExperimentOptions, LogFormat};
use crate::{Error, Result};

/// Per-module overrides on top of `--log-level`, in `env_logger` filter
/// syntax (e.g. `shell_tour_core::planners=trace,route_solver=off`).
pub const LOG_FILTER_ENV: &str = "SHELL_TOUR_LOG";

pub fn init_logger(options: &ExperimentOptions) -> Result<()> {
    let log_format = options.log_format;
    let log_timestamp = options.log_timestamp();

    let mut builder = Builder::new();
    builder
        .filter_level(options.log_level.to_filter())
        .write_style(env_logger::WriteStyle::Never)
        .format(move |buf: &mut Formatter, record| {
            if log_timestamp {
                write!(buf, "{} ", buf.timestamp_millis())?;
            }
            writeln!(buf, "{}", render(log_format, record))
        });

    if let Ok(filters) = env::var(LOG_FILTER_ENV) {
        builder.parse_filters(&filters);
    }

    if let Some(log_path) = options.log_output_path() {
        let log_file = File::create(log_path).map_err(|e| {
            Error::other(format!(
                "failed to create log output file {}: {e}",
                log_path.display()
            ))
        })?;
        builder.target(Target::Pipe(Box::new(log_file)));
    } else {
        builder.target(Target::Stderr);
    }

    builder
        .try_init()
        .map_err(|e| Error::other(format!("logger init failed: {e}")))
}

/// Compact lines carry level and message; pretty lines add the module and
/// the worker thread so interleaved task logs can be told apart.
fn render(format: LogFormat, record: &Record<'_>) -> String {
    match format {
        LogFormat::Compact => format!("{} {}", level_tag(record.level()), record.args()),
        LogFormat::Pretty => format!(
            "{} [{}] ({}) {}",
            level_tag(record.level()),
            record.target(),
            thread::current().name().unwrap_or("main"),
            record.args()
        ),
    }
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

#[cfg(test)]
mod tests {
    use log::{Level, Record};

    use super::render;
    use crate::io::options::LogFormat;

    #[test]
    fn compact_lines_hold_level_and_message() {
        let line = render(
            LogFormat::Compact,
            &Record::builder()
                .level(Level::Info)
                .target("shell_tour_core::planners")
                .args(format_args!("shell.plan: done segments=3"))
                .build(),
        );
        assert_eq!(line, "INFO shell.plan: done segments=3");
    }

    #[test]
    fn pretty_lines_add_module_and_thread() {
        let line = render(
            LogFormat::Pretty,
            &Record::builder()
                .level(Level::Warn)
                .target("shell_tour_core::experiment")
                .args(format_args!("experiment.tasks: clamped"))
                .build(),
        );
        assert!(line.starts_with("WARN [shell_tour_core::experiment] ("));
        assert!(line.ends_with(") experiment.tasks: clamped"));
    }
}
