use crate::args;

use args::{INSTANCE_NAME, LOG_LEVEL, VERBOSITY};
use clap::ArgMatches;
use slog::{o, Drain, Level, Logger, OwnedKVList, Record};
use slog_async::Async;
use slog_term::{CompactFormat, TermDecorator};
use std::{fmt::Display, result::Result};

#[derive(Clone)]
struct FallbackToStderr<D: Drain> {
    drain: D,
}

impl<D: Drain> Drain for FallbackToStderr<D>
where
    D::Err: Display,
{
    type Ok = ();
    type Err = ();
    fn log(&self, record: &Record, logger_values: &OwnedKVList) -> Result<(), ()> {
        if let Err(err) = self.drain.log(record, logger_values) {
            eprint!("A drain could not log to its destination: {}", err);
        }
        Ok(())
    }

    #[inline]
    fn is_enabled(&self, level: Level) -> bool {
        self.drain.is_enabled(level)
    }
}

pub fn create_logger(arg_matches: &ArgMatches) -> Result<Logger, String> {
    let min_log_level = min_log_level(arg_matches)?;

    let decorator = TermDecorator::new().build();
    let term_drain = CompactFormat::new(decorator)
        .build()
        .map(|drain| FallbackToStderr { drain })
        .filter_level(min_log_level)
        .fuse();

    let drain = Async::new(term_drain).build().fuse();
    let instance_name = arg_matches.value_of(INSTANCE_NAME).unwrap_or(crate::app::NAME).to_string();
    Ok(Logger::root(drain, o!("instance" => instance_name)))
}

fn min_log_level(arg_matches: &ArgMatches) -> Result<Level, String> {
    let from_verbosity = match arg_matches.occurrences_of(VERBOSITY) {
        0 => Level::Warning,
        1 => Level::Info,
        2 => Level::Debug,
        _ => Level::Trace,
    };

    match arg_matches.value_of(LOG_LEVEL) {
        Some(level) => Ok(
            match level
                .parse::<args::LogLevelType>()
                .map_err(|e| format!("invalid log level {:?}: {}", level, e))?
            {
                args::LogLevelType::error => Level::Error,
                args::LogLevelType::warn => Level::Warning,
                args::LogLevelType::info => Level::Info,
                args::LogLevelType::debug => Level::Debug,
                args::LogLevelType::trace => Level::Trace,
            },
        ),
        None => Ok(from_verbosity),
    }
}
