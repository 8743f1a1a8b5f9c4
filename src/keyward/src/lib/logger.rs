use keyward_core::config::keyward_version;
use slog::{Drain, Level, Logger, KV};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::PathBuf;

/// Where log records go.
pub enum LoggingMode {
    /// Undecorated output to stderr.
    Stderr,

    /// Stderr as above, plus a full copy in a file.
    Tee(PathBuf),

    /// Debug records and up go to a file, whatever the verbosity.
    File(PathBuf),
}

/// Prints the message, prefixed by a label for warnings and errors. At
/// debug and trace the record's own fields follow as `key=value`.
pub struct KeywardFormat<D>
where
    D: slog_term::Decorator,
{
    decorator: D,
}

impl<D: slog_term::Decorator> KeywardFormat<D> {
    pub fn new(decorator: D) -> KeywardFormat<D> {
        KeywardFormat { decorator }
    }
}

fn level_label(level: Level) -> Option<&'static str> {
    match level {
        Level::Critical | Level::Error => Some("error"),
        Level::Warning => Some("warning"),
        Level::Info | Level::Debug | Level::Trace => None,
    }
}

#[derive(Default)]
struct RecordFields(Vec<(String, String)>);

impl slog::Serializer for RecordFields {
    fn emit_arguments(&mut self, key: slog::Key, val: &fmt::Arguments<'_>) -> slog::Result {
        self.0.push((key.to_string(), val.to_string()));
        Ok(())
    }
}

impl<D: slog_term::Decorator> slog::Drain for KeywardFormat<D> {
    type Ok = ();
    type Err = io::Error;

    fn log(
        &self,
        record: &slog::Record<'_>,
        values: &slog::OwnedKVList,
    ) -> Result<Self::Ok, Self::Err> {
        let mut fields = RecordFields::default();
        if matches!(record.level(), Level::Debug | Level::Trace) {
            record
                .kv()
                .serialize(record, &mut fields)
                .map_err(|err| io::Error::other(err.to_string()))?;
        }

        self.decorator.with_record(record, values, |out| {
            if let Some(label) = level_label(record.level()) {
                out.start_level()?;
                write!(out, "{label}:")?;
                out.start_whitespace()?;
                write!(out, " ")?;
            }
            out.start_msg()?;
            write!(out, "{}", record.msg())?;

            for (key, value) in &fields.0 {
                out.start_whitespace()?;
                write!(out, " ")?;
                out.start_key()?;
                write!(out, "{key}")?;
                out.start_separator()?;
                write!(out, "=")?;
                out.start_value()?;
                write!(out, "{value}")?;
            }
            out.reset()?;
            writeln!(out)?;
            out.flush()
        })
    }
}

fn create_drain(mode: LoggingMode) -> io::Result<Logger> {
    Ok(match mode {
        LoggingMode::Stderr => {
            let decorator = slog_term::TermDecorator::new().stderr().build();
            let drain = KeywardFormat::new(decorator).fuse();
            Logger::root(slog_async::Async::new(drain).build().fuse(), slog::o!())
        }
        LoggingMode::File(out) => {
            let file = File::create(out)?;
            let decorator = slog_term::PlainDecorator::new(file);
            let drain = slog_term::FullFormat::new(decorator).build().fuse();
            Logger::root(slog_async::Async::new(drain).build().fuse(), slog::o!())
        }
        LoggingMode::Tee(out) => Logger::root(
            slog::Duplicate::new(
                create_drain(LoggingMode::Stderr)?,
                create_drain(LoggingMode::File(out))?,
            )
            .fuse(),
            slog::o!(),
        ),
    })
}

fn level_for(verbose_level: i64) -> Option<Level> {
    match verbose_level {
        -3 => Some(Level::Critical),
        -2 => Some(Level::Error),
        -1 => Some(Level::Warning),
        0 => Some(Level::Info),
        1 => Some(Level::Debug),
        x if x > 1 => Some(Level::Trace),
        _ => None,
    }
}

/// Creates the root logger. Negative levels are quiet modes: warnings go
/// first, then errors, then everything.
pub fn create_root_logger(verbose_level: i64, mode: LoggingMode) -> io::Result<Logger> {
    let log_level = match level_for(verbose_level) {
        Some(level) => level,
        None => return Ok(Logger::root(slog::Discard, slog::o!())),
    };

    let drain = slog::LevelFilter::new(create_drain(mode)?, log_level).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    Ok(Logger::root(
        drain,
        slog::o!("version" => keyward_version().to_string()),
    ))
}
