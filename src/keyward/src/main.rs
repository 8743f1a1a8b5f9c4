#![allow(special_module_name)]
use crate::lib::environment::{Environment, EnvironmentImpl};
use crate::lib::error::KwResult;
use crate::lib::logger::{create_root_logger, LoggingMode};
use anyhow::{Context, Error};
use clap::{ArgAction, Parser};
use keyward_core::config::Config;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;

mod commands;
mod lib;

/// Client for the keyward secrets daemon.
#[derive(Parser)]
#[command(name = "keyward", version, arg_required_else_help = true)]
pub struct CliOpts {
    /// Displays detailed information about operations. -vv shows every daemon exchange.
    #[arg(long, short, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppresses informational messages. -qq limits to errors only; -qqqq disables them all.
    #[arg(long, short, action = ArgAction::Count, global = true)]
    quiet: u8,

    /// The logging mode to use. You can log to stderr, a file, or both.
    #[arg(long = "log", default_value = "stderr", value_parser = ["stderr", "tee", "file"], global = true)]
    logmode: String,

    /// The file to log to, if logging to a file (see --log).
    #[arg(long, global = true)]
    logfile: Option<String>,

    #[command(subcommand)]
    command: commands::KeywardCommand,
}

/// Builds the root logger from the verbosity and logging flags.
fn setup_logging(opts: &CliOpts) -> KwResult<(i64, slog::Logger)> {
    let verbose_level = opts.verbose as i64 - opts.quiet as i64;
    let logfile = || PathBuf::from(opts.logfile.as_deref().unwrap_or("keyward.log"));

    let mode = match opts.logmode.as_str() {
        "tee" => LoggingMode::Tee(logfile()),
        "file" => LoggingMode::File(logfile()),
        _ => LoggingMode::Stderr,
    };

    let log = create_root_logger(verbose_level, mode).context("Failed to set up logging.")?;
    Ok((verbose_level, log))
}

fn print_error(err: Error) {
    // Falls back to plain output when stderr is not a color terminal.
    let mut colored = term::stderr();

    for (level, cause) in err.chain().enumerate() {
        let (color, prefix) = if level == 0 {
            (term::color::RED, "Error")
        } else {
            (term::color::YELLOW, "Caused by")
        };
        match colored.as_mut() {
            Some(stderr) => {
                let _ = stderr.fg(color);
                let _ = write!(stderr, "{prefix}: ");
                let _ = stderr.reset();
                let _ = writeln!(stderr, "{cause}");
            }
            None => eprintln!("{prefix}: {cause}"),
        }
    }
}

fn inner_main() -> KwResult {
    let cli_opts = CliOpts::parse();

    let (verbose_level, log) = setup_logging(&cli_opts)?;
    let config = Config::load()?;

    let env = EnvironmentImpl::new(config)
        .with_logger(log)
        .with_verbose_level(verbose_level)
        .with_progress(std::io::stderr().is_terminal());

    slog::trace!(
        env.get_logger(),
        "Trace mode enabled. Lots of logs coming up."
    );
    commands::exec(&env, cli_opts.command)
}

fn main() {
    if let Err(err) = inner_main() {
        print_error(err);
        std::process::exit(255);
    }
}
