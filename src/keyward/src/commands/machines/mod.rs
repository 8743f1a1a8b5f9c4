use crate::lib::environment::Environment;
use crate::lib::error::KwResult;
use clap::{Parser, Subcommand};

mod create;

/// Manages machine identities: non-human accounts that authenticate with a token secret.
#[derive(Parser)]
pub struct MachinesOpts {
    #[command(subcommand)]
    subcmd: SubCommand,
}

#[derive(Subcommand)]
enum SubCommand {
    Create(create::CreateMachineOpts),
}

pub fn exec(env: &dyn Environment, opts: MachinesOpts) -> KwResult {
    match opts.subcmd {
        SubCommand::Create(v) => create::exec(env, v),
    }
}
