use crate::lib::environment::Environment;
use crate::lib::error::KwResult;
use clap::Subcommand;

mod machines;
mod signup;

#[derive(Subcommand)]
pub enum KeywardCommand {
    Signup(signup::SignupOpts),
    Machines(machines::MachinesOpts),
}

pub fn exec(env: &dyn Environment, cmd: KeywardCommand) -> KwResult {
    match cmd {
        KeywardCommand::Signup(v) => signup::exec(env, v),
        KeywardCommand::Machines(v) => machines::exec(env, v),
    }
}
