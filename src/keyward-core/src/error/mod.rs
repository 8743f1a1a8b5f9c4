pub mod bootstrap;
pub mod config;
pub mod create_machine;
pub mod daemon_call;
pub mod generate_secret;
pub mod validation;
