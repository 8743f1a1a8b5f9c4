//! Client-side core of keyward: machine credential provisioning, the daemon
//! request protocol, and the account bootstrap pipeline.
pub mod bootstrap;
pub mod config;
pub mod daemon;
pub mod error;
pub mod id;
pub mod machine;
pub mod secret;
pub mod validation;
