pub mod environment;
pub mod error;
pub mod interrupt;
pub mod logger;
pub mod progress_bar;
pub mod prompt;
