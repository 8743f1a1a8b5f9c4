use std::num::ParseIntError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot find home directory (no HOME environment variable).")]
    NoHomeInEnvironment(),

    #[error("Failed to create root directory {0}")]
    CreateRootDirFailed(PathBuf, #[source] std::io::Error),

    #[error("Failed to read metadata of {0}")]
    ReadMetadataFailed(PathBuf, #[source] std::io::Error),

    #[error("{0} exists but is not a directory")]
    RootNotADirectory(PathBuf),

    #[error("{path} has permissions {actual:o}, requires {required:o}")]
    WrongRootPermissions {
        path: PathBuf,
        actual: u32,
        required: u32,
    },

    #[error("Invalid request timeout '{0}'")]
    InvalidRequestTimeout(String, #[source] ParseIntError),
}
