//! Static configuration for the client, built once at startup and passed
//! explicitly to everything that needs it.
use crate::error::config::ConfigError;
use semver::Version;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod directories;

pub const API_VERSION: &str = "0.1.0";
pub const ROOT_ENV_VAR: &str = "KEYWARD_ROOT";
pub const DEBUG_ENV_VAR: &str = "KEYWARD_DEBUG";
pub const REQUEST_TIMEOUT_ENV_VAR: &str = "KEYWARD_REQUEST_TIMEOUT";

lazy_static::lazy_static! {
    static ref VERSION: Version = Version::parse(env!("CARGO_PKG_VERSION"))
        .expect("Cannot parse crate version");
    static ref API: Version = Version::parse(API_VERSION).expect("Cannot parse API version");
}

pub fn keyward_version() -> &'static Version {
    &VERSION
}

#[derive(Clone, Debug)]
pub struct Config {
    version: Version,
    api_version: Version,

    root: PathBuf,
    socket_path: PathBuf,

    /// Skip invite code collection during signup. Debug builds of the
    /// registry accept signups without one.
    skip_invite_code: bool,
    request_timeout: Option<Duration>,
}

impl Config {
    /// Builds a configuration rooted at `root` without consulting the
    /// environment or the filesystem.
    pub fn new(root: PathBuf) -> Self {
        Config {
            version: keyward_version().clone(),
            api_version: API.clone(),
            socket_path: root.join("daemon.socket"),
            root,
            skip_invite_code: false,
            request_timeout: None,
        }
    }

    /// Resolves and prepares the root directory, then reads the debug and
    /// timeout settings from the environment. The environment is not
    /// consulted again after this returns.
    pub fn load() -> Result<Self, ConfigError> {
        let root = match std::env::var_os(ROOT_ENV_VAR) {
            Some(root) if !root.is_empty() => PathBuf::from(root),
            _ => directories::default_root()?,
        };
        directories::ensure_root_dir(&root)?;

        let skip_invite_code = std::env::var_os(DEBUG_ENV_VAR).is_some_and(|v| !v.is_empty());
        let request_timeout = match std::env::var(REQUEST_TIMEOUT_ENV_VAR) {
            Ok(value) => parse_timeout(&value)?,
            Err(_) => None,
        };

        Ok(Config::new(root)
            .with_skip_invite_code(skip_invite_code)
            .with_request_timeout(request_timeout))
    }

    pub fn with_skip_invite_code(mut self, skip: bool) -> Self {
        self.skip_invite_code = skip;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn api_version(&self) -> &Version {
        &self.api_version
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn skip_invite_code(&self) -> bool {
        self.skip_invite_code
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }
}

fn parse_timeout(value: &str) -> Result<Option<Duration>, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let seconds: u64 = value
        .parse()
        .map_err(|err| ConfigError::InvalidRequestTimeout(value.to_string(), err))?;
    Ok(if seconds == 0 {
        None
    } else {
        Some(Duration::from_secs(seconds))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_derive_from_root() {
        let config = Config::new(PathBuf::from("/home/jo/.keyward"));
        assert_eq!(
            config.socket_path(),
            Path::new("/home/jo/.keyward/daemon.socket")
        );
        assert!(!config.skip_invite_code());
        assert_eq!(config.api_version().to_string(), API_VERSION);
    }

    #[test]
    fn timeout_parsing() {
        assert_eq!(parse_timeout("").unwrap(), None);
        assert_eq!(parse_timeout("0").unwrap(), None);
        assert_eq!(
            parse_timeout(" 30 ").unwrap(),
            Some(Duration::from_secs(30))
        );
        assert!(matches!(
            parse_timeout("soon"),
            Err(ConfigError::InvalidRequestTimeout(..))
        ));
    }
}
