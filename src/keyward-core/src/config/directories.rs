use crate::error::config::ConfigError;
use crate::error::config::ConfigError::{
    CreateRootDirFailed, NoHomeInEnvironment, ReadMetadataFailed, RootNotADirectory,
};
use directories_next::BaseDirs;
use std::path::{Path, PathBuf};

#[cfg(unix)]
const REQUIRED_PERMISSIONS: u32 = 0o700;

pub fn default_root() -> Result<PathBuf, ConfigError> {
    let dirs = BaseDirs::new().ok_or(NoHomeInEnvironment())?;
    Ok(dirs.home_dir().join(".keyward"))
}

/// Creates the root directory if it is missing and checks that it is an
/// owner-only directory.
pub fn ensure_root_dir(root: &Path) -> Result<(), ConfigError> {
    match std::fs::metadata(root) {
        Ok(metadata) if !metadata.is_dir() => return Err(RootNotADirectory(root.to_path_buf())),
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => create_root_dir(root)?,
        Err(err) => return Err(ReadMetadataFailed(root.to_path_buf(), err)),
    }
    check_permissions(root)
}

fn create_root_dir(root: &Path) -> Result<(), ConfigError> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(REQUIRED_PERMISSIONS);
    }
    builder
        .create(root)
        .map_err(|err| CreateRootDirFailed(root.to_path_buf(), err))
}

#[cfg(unix)]
fn check_permissions(root: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;

    let metadata =
        std::fs::metadata(root).map_err(|err| ReadMetadataFailed(root.to_path_buf(), err))?;
    let actual = metadata.permissions().mode() & 0o777;
    if actual != REQUIRED_PERMISSIONS {
        return Err(ConfigError::WrongRootPermissions {
            path: root.to_path_buf(),
            actual,
            required: REQUIRED_PERMISSIONS,
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(_root: &Path) -> Result<(), ConfigError> {
    Ok(())
}
