use std::path::{Path, PathBuf};

use crate::error::InstallerError;

const SYSTEMD_RUNTIME_DIR: &str = "/run/systemd/system";
const DOCKER_MARKER: &str = "/.dockerenv";

/// Checks everything that must hold before the installer touches the
/// system. Returns the path of the running binary, which gets copied into
/// the install directory later.
pub fn check() -> Result<PathBuf, InstallerError> {
    if !cfg!(target_os = "linux") {
        return Err(InstallerError::UnsupportedPlatform);
    }

    if !is_using_systemd() {
        return Err(InstallerError::NoSystemd);
    }

    if is_inside_container() {
        return Err(InstallerError::InsideContainer);
    }

    if !nix::unistd::geteuid().is_root() {
        return Err(InstallerError::NotRoot);
    }

    std::env::current_exe().map_err(InstallerError::CurrentExe)
}

/// systemd creates this directory early at boot; it is absent under any
/// other init system.
pub fn is_using_systemd() -> bool {
    Path::new(SYSTEMD_RUNTIME_DIR).is_dir()
}

pub fn is_inside_container() -> bool {
    Path::new(DOCKER_MARKER).exists()
}
