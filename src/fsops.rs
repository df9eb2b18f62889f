use std::{
    fs::{self, DirBuilder, File, OpenOptions, Permissions},
    io::{self, Write},
    os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt},
    path::Path,
};

use crate::{error::InstallerError, paths::file_exists};

fn fs_error<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> InstallerError + 'a {
    move |source| InstallerError::Fs {
        action,
        path: path.display().to_string(),
        source,
    }
}

/// Creates `path` and its missing parents. Returns `false` when the
/// directory already exists; anything else in its place is an error.
pub fn ensure_dir(path: &Path, mode: u32) -> Result<bool, InstallerError> {
    if path.is_dir() {
        log::debug!("{} already exists", path.display());
        return Ok(false);
    }
    if path.exists() {
        return Err(fs_error("creating directory", path)(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "path exists and is not a directory",
        )));
    }

    DirBuilder::new()
        .recursive(true)
        .mode(mode)
        .create(path)
        .map_err(fs_error("creating directory", path))?;
    log::debug!("created directory {}", path.display());
    Ok(true)
}

/// Writes `contents` to `path` unless a file is already there. An existing
/// file is left untouched, whatever it contains. The parent must exist.
pub fn create_file_if_absent(path: &Path, contents: &[u8], mode: u32) -> Result<bool, InstallerError> {
    if file_exists(path) {
        log::debug!("keeping existing {}", path.display());
        return Ok(false);
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)
        .map_err(fs_error("creating file", path))?;
    file.write_all(contents)
        .map_err(fs_error("writing to file", path))?;
    // The umask may have narrowed the mode given to open().
    file.set_permissions(Permissions::from_mode(mode))
        .map_err(fs_error("setting permissions on", path))?;
    log::debug!("wrote {} ({} bytes)", path.display(), contents.len());
    Ok(true)
}

/// Copies `src` over `dest`, replacing whatever is there. The copy goes to a
/// sibling file first and is renamed into place, so a running binary at
/// `dest` is replaced rather than written into.
pub fn copy_file(src: &Path, dest: &Path, mode: u32) -> Result<(), InstallerError> {
    let mut staging = dest.as_os_str().to_owned();
    staging.push(".new");
    let staging = Path::new(&staging);

    let result = (|| {
        let mut reader = File::open(src).map_err(fs_error("opening", src))?;
        let mut writer = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(mode)
            .open(staging)
            .map_err(fs_error("creating file", staging))?;
        io::copy(&mut reader, &mut writer).map_err(fs_error("copying to", staging))?;
        writer
            .set_permissions(Permissions::from_mode(mode))
            .map_err(fs_error("setting permissions on", staging))?;
        fs::rename(staging, dest).map_err(fs_error("replacing", dest))
    })();

    if result.is_err() {
        let _ = fs::remove_file(staging);
    }
    result
}
