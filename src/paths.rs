use std::path::{Component, Path, PathBuf};

use crate::error::EditError;

/// Turns user input into an absolute path: `~` expands to the home
/// directory, anything else relative is taken from the working directory.
pub fn resolve(input: &str) -> Result<PathBuf, EditError> {
    let cwd = std::env::current_dir()
        .map_err(|e| EditError::InvalidPath(format!("resolving {input}: {e}")))?;
    resolve_from(input, dirs::home_dir().as_deref(), &cwd)
}

pub fn resolve_from(input: &str, home: Option<&Path>, cwd: &Path) -> Result<PathBuf, EditError> {
    if input.is_empty() {
        return Err(EditError::InvalidPath("empty path".to_string()));
    }

    let path = Path::new(input);
    if path.is_absolute() {
        return Ok(normalize(path));
    }

    if let Some(rest) = input.strip_prefix('~') {
        let home = home.ok_or_else(|| {
            EditError::InvalidPath("getting user home directory: not available".to_string())
        })?;
        return Ok(normalize(&home.join(rest.trim_start_matches('/'))));
    }

    Ok(normalize(&cwd.join(path)))
}

/// Lexically removes `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// True only for an existing non-directory entry.
pub fn file_exists(path: &Path) -> bool {
    path.metadata().is_ok_and(|m| !m.is_dir())
}
