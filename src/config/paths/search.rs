//! Upward filesystem search for layer files.

use crate::error::ApiError;
use std::path::{Component, Path, PathBuf};

/// Search upward from `start` for an existing `file_name`.
///
/// Candidates are `start/file_name`, `start/../file_name`, and so on. The
/// search gives up (returns `Ok(None)`) once the candidate would be the
/// filesystem root joined with `file_name`, or, when `stop` is given, once
/// the candidate's directory is the stop directory. Neither of those final
/// candidates is checked.
pub fn search(file_name: &str, start: &Path, stop: Option<&Path>) -> Result<Option<PathBuf>, ApiError> {
    let start = absolute(start);
    let stop = stop.map(absolute);
    let root = filesystem_root(&start);
    let terminal = root.join(file_name);

    let mut dir = start;
    let mut candidate = dir.join(file_name);
    let mut previous: Option<PathBuf> = None;

    loop {
        if previous.as_ref() == Some(&candidate) {
            return Err(ApiError::Discovery(candidate));
        }
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "found config file");
            return Ok(Some(candidate));
        }
        previous = Some(candidate);

        dir = match dir.parent() {
            Some(parent) => parent.to_path_buf(),
            None => dir,
        };
        candidate = dir.join(file_name);

        if candidate == terminal {
            break;
        }
        if stop.as_deref() == Some(dir.as_path()) {
            break;
        }
    }

    tracing::trace!(file = file_name, "config file not found during upward search");
    Ok(None)
}

/// Make `path` absolute and lexically clean without touching the filesystem
/// beyond the current directory lookup.
pub(crate) fn absolute(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut clean = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                clean.pop();
            }
            other => clean.push(other.as_os_str()),
        }
    }
    dunce::simplified(&clean).to_path_buf()
}

fn filesystem_root(path: &Path) -> PathBuf {
    path.ancestors()
        .last()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(std::path::MAIN_SEPARATOR.to_string()))
}
