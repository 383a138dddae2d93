//! Helpers shared by built-in features.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use rigup_core::{
    application::{ApplicationError, Engine},
    error::RigupError,
};
use serde_json::{Map, Value};

pub(crate) fn project_home(engine: &Engine) -> PathBuf {
    engine.config().paths().project_home
}

pub(crate) fn fs_error(path: &Path, operation: &str, e: io::Error) -> RigupError {
    ApplicationError::FilesystemError {
        path: path.to_path_buf(),
        reason: format!("Failed to {operation}: {e}"),
    }
    .into()
}

/// Write `content` unless the file already holds it. Returns whether the
/// file was written.
pub(crate) fn write_if_changed(path: &Path, content: &str) -> Result<bool, RigupError> {
    if fs::read_to_string(path).is_ok_and(|existing| existing == content) {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| fs_error(parent, "create directory", e))?;
    }
    fs::write(path, content).map_err(|e| fs_error(path, "write file", e))?;
    Ok(true)
}

#[cfg(unix)]
pub(crate) fn make_executable(path: &Path) -> Result<(), RigupError> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path).map_err(|e| fs_error(path, "get metadata", e))?;
    let mut perms = metadata.permissions();
    perms.set_mode(perms.mode() | 0o111);
    fs::set_permissions(path, perms).map_err(|e| fs_error(path, "set permissions", e))
}

#[cfg(not(unix))]
pub(crate) fn make_executable(_path: &Path) -> Result<(), RigupError> {
    Ok(())
}

/// Shell-style wildcard match: `*` is any run, `?` any single character.
pub(crate) fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    p = sp + 1;
                    t = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}

/// Quote `arg` for a POSIX shell when needed.
pub(crate) fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@%+,".contains(c));
    if safe {
        arg.to_owned()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Drop nulls so a tree can be rendered as TOML.
pub(crate) fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), strip_nulls(v)))
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .filter(|v| !v.is_null())
                .map(strip_nulls)
                .collect(),
        ),
        other => other.clone(),
    }
}
