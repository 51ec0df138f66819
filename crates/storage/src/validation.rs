use filedrop_protocol::constants::PATH_SEPARATOR;

use crate::StorageError;

/// Validates an object path of the form `<owner>/<file>`.
///
/// Rejects:
/// - Empty paths or empty segments (`u1//a`, `u1/`)
/// - Absolute paths (`/u1/a`)
/// - Anything deeper than one folder (`u1/sub/a`)
/// - `.` and `..` segments
/// - Backslashes and NUL bytes
pub fn validate_object_path(path: &str) -> Result<(), StorageError> {
    if path.is_empty() {
        return Err(StorageError::InvalidPath("empty path".into()));
    }
    if path.starts_with(PATH_SEPARATOR) {
        return Err(StorageError::InvalidPath(format!(
            "absolute path not allowed: {path}"
        )));
    }

    let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
    if segments.len() != 2 {
        return Err(StorageError::InvalidPath(format!(
            "expected <owner>/<file>: {path}"
        )));
    }
    for segment in segments {
        validate_segment(segment, path)?;
    }

    Ok(())
}

/// Validates an owner folder name (a single path segment).
pub fn validate_owner_folder(owner_folder: &str) -> Result<(), StorageError> {
    if owner_folder.is_empty() {
        return Err(StorageError::InvalidPath("empty owner folder".into()));
    }
    if owner_folder.contains(PATH_SEPARATOR) {
        return Err(StorageError::InvalidPath(format!(
            "owner folder must be a single segment: {owner_folder}"
        )));
    }
    validate_segment(owner_folder, owner_folder)
}

fn validate_segment(segment: &str, path: &str) -> Result<(), StorageError> {
    match segment {
        "" => Err(StorageError::InvalidPath(format!("empty segment: {path}"))),
        "." | ".." => Err(StorageError::InvalidPath(format!(
            "relative segment not allowed: {path}"
        ))),
        s if s.contains('\\') || s.contains('\0') => Err(StorageError::InvalidPath(format!(
            "illegal character in path: {path}"
        ))),
        _ => Ok(()),
    }
}
