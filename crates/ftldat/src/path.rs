//! Entry name helpers and size formatting.
//!
//! Entry names are `/`-separated on every platform, the way the game
//! expects them.

use crate::{FtlDatError, Result};
use std::path::{Component, Path};

/// Separator between name components.
pub const SEPARATOR: char = '/';

/// Split an entry name into its components.
pub fn split(name: &str) -> Vec<&str> {
    name.split(SEPARATOR).collect()
}

/// Join components into an entry name.
pub fn join<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut name = String::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            name.push(SEPARATOR);
        }
        name.push_str(part.as_ref());
    }
    name
}

/// Split a raw entry name into components safe to use as a relative path.
///
/// Rejects names that are not UTF-8 or that contain empty, `.` or `..`
/// components.
pub fn checked_split(name: &[u8]) -> Result<Vec<&str>> {
    let name = std::str::from_utf8(name).map_err(|_| {
        FtlDatError::InvalidName(format!("{} is not UTF-8", String::from_utf8_lossy(name)))
    })?;

    let parts = split(name);
    if let Some(bad) = parts
        .iter()
        .find(|part| part.is_empty() || **part == "." || **part == "..")
    {
        return Err(FtlDatError::InvalidName(format!(
            "{name} has a {bad:?} component"
        )));
    }
    Ok(parts)
}

/// Build an entry name from a filesystem path.
///
/// Root, prefix and `.` components are dropped; `..` and non-UTF-8
/// components are rejected.
pub fn name_from_path(path: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| {
                    FtlDatError::InvalidName(format!("{} is not UTF-8", path.display()))
                })?;
                parts.push(part);
            }
            Component::ParentDir => {
                return Err(FtlDatError::InvalidName(format!(
                    "{} leaves its base directory",
                    path.display()
                )));
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    if parts.is_empty() {
        return Err(FtlDatError::InvalidName(format!(
            "{} has no file name",
            path.display()
        )));
    }
    Ok(join(parts))
}

/// Format a byte count for humans: `"12 B"`, `"12 KiB"` and so on.
///
/// Each step divides by 1024 (rounding down) while the value is above 1024.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];

    let mut value = bytes;
    for unit in UNITS {
        if value <= 1024 {
            return format!("{value} {unit}");
        }
        value /= 1024;
    }
    format!("{value} TiB")
}
