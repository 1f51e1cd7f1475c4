//! Path helpers for project and solution files
//!
//! Both file formats store paths with Windows separators regardless of the
//! platform the tool runs on, so every path written into a descriptor goes
//! through [`normalize`].

use std::path::{Component, Path, PathBuf};

/// Separator used inside .csproj and .sln files
pub const FILE_SEPARATOR: char = '\\';

/// Replace every forward slash with a backslash
pub fn normalize(path: &str) -> String {
    path.replace('/', "\\")
}

/// Convert a stored (backslash) path into a path usable on the host filesystem
pub fn to_native(path: &str) -> PathBuf {
    if std::path::MAIN_SEPARATOR == FILE_SEPARATOR {
        PathBuf::from(path)
    } else {
        PathBuf::from(path.replace(FILE_SEPARATOR, std::path::MAIN_SEPARATOR_STR))
    }
}

/// Compute `target` relative to the directory `base_dir`.
///
/// Both paths are lexically cleaned first (`.` removed, `..` folded into the
/// previous segment). The result walks up with `..` as often as needed, so
/// sibling and parent trees are reachable, and always uses backslashes with
/// no leading separator.
pub fn relative_from(base_dir: &Path, target: &Path) -> String {
    let base = clean(base_dir);
    let target = clean(target);

    let base_parts: Vec<Component> = base.components().collect();
    let target_parts: Vec<Component> = target.components().collect();

    let common = base_parts
        .iter()
        .zip(target_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = Vec::new();
    for part in &base_parts[common..] {
        if matches!(part, Component::Normal(_)) {
            segments.push("..".to_string());
        }
    }
    for part in &target_parts[common..] {
        match part {
            Component::Normal(name) => segments.push(name.to_string_lossy().into_owned()),
            Component::ParentDir => segments.push("..".to_string()),
            _ => {}
        }
    }

    segments
        .join("\\")
        .trim_start_matches(['\\', '/'])
        .to_string()
}

/// Lexically resolve `.` and `..` without touching the filesystem
pub fn clean(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    result.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    result.pop();
                } else if !result.has_root() {
                    result.push("..");
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

/// Join `path` onto `base` unless it is already absolute, then clean it
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        clean(path)
    } else {
        clean(&base.join(path))
    }
}

/// Final path segment of a token that may use either separator style
pub fn file_name(token: &str) -> &str {
    token.rsplit(['\\', '/']).next().unwrap_or(token)
}
