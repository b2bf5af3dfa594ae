use std::{
    path::{Component, Path, PathBuf},
    time::{Duration, SystemTime},
};

use rustix::fs::{stat, Stat};

/// Converts a (seconds, nanoseconds) pair as found in a stat buffer into a SystemTime.
///
/// Times before the epoch are supported, since some cameras record them.
pub fn system_time(sec: i64, nsec: i64) -> SystemTime {
    let nsec = Duration::from_nanos(nsec.clamp(0, 999_999_999) as u64);
    if sec >= 0 {
        SystemTime::UNIX_EPOCH + Duration::from_secs(sec as u64) + nsec
    } else {
        SystemTime::UNIX_EPOCH - Duration::from_secs(sec.unsigned_abs()) + nsec
    }
}

/// The modification time recorded in a stat buffer.
pub fn stat_mtime(st: &Stat) -> SystemTime {
    system_time(st.st_mtime as i64, st.st_mtime_nsec as i64)
}

/// Stats `path` and returns its modification time.
pub fn file_mtime(path: &Path) -> rustix::io::Result<SystemTime> {
    Ok(stat_mtime(&stat(path)?))
}

/// Removes `.` and `..` components without touching the filesystem.  `..` at the root stays at
/// the root; leading `..` of a relative path are kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(normalized.components().next_back(), Some(Component::Normal(_))) {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Formats a byte count for humans, eg. "1.2 KB".  Uses binary multiples, trims trailing zeros.
pub fn human_size(nbytes: u64) -> String {
    const SUFFIXES: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

    let mut rank = 0;
    let mut value = nbytes as f64;
    while value >= 1024.0 && rank < SUFFIXES.len() - 1 {
        value /= 1024.0;
        rank += 1;
    }

    let formatted = format!("{value:.1}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", SUFFIXES[rank])
}

#[cfg(test)]
mod test {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(1), "1 B");
        assert_eq!(human_size(1023), "1023 B");
        assert_eq!(human_size(1024), "1 KB");
        assert_eq!(human_size(1229), "1.2 KB");
        assert_eq!(human_size(5 * 1024 * 1024), "5 MB");
        assert_eq!(human_size(u64::MAX), "16384 PB");
    }

    #[test]
    fn test_normalize_path() {
        for (path, expected) in [
            ("/a/b/..", "/a"),
            ("/a/./b/.", "/a/b"),
            ("/a/b/../../..", "/"),
            ("/a/../b/c/../d", "/b/d"),
            ("a/..", ""),
            ("../a", "../a"),
            ("./..", ".."),
        ] {
            assert_eq!(normalize_path(Path::new(path)), Path::new(expected), "{path}");
        }
    }

    #[test]
    fn test_system_time() {
        assert_eq!(system_time(0, 0), SystemTime::UNIX_EPOCH);
        assert_eq!(
            system_time(10, 5),
            SystemTime::UNIX_EPOCH + Duration::from_secs(10) + Duration::from_nanos(5)
        );
        assert_eq!(
            system_time(-10, 0),
            SystemTime::UNIX_EPOCH - Duration::from_secs(10)
        );
    }
}
