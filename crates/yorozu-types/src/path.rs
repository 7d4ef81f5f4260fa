//! Virtual path helpers.
//!
//! Mount paths are absolute, slash-delimited and carry no trailing slash
//! (except the root `/`). Balance-group members share an actual virtual path
//! and are told apart by a `.balance` suffix, e.g. `/movies.balance2`.

/// Marker that distinguishes balance-group siblings.
pub const BALANCE_MARKER: &str = ".balance";

/// Normalize a virtual path.
///
/// Ensures a leading `/`, collapses repeated slashes, resolves `.` and `..`
/// (never climbing above the root) and strips any trailing slash.
pub fn standardize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Whether a mount path belongs to a balance group as a non-primary member.
pub fn is_balance(mount_path: &str) -> bool {
    mount_path.contains(BALANCE_MARKER)
}

/// Strip the first balance marker (and anything after it) from a mount path.
///
/// `/a/d/e.balance` and `/a/d/e.balance2` both map to `/a/d/e`; paths
/// without a marker are returned unchanged.
pub fn actual_virtual_path(mount_path: &str) -> &str {
    match mount_path.find(BALANCE_MARKER) {
        Some(idx) => &mount_path[..idx],
        None => mount_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standardize_path() {
        assert_eq!(standardize_path(""), "/");
        assert_eq!(standardize_path("/"), "/");
        assert_eq!(standardize_path("a/b"), "/a/b");
        assert_eq!(standardize_path("/a/b/"), "/a/b");
        assert_eq!(standardize_path("//a///b"), "/a/b");
        assert_eq!(standardize_path("/a/./b/../c"), "/a/c");
        assert_eq!(standardize_path("/../../a"), "/a");
    }

    #[test]
    fn test_is_balance() {
        assert!(is_balance("/a/b.balance"));
        assert!(is_balance("/a/b.balance1"));
        assert!(!is_balance("/a/b"));
        assert!(!is_balance("/a/balance"));
    }

    #[test]
    fn test_actual_virtual_path() {
        assert_eq!(actual_virtual_path("/a/d/e.balance"), "/a/d/e");
        assert_eq!(actual_virtual_path("/a/d/e.balance2"), "/a/d/e");
        assert_eq!(actual_virtual_path("/a/d/e"), "/a/d/e");
        assert_eq!(actual_virtual_path("/"), "/");
    }

    #[test]
    fn test_actual_virtual_path_cuts_at_first_marker() {
        assert_eq!(actual_virtual_path("/m.balanced.balance2"), "/m");
        assert_eq!(actual_virtual_path("/m.balance1/x.balance"), "/m");
    }
}
