//! Wildcard path matching.
//!
//! # Responsibilities
//! - Split paths into segments (empty segments dropped)
//! - Match request segments against `*` / `**` patterns
//!
//! # Design Decisions
//! - Comparison runs right-to-left: the last literal segment is usually the
//!   most selective one
//! - `**` is non-backtracking: it stops at the nearest anchor to the left
//! - `*`s directly left of a `**` each take exactly one segment; the `**`
//!   takes whatever lies between them and the next literal anchor
//! - Literal comparison is case-sensitive

/// Single-segment wildcard.
pub const ANY_SEGMENT: &str = "*";

/// Multi-segment wildcard.
pub const ANY_SEGMENTS: &str = "**";

/// Split a path on `/`, dropping the empty segments produced by leading,
/// trailing or doubled slashes.
pub fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Returns true if the path contains a wildcard segment.
pub fn is_wildcard(path: &str) -> bool {
    path.contains('*')
}

/// Decide whether `request` satisfies `pattern`.
///
/// Both slices are already split (see [`split_segments`]).
pub fn match_path<P, R>(pattern: &[P], request: &[R]) -> bool
where
    P: AsRef<str>,
    R: AsRef<str>,
{
    let mut i = pattern.len() as isize - 1;
    let mut j = request.len() as isize - 1;

    while i >= 0 {
        let segment = pattern[i as usize].as_ref();

        if segment == ANY_SEGMENT {
            if j < 0 {
                return false;
            }
            i -= 1;
            j -= 1;
        } else if segment == ANY_SEGMENTS {
            i -= 1;
            if i < 0 {
                // Leading `**` swallows everything that is left.
                j = -1;
                continue;
            }
            // Fold the wildcards left of `**` into it, reserving one
            // segment per `*`.
            let mut reserved = 0;
            while i >= 0 {
                match pattern[i as usize].as_ref() {
                    ANY_SEGMENT => reserved += 1,
                    ANY_SEGMENTS => {}
                    _ => break,
                }
                i -= 1;
            }
            if j + 1 < reserved {
                return false;
            }
            j -= reserved;
            if i < 0 {
                j = -1;
                continue;
            }
            let anchor = pattern[i as usize].as_ref();
            while j >= 0 && request[j as usize].as_ref() != anchor {
                j -= 1;
            }
            if j < 0 {
                return false;
            }
        } else {
            if j < 0 || request[j as usize].as_ref() != segment {
                return false;
            }
            i -= 1;
            j -= 1;
        }
    }

    j == -1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_segments() {
        assert_eq!(split_segments("/api//user/"), vec!["api", "user"]);
        assert!(split_segments("/").is_empty());
        assert!(split_segments("").is_empty());
    }

    #[test]
    fn test_identical_paths() {
        assert!(match_path(&["api", "user", "tom"], &["api", "user", "tom"]));
    }

    #[test]
    fn test_single_wildcard() {
        assert!(match_path(&["api", "*", "tom"], &["api", "user", "tom"]));
        assert!(match_path(&["api", "*"], &["api", "user"]));
        assert!(!match_path(&["api", "user", "*"], &["api", "user"]));
        assert!(!match_path(&["api", "*", "tom"], &["api", "user"]));
        assert!(!match_path(&["*"], &[] as &[&str]));
    }

    #[test]
    fn test_multi_wildcard() {
        assert!(match_path(&["api", "**", "tom"], &["api", "a", "b", "tom"]));
        assert!(match_path(&["api", "**", "tom"], &["api", "user", "name", "tom"]));
        assert!(match_path(&["api", "**", "tom"], &["api", "tom"]));
        assert!(!match_path(&["api", "**", "tom"], &["api", "jerry"]));
        assert!(!match_path(&["api", "**", "tom"], &["v1", "x", "tom"]));
    }

    #[test]
    fn test_leading_and_trailing_multi_wildcard() {
        assert!(match_path(&["**", "tom"], &["a", "b", "tom"]));
        assert!(match_path(&["**", "tom"], &["tom"]));
        assert!(match_path(&["api", "**"], &["api", "x", "y"]));
        assert!(match_path(&["api", "**"], &["api"]));
        assert!(!match_path(&["api", "**"], &["v1", "x"]));
    }

    #[test]
    fn test_single_wildcards_before_multi_wildcard() {
        assert!(match_path(&["a", "*", "**", "z"], &["a", "x", "y", "z"]));
        assert!(match_path(&["a", "*", "**", "z"], &["a", "x", "z"]));
        assert!(match_path(&["a", "*", "**", "z"], &["a", "x", "y", "w", "z"]));
        assert!(!match_path(&["a", "*", "**", "z"], &["a", "z"]));
        assert!(match_path(&["a", "*", "*", "**"], &["a", "x", "y", "q"]));
        assert!(!match_path(&["a", "*", "*", "**"], &["a", "x"]));
        assert!(match_path(&["*", "**", "z"], &["x", "y", "z"]));
        assert!(!match_path(&["*", "**", "z"], &["z"]));
        assert!(match_path(&["a", "**", "**", "z"], &["a", "b", "z"]));
    }

    #[test]
    fn test_literal_mismatch() {
        assert!(!match_path(&["api", "user", "tom"], &["api", "user"]));
        assert!(!match_path(&["api", "user"], &["api", "user", "tom"]));
        assert!(!match_path(&["api", "User"], &["api", "user"]));
    }

    #[test]
    fn test_wildcard_detection() {
        assert!(is_wildcard("/api/*/tom"));
        assert!(is_wildcard("/api/**"));
        assert!(!is_wildcard("/api/user"));
    }
}
