//! # Path Resolver
//!
//! Maps a requested path onto an entry of a bundle's file set. Bundles are
//! authored with inconsistent conventions (leading slashes, backslashes,
//! nested build directories, mixed case), so matching runs through an ordered
//! list of strategies. The first strategy that finds something wins, and
//! inside a strategy the first key in file-set order wins.

use std::fmt;

use tracing::debug;

use crate::manifest::{FileEntry, FileMap};

/// The strategy that produced a match, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    /// Key equals the requested path byte for byte
    Exact,
    /// Key equals the normalized requested path
    NormalizedExact,
    /// Normalized key equals the normalized request, allowing a trailing `/`
    /// on either side
    NormalizedKey,
    /// Same final segment, and one path is a suffix of the other
    Filename,
    /// Normalized paths equal ignoring case
    CaseInsensitive,
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchTier::Exact => "exact",
            MatchTier::NormalizedExact => "normalized-exact",
            MatchTier::NormalizedKey => "normalized-key",
            MatchTier::Filename => "filename",
            MatchTier::CaseInsensitive => "case-insensitive",
        };
        f.write_str(name)
    }
}

/// A successful resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved<'a> {
    pub entry: &'a FileEntry,
    /// The manifest key that matched
    pub matched_path: &'a str,
    pub tier: MatchTier,
}

/// Canonical form used for comparisons: backslashes become `/`, then all
/// leading `/` are removed.
pub fn normalize(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches('/').to_owned()
}

struct Target<'r> {
    raw: &'r str,
    normalized: String,
}

type Matcher = for<'a> fn(&'a FileMap, &Target<'_>) -> Option<(&'a str, &'a FileEntry)>;

const MATCHERS: [(MatchTier, Matcher); 5] = [
    (MatchTier::Exact, match_exact),
    (MatchTier::NormalizedExact, match_normalized_exact),
    (MatchTier::NormalizedKey, match_normalized_key),
    (MatchTier::Filename, match_filename),
    (MatchTier::CaseInsensitive, match_case_insensitive),
];

/// Find the entry serving `requested_path`, or `None` if no strategy matches.
pub fn resolve<'a>(files: &'a FileMap, requested_path: &str) -> Option<Resolved<'a>> {
    if files.is_empty() {
        return None;
    }

    let target = Target {
        raw: requested_path,
        normalized: normalize(requested_path),
    };

    MATCHERS.iter().find_map(|(tier, matcher)| {
        matcher(files, &target).map(|(matched_path, entry)| {
            debug!(requested = requested_path, matched = matched_path, %tier, "Resolved file");
            Resolved {
                entry,
                matched_path,
                tier: *tier,
            }
        })
    })
}

fn match_exact<'a>(files: &'a FileMap, target: &Target<'_>) -> Option<(&'a str, &'a FileEntry)> {
    files.get_key_value(target.raw)
}

fn match_normalized_exact<'a>(
    files: &'a FileMap,
    target: &Target<'_>,
) -> Option<(&'a str, &'a FileEntry)> {
    files.get_key_value(&target.normalized)
}

fn match_normalized_key<'a>(
    files: &'a FileMap,
    target: &Target<'_>,
) -> Option<(&'a str, &'a FileEntry)> {
    let request = target.normalized.as_str();
    files.iter().find(|(path, _)| {
        let key = normalize(path);
        key == request
            || strip_slash(&key) == Some(request)
            || strip_slash(request) == Some(key.as_str())
    })
}

fn strip_slash(path: &str) -> Option<&str> {
    path.strip_suffix('/')
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn match_filename<'a>(files: &'a FileMap, target: &Target<'_>) -> Option<(&'a str, &'a FileEntry)> {
    let request = target.normalized.as_str();
    let filename = last_segment(request);
    if filename.is_empty() {
        return None;
    }

    files.iter().find(|(path, _)| {
        let key = normalize(path);
        last_segment(&key) == filename && (key.ends_with(request) || request.ends_with(&key))
    })
}

fn match_case_insensitive<'a>(
    files: &'a FileMap,
    target: &Target<'_>,
) -> Option<(&'a str, &'a FileEntry)> {
    let request = target.normalized.to_lowercase();
    files
        .iter()
        .find(|(path, _)| normalize(path).to_lowercase() == request)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_set(paths: &[&str]) -> FileMap {
        paths
            .iter()
            .map(|path| (*path, FileEntry::raw(format!("content of {path}"))))
            .collect()
    }

    fn resolved(files: &FileMap, request: &str) -> Option<(String, MatchTier)> {
        resolve(files, request).map(|r| (r.matched_path.to_owned(), r.tier))
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("///assets/img.png"), "assets/img.png");
        assert_eq!(normalize("assets\\img.png"), "assets/img.png");
        assert_eq!(normalize("\\assets\\img.png"), "assets/img.png");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for path in ["/a/b", "\\\\x\\y", "dir/", "plain.js", "//", "/\\/mixed\\path/"] {
            let once = normalize(path);
            assert_eq!(normalize(&once), once, "not idempotent for {path:?}");
        }
    }

    #[test]
    fn test_empty_file_set() {
        assert!(resolve(&FileMap::new(), "index.html").is_none());
    }

    #[test]
    fn test_exact_match_wins_over_other_tiers() {
        // "/index.html" would also match the normalized tiers via "index.html"
        let files = file_set(&["index.html", "/index.html"]);
        assert_eq!(
            resolved(&files, "/index.html"),
            Some(("/index.html".to_owned(), MatchTier::Exact))
        );
    }

    #[test]
    fn test_leading_slash_request() {
        let files = file_set(&["assets/img.png"]);
        assert_eq!(
            resolved(&files, "/assets/img.png"),
            Some(("assets/img.png".to_owned(), MatchTier::NormalizedExact))
        );
    }

    #[test]
    fn test_key_with_leading_slash_or_backslashes() {
        let files = file_set(&["/js\\main.js"]);
        assert_eq!(
            resolved(&files, "js/main.js"),
            Some(("/js\\main.js".to_owned(), MatchTier::NormalizedKey))
        );
    }

    #[test]
    fn test_directory_equivalence() {
        let files = file_set(&["levels/"]);
        assert_eq!(
            resolved(&files, "levels"),
            Some(("levels/".to_owned(), MatchTier::NormalizedKey))
        );

        let files_b = file_set(&["levels"]);
        assert_eq!(
            resolved(&files_b, "levels/"),
            Some(("levels".to_owned(), MatchTier::NormalizedKey))
        );
    }

    #[test]
    fn test_filename_match_with_suffix_guard() {
        let files = file_set(&["dist/app.js"]);
        assert_eq!(
            resolved(&files, "app.js"),
            Some(("dist/app.js".to_owned(), MatchTier::Filename))
        );

        // Same file name, request is not a suffix of the key and vice versa
        let files = file_set(&["dist/app.js"]);
        assert_eq!(resolved(&files, "other/app.js"), None);
    }

    #[test]
    fn test_filename_match_request_longer_than_key() {
        let files = file_set(&["app.js"]);
        assert_eq!(
            resolved(&files, "build/app.js"),
            Some(("app.js".to_owned(), MatchTier::Filename))
        );
    }

    #[test]
    fn test_filename_collision_picks_first_in_order() {
        let files = file_set(&["a/app.js", "b/app.js"]);
        assert_eq!(
            resolved(&files, "app.js"),
            Some(("a/app.js".to_owned(), MatchTier::Filename))
        );

        let files = file_set(&["b/app.js", "a/app.js"]);
        assert_eq!(
            resolved(&files, "app.js"),
            Some(("b/app.js".to_owned(), MatchTier::Filename))
        );
    }

    #[test]
    fn test_shared_suffix_takes_first_candidate() {
        let files = file_set(&["x/a/f.js", "y/a/f.js"]);
        assert_eq!(
            resolved(&files, "a/f.js"),
            Some(("x/a/f.js".to_owned(), MatchTier::Filename))
        );
    }

    #[test]
    fn test_empty_filename_does_not_match_anything() {
        let files = file_set(&["a/index.html", "b/"]);
        assert_eq!(resolved(&files, ""), None);
        assert_eq!(resolved(&files, "c/"), None);
    }

    #[test]
    fn test_case_insensitive_fallback() {
        let files = file_set(&["Index.HTML"]);
        assert_eq!(
            resolved(&files, "index.html"),
            Some(("Index.HTML".to_owned(), MatchTier::CaseInsensitive))
        );
    }

    #[test]
    fn test_no_match() {
        let files = file_set(&["index.html", "js/app.js"]);
        assert_eq!(resolved(&files, "missing.css"), None);
    }

    #[test]
    fn test_resolved_entry_is_the_matched_one() {
        let files = file_set(&["a.txt", "b.txt"]);
        let r = resolve(&files, "b.txt").unwrap();
        assert_eq!(r.entry, &FileEntry::raw("content of b.txt"));
    }
}
