//! Pure url algebra: prefix decomposition, joining and slug syntax.

use crate::error::{Result, TreeError};

/// Url of the root node.
pub const ROOT_URL: &str = "/";

/// Every prefix of `path` that ends on a `/` boundary, plus the root url.
///
/// The result is deduplicated and ordered shortest first, though callers
/// should treat it as a set. `.` and `..` segments are opaque characters.
///
/// # Examples
///
/// ```
/// use navtree::v1::path::split_path;
///
/// assert_eq!(split_path("/a/b/"), vec!["/", "/a/", "/a/b/"]);
/// assert_eq!(split_path(""), vec!["/"]);
/// ```
pub fn split_path(path: &str) -> Vec<String> {
    let mut prefixes = vec![ROOT_URL.to_string()];
    // Boundary prefixes grow strictly in length, so only the root can repeat.
    for (idx, _) in path.match_indices('/') {
        let prefix = &path[..=idx];
        if prefix != ROOT_URL {
            prefixes.push(prefix.to_string());
        }
    }
    prefixes
}

/// Url of a child named `slug` beneath a node at `parent_url`.
///
/// `parent_url` must end with `/`.
pub fn join_path(parent_url: &str, slug: &str) -> String {
    debug_assert!(parent_url.ends_with('/'), "parent url must end with '/'");
    format!("{}{}/", parent_url, slug)
}

/// Reject slugs that would not survive as a single url segment.
///
/// The empty slug passes here; whether a node may have one is decided by its
/// position in the tree.
pub fn validate_slug(slug: &str) -> Result<()> {
    let ok = slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(TreeError::InvalidSlug(slug.to_string()))
    }
}

/// Only the empty path and paths ending in `/` are routed.
pub fn is_routable(path: &str) -> bool {
    path.is_empty() || path.ends_with('/')
}

/// The part of `request_path` below `url`, re-rooted at `/`.
///
/// Returns `None` when `url` is not a prefix of `request_path`.
pub fn node_relative(url: &str, request_path: &str) -> Option<String> {
    if request_path.is_empty() && url == ROOT_URL {
        return Some(ROOT_URL.to_string());
    }
    request_path
        .strip_prefix(url)
        .map(|rest| format!("/{}", rest))
}
