//! The preserved set: names that survive cleanup and are never overwritten by merge.

use std::collections::HashSet;
use std::ffi::OsStr;

/// Default preserved names.
///
/// `wp-rescue.php` is the conventional in-root deployment name of this tool's
/// web-dispatched sibling; `wp-recover.php` is its legacy name. Both stay in
/// the default policy so a deployed copy survives its own cleanup pass.
pub const DEFAULT_PRESERVED: &[&str] = &[
    "wp-config.php",
    "wp-rescue.php",
    "wp-recover.php",
    "wp-content",
    ".htaccess",
    "robots.txt",
];

/// Exact-name, case-sensitive membership set.
///
/// Invariant: membership is checked before any destructive operation touches
/// a path — cleanup consults it before every delete, merge before every
/// overwrite. There is no glob or prefix matching; `WP-CONFIG.PHP` is not
/// `wp-config.php`.
#[derive(Debug, Clone)]
pub struct PreservedSet {
    names: HashSet<String>,
}

impl PreservedSet {
    /// Build a set from explicit policy names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// The built-in default policy.
    #[must_use]
    pub fn default_policy() -> Self {
        Self::new(DEFAULT_PRESERVED.iter().copied())
    }

    /// Exact, case-sensitive membership check.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Membership check for raw directory-entry names.
    ///
    /// Non-UTF-8 names can never be members: policy names are UTF-8 strings.
    #[must_use]
    pub fn contains_os(&self, name: &OsStr) -> bool {
        name.to_str().is_some_and(|s| self.contains(s))
    }

    /// Sorted view of the policy names, for reports.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.names.iter().map(String::as_str).collect();
        out.sort_unstable();
        out
    }
}

impl Default for PreservedSet {
    fn default() -> Self {
        Self::default_policy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_contains_config_and_tool() {
        let set = PreservedSet::default_policy();
        assert!(set.contains("wp-config.php"));
        assert!(set.contains("wp-recover.php"));
        assert!(set.contains("wp-content"));
        assert!(set.contains(".htaccess"));
    }

    #[test]
    fn membership_is_case_sensitive() {
        let set = PreservedSet::default_policy();
        assert!(!set.contains("WP-CONFIG.PHP"));
        assert!(!set.contains("Wp-Config.php"));
    }

    #[test]
    fn membership_is_exact_not_substring() {
        let set = PreservedSet::default_policy();
        assert!(!set.contains("wp-config.php.bak"));
        assert!(!set.contains("config.php"));
    }

    #[test]
    fn non_utf8_names_are_never_members() {
        #[cfg(unix)]
        {
            use std::os::unix::ffi::OsStrExt;
            let set = PreservedSet::default_policy();
            let raw = OsStr::from_bytes(b"wp-config.php\xff");
            assert!(!set.contains_os(raw));
        }
    }

    #[test]
    fn custom_policy_replaces_defaults() {
        let set = PreservedSet::new(["keep.txt"]);
        assert!(set.contains("keep.txt"));
        assert!(!set.contains("wp-config.php"));
    }
}
