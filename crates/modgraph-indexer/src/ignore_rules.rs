//! Layered ignore rules
//!
//! Every pattern is rewritten relative to the scan root before it joins the
//! set, so one flat gitignore matcher answers for the whole tree. Patterns
//! are evaluated with gitignore precedence: the last match wins.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;
use std::sync::Arc;

/// Name of the per-directory ignore file.
pub const IGNORE_FILE: &str = ".gitignore";

/// Always ignored, anywhere in the tree.
pub const BUILTIN_IGNORES: &[&str] = &[
    // Version control
    ".git/",
    // Dependency caches
    "node_modules/",
    ".pnpm-store/",
    ".cache/",
    // Build output
    "dist/",
    "build/",
    ".next/",
    // OS metadata
    ".DS_Store",
    "Thumbs.db",
];

/// The accumulated pattern set for one directory and its descendants.
#[derive(Clone)]
pub struct IgnoreRules {
    patterns: Vec<String>,
    matcher: Arc<Gitignore>,
}

impl std::fmt::Debug for IgnoreRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IgnoreRules")
            .field("patterns", &self.patterns)
            .finish()
    }
}

impl IgnoreRules {
    /// Rules holding only the built-in list.
    pub fn new() -> Self {
        let patterns: Vec<String> = BUILTIN_IGNORES
            .iter()
            .filter_map(|p| normalize_pattern("", p))
            .collect();
        let matcher = build_matcher(&patterns).unwrap_or_else(Gitignore::empty);
        IgnoreRules {
            patterns,
            matcher: Arc::new(matcher),
        }
    }

    /// Rules for `dir` (root-relative, `""` for the root) after reading its
    /// ignore file. The receiver is left untouched, so siblings keep
    /// inheriting the parent's set.
    pub fn with_ignore_file(&self, dir: &str, content: &str) -> Self {
        let added: Vec<String> = content
            .lines()
            .filter_map(|line| normalize_pattern(dir, line))
            .collect();
        if added.is_empty() {
            return self.clone();
        }

        let mut patterns = self.patterns.clone();
        patterns.extend(added);
        match build_matcher(&patterns) {
            Some(matcher) => IgnoreRules {
                patterns,
                matcher: Arc::new(matcher),
            },
            None => {
                tracing::warn!("Ignoring unusable {} in '{}'", IGNORE_FILE, dir);
                self.clone()
            }
        }
    }

    /// Whether a root-relative path is ignored.
    pub fn is_ignored(&self, relative_path: &str, is_dir: bool) -> bool {
        self.matcher
            .matched(Path::new(relative_path), is_dir)
            .is_ignore()
    }

    /// The normalized patterns, in evaluation order.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self::new()
    }
}

/// Rewrite one ignore-file line declared in `dir` into a root-relative
/// pattern. Returns `None` for blank lines and comments.
pub fn normalize_pattern(dir: &str, line: &str) -> Option<String> {
    let line = line.trim_end();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (negated, body) = match line.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, line),
    };
    let (dir_only, body) = match body.strip_suffix('/') {
        Some(rest) => (true, rest),
        None => (false, body),
    };
    let (anchored, body) = match body.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (body.contains('/'), body),
    };
    if body.is_empty() {
        return None;
    }

    let dir = dir.trim_matches('/');
    let mut pattern = match (dir.is_empty(), anchored) {
        (true, true) => format!("/{}", body),
        (true, false) => format!("**/{}", body),
        (false, true) => format!("/{}/{}", dir, body),
        (false, false) => format!("/{}/**/{}", dir, body),
    };
    if dir_only {
        pattern.push('/');
    }
    if negated {
        pattern.insert(0, '!');
    }
    Some(pattern)
}

fn build_matcher(patterns: &[String]) -> Option<Gitignore> {
    // "." disables the builder's root stripping; callers pass relative paths.
    let mut builder = GitignoreBuilder::new(".");
    for pattern in patterns {
        if let Err(e) = builder.add_line(None, pattern) {
            tracing::warn!("Skipping malformed ignore pattern '{}': {}", pattern, e);
        }
    }
    match builder.build() {
        Ok(matcher) => Some(matcher),
        Err(e) => {
            tracing::warn!("Failed to compile ignore patterns: {}", e);
            None
        }
    }
}
