//! Ignore rules applied to watch events.
//!
//! Rules come from the closest `.gitignore` (searched upward from the working
//! directory, stopping at the repository root), a built-in rule for `.git`,
//! and any extra patterns from `cp-link.toml`. The set is fixed once loaded.

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::{debug, warn};

use crate::error::{CpLinkError, Result};
use crate::paths::find_closest_file;

pub const IGNORE_FILE: &str = ".gitignore";

/// Version-control metadata, never a reason to rebuild.
const BUILTIN_RULES: &[&str] = &[".git"];

pub struct IgnoreRuleSet {
    /// Directory the patterns are relative to.
    root: PathBuf,
    matcher: Gitignore,
}

impl IgnoreRuleSet {
    /// Build the rule set for a session started in `cwd`.
    pub fn load(cwd: &Path, extra: &[String]) -> Result<Self> {
        let ignore_file = find_closest_file(cwd, IGNORE_FILE);
        let root = ignore_file
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or(cwd);
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

        let mut builder = GitignoreBuilder::new(&root);
        if let Some(file) = &ignore_file {
            debug!("loading ignore rules from {}", file.display());
            if let Some(err) = builder.add(file) {
                warn!("some rules in {} were skipped: {err}", file.display());
            }
        }

        let rules = BUILTIN_RULES
            .iter()
            .copied()
            .chain(extra.iter().map(String::as_str));
        for rule in rules {
            builder
                .add_line(None, rule)
                .map_err(|err| CpLinkError::InvalidPattern {
                    pattern: rule.to_string(),
                    reason: err.to_string(),
                })?;
        }

        let matcher = builder.build().map_err(|err| CpLinkError::InvalidPattern {
            pattern: IGNORE_FILE.to_string(),
            reason: err.to_string(),
        })?;

        Ok(Self { root, matcher })
    }

    /// True if `path` or any of its parent directories matches a rule.
    ///
    /// Paths outside the rules' root only get the built-in checks.
    pub fn is_ignored(&self, path: &Path) -> bool {
        if path
            .components()
            .any(|c| BUILTIN_RULES.iter().any(|rule| c.as_os_str() == *rule))
        {
            return true;
        }

        match path.strip_prefix(&self.root) {
            Ok(rel) if !rel.as_os_str().is_empty() => self
                .matcher
                .matched_path_or_any_parents(rel, path.is_dir())
                .is_ignore(),
            _ => false,
        }
    }
}
