/// The ignore set for one scan, loaded from `.gitignore` at the scan root.
use crate::error::ScanError;
use crate::ignore::pattern::IgnorePattern;
use std::fs;
use std::path::{Component, Path};
use tracing::debug;

/// Name of the ignore file read from the scan root.
pub const IGNORE_FILE_NAME: &str = ".gitignore";

/// Ordered collection of compiled ignore patterns.
///
/// An empty set means "no filtering": [`IgnoreSet::is_ignored`] always
/// returns `false`. Patterns are OR-combined, order is kept for display.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    patterns: Vec<IgnorePattern>,
}

impl IgnoreSet {
    /// A set that filters nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the ignore file directly under `root`.
    ///
    /// Returns an empty set when `use_ignore_file` is `false` or the file
    /// does not exist. A file that exists but cannot be read is an error.
    pub fn load(root: &Path, use_ignore_file: bool) -> Result<Self, ScanError> {
        if !use_ignore_file {
            return Ok(Self::empty());
        }

        let path = root.join(IGNORE_FILE_NAME);
        if !path.is_file() {
            return Ok(Self::empty());
        }

        let bytes = fs::read(&path).map_err(|source| ScanError::IgnoreFile {
            path: path.clone(),
            source,
        })?;
        // Stray non-UTF-8 bytes only garble the line they sit on.
        let contents = String::from_utf8_lossy(&bytes);
        let set = Self::from_lines(contents.lines());
        debug!(
            "Loaded {} ignore pattern(s) from {}",
            set.len(),
            path.display()
        );
        Ok(set)
    }

    /// Compile every non-blank line that is not a `#` comment.
    pub fn from_lines<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let patterns = lines
            .into_iter()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(IgnorePattern::compile)
            .collect();
        Self { patterns }
    }

    /// Number of loaded patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// `true` if no patterns are loaded (no filtering active).
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Loaded patterns, in file order.
    pub fn patterns(&self) -> &[IgnorePattern] {
        &self.patterns
    }

    /// Whether `path` (somewhere under `root`) is excluded by any pattern.
    ///
    /// Each pattern is tried against the root-relative path and against the
    /// bare file or directory name.
    pub fn is_ignored(&self, path: &Path, root: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }

        let relative = relative_slash_path(path, root);
        let base_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| relative.clone());

        self.patterns
            .iter()
            .any(|pattern| pattern.matches(&relative, &base_name))
    }
}

/// Render `path` relative to `root` using `/` separators.
///
/// Falls back to the full path when `path` is not under `root`, and to `.`
/// for the root itself.
fn relative_slash_path(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}
