/// Ignore rules: gitignore-style patterns loaded from the scan root.
///
/// Only the subset of gitignore syntax needed to skip build output and
/// similar noise is supported: anchoring, directory suffixes, `*`, `**`,
/// `?` and character classes. Negation and nested ignore files are not.
pub mod pattern;
pub mod set;

pub use pattern::IgnorePattern;
pub use set::{IgnoreSet, IGNORE_FILE_NAME};
