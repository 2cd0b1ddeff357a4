/// Compilation of a single gitignore-style line into a path predicate.
///
/// Each line is translated into an anchored, case-insensitive regular
/// expression. Candidates are relative paths using `/` separators plus the
/// entry's bare name.
use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Regex prefix allowing an unanchored pattern to match at any depth.
const ANY_PATH_PREFIX: &str = "^(?:.*/)?";

/// Regex suffix letting a directory pattern also cover everything beneath it.
const DIRECTORY_SUFFIX: &str = "(?:/.*)?";

/// A compiled ignore rule together with its source text.
#[derive(Debug, Clone)]
pub struct IgnorePattern {
    text: String,
    /// `None` when the line was empty or failed to compile; such a pattern
    /// never matches anything.
    regex: Option<Regex>,
    anchored: bool,
}

impl IgnorePattern {
    /// Compile one pattern line. Never fails: a line that cannot be turned
    /// into a valid expression yields a pattern that matches nothing.
    pub fn compile(line: &str) -> Self {
        let normalised = line.replace('\\', "/");
        let normalised = normalised.trim();
        let anchored = normalised.starts_with('/');

        let regex = translate(normalised).and_then(|source| {
            match RegexBuilder::new(&source).case_insensitive(true).build() {
                Ok(regex) => Some(regex),
                Err(err) => {
                    warn!("Ignoring malformed pattern '{line}': {err}");
                    None
                }
            }
        });

        Self {
            text: line.to_string(),
            regex,
            anchored,
        }
    }

    /// The original line this pattern was compiled from.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// `true` if the pattern was anchored to the scan root with a leading `/`.
    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// `true` if this pattern can never match (empty or malformed source).
    pub fn is_inert(&self) -> bool {
        self.regex.is_none()
    }

    /// Test a root-relative path (with `/` separators) and the entry's bare name.
    ///
    /// Anchored patterns are tested against the relative path only; other
    /// patterns match if either candidate matches.
    pub fn matches(&self, relative_path: &str, base_name: &str) -> bool {
        let Some(regex) = &self.regex else {
            return false;
        };
        if regex.is_match(relative_path) {
            return true;
        }
        !self.anchored && regex.is_match(base_name)
    }
}

/// Translate a normalised pattern into regex source, or `None` if nothing
/// is left to match after stripping anchors.
fn translate(pattern: &str) -> Option<String> {
    let (anchored, body) = match pattern.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, pattern),
    };
    let (directory_only, body) = match body.strip_suffix('/') {
        Some(rest) => (true, rest),
        None => (false, body),
    };
    if body.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(body.len() * 2 + 16);
    out.push_str(if anchored { "^" } else { ANY_PATH_PREFIX });

    let chars: Vec<char> = body.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                while chars.get(i + 1) == Some(&'*') {
                    i += 1;
                }
                // `**/` may also match zero directories.
                if chars.get(i + 1) == Some(&'/') {
                    i += 1;
                    out.push_str("(?:.*/)?");
                } else {
                    out.push_str(".*");
                }
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => match chars[i + 1..].iter().position(|&c| c == ']') {
                Some(offset) => {
                    let close = i + 1 + offset;
                    out.extend(&chars[i..=close]);
                    i = close;
                }
                None => out.push_str(r"\["),
            },
            c => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
            }
        }
        i += 1;
    }

    if directory_only {
        out.push_str(DIRECTORY_SUFFIX);
    }
    out.push('$');
    Some(out)
}
