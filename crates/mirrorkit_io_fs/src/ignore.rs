//! Ordered ignore rules with literal substring matching.
//!
//! A rule line is either an exclusion (`pattern`) or a re-inclusion
//! (`!pattern`). Rules are folded in order against the forward-slash form of a
//! relative path; every matching rule overwrites the running verdict, so the
//! last matching rule wins.
//!
//! Patterns are plain substrings. `*`, a leading `/` or a trailing `/` carry no
//! special meaning: `tmp` matches both `a/tmp/file.txt` and `tmpfile.txt`.

use std::fs;
use std::io;
use std::path::Path;

const C_RULE_TRAILING_WHITESPACE: &[char] = &[' ', '\r', '\n', '\t'];
const C_RULE_COMMENT_PREFIX: char = '#';
const C_RULE_NEGATION_PREFIX: char = '!';

/// One parsed ignore rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecIgnoreRule {
    /// `true` for `!pattern` lines (re-include on match).
    pub negated: bool,
    /// Literal substring to look for.
    pub pattern: String,
}

impl SpecIgnoreRule {
    /// Parse one raw line. Blank and `#` lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line_trimmed = line.trim_end_matches(C_RULE_TRAILING_WHITESPACE);
        if line_trimmed.is_empty() || line_trimmed.starts_with(C_RULE_COMMENT_PREFIX) {
            return None;
        }
        match line_trimmed.strip_prefix(C_RULE_NEGATION_PREFIX) {
            Some(pattern) => Some(Self {
                negated: true,
                pattern: pattern.to_string(),
            }),
            None => Some(Self {
                negated: false,
                pattern: line_trimmed.to_string(),
            }),
        }
    }

    fn is_matching(&self, path_normalized: &str) -> bool {
        path_normalized.contains(self.pattern.as_str())
    }
}

/// Immutable, ordered rule set answering "is this relative path excluded?".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreMatcher {
    rules: Vec<SpecIgnoreRule>,
}

impl IgnoreMatcher {
    /// Build a matcher from raw rule lines, in order.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = lines
            .into_iter()
            .filter_map(|line| SpecIgnoreRule::parse(line.as_ref()))
            .collect();
        Self { rules }
    }

    /// Load rules from a text file. A missing file yields an empty matcher.
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let raw_bytes = match fs::read(path.as_ref()) {
            Ok(v) => v,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e),
        };
        let txt = String::from_utf8_lossy(&raw_bytes);
        Ok(Self::from_lines(txt.lines()))
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[SpecIgnoreRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Fold every rule over `path` (backslashes normalized to `/`).
    pub fn is_excluded(&self, path: &str) -> bool {
        let path_normalized = path.replace('\\', "/");
        self.rules.iter().fold(false, |b_excluded, rule| {
            if rule.is_matching(&path_normalized) {
                !rule.negated
            } else {
                b_excluded
            }
        })
    }

    /// [`Self::is_excluded`] over the lossy string form of `path`.
    pub fn is_excluded_path(&self, path: &Path) -> bool {
        self.is_excluded(&path.to_string_lossy())
    }
}
