//! Gitignore-style path matching.
//!
//! Paths are relative to the project root, use `/` separators, and mark
//! directories with a trailing `/` when passed to the free functions. Matching
//! is case-sensitive.
//!
//! Pattern syntax:
//! - blank lines and lines starting with `#` are ignored;
//! - a leading `!` negates the pattern (`\!` and `\#` escape a literal first character);
//! - a trailing `/` restricts the pattern to directories;
//! - a pattern without any other `/` matches the basename at any depth, otherwise
//!   it is anchored to the directory that declared it;
//! - `*` matches any run of characters except `/`, `?` exactly one such character,
//!   and a `**` segment zero or more whole segments;
//! - `{a,b}` alternates within one segment.

use globset::{GlobBuilder, GlobMatcher};
use tracing::debug;

use crate::error::PatternError;

/// One compiled pattern together with the directory that declared it.
#[derive(Debug, Clone)]
pub struct Pattern {
    base: String,
    negated: bool,
    dir_only: bool,
    anchored: bool,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
enum Segment {
    /// `**`: zero or more whole segments.
    AnyDepth,
    Glob(GlobMatcher),
}

impl Segment {
    fn compile(raw: &str, pattern: &str) -> Result<Self, PatternError> {
        if raw == "**" {
            return Ok(Self::AnyDepth);
        }
        GlobBuilder::new(raw)
            .literal_separator(true)
            .build()
            .map(|glob| Self::Glob(glob.compile_matcher()))
            .map_err(|err| PatternError::Glob {
                pattern: pattern.to_string(),
                reason: err.kind().to_string(),
            })
    }

    fn is_match(&self, name: &str) -> bool {
        match self {
            Self::AnyDepth => true,
            Self::Glob(glob) => glob.is_match(name),
        }
    }
}

impl Pattern {
    /// Parses a pattern declared at the project root.
    ///
    /// Returns `Ok(None)` for blank lines and comments.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] when the pattern cannot be matched meaningfully.
    pub fn parse(raw: &str) -> Result<Option<Self>, PatternError> {
        Self::parse_in(raw, "")
    }

    /// Parses a pattern declared by an ignore file living in `base`
    /// (relative to the project root, empty for the root itself).
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] when the pattern cannot be matched meaningfully.
    pub fn parse_in(raw: &str, base: &str) -> Result<Option<Self>, PatternError> {
        let trimmed = raw.trim_end();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }

        let (negated, body) = if let Some(rest) = trimmed.strip_prefix('!') {
            (true, rest)
        } else if trimmed.starts_with("\\!") || trimmed.starts_with("\\#") {
            // Keep the escaped character as a literal.
            (false, &trimmed[1..])
        } else {
            (false, trimmed)
        };

        let literal_head = usize::from(body.starts_with('!') || body.starts_with('#'));
        if body[literal_head..].contains('\\') {
            return Err(PatternError::Escape(raw.to_string()));
        }
        if body.contains('[') || body.contains(']') {
            return Err(PatternError::CharacterClass(raw.to_string()));
        }

        let (dir_only, body) = match body.strip_suffix('/') {
            Some(rest) => (true, rest),
            None => (false, body),
        };
        let (rooted, body) = match body.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, body),
        };
        if body.is_empty() {
            return Err(PatternError::EmptyBody(raw.to_string()));
        }

        if body.split('/').any(str::is_empty) {
            return Err(PatternError::EmptySegment(raw.to_string()));
        }
        let segments = body
            .split('/')
            .map(|segment| Segment::compile(segment, raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Self {
            base: base.trim_matches('/').to_string(),
            negated,
            dir_only,
            anchored: rooted || segments.len() > 1,
            segments,
        }))
    }

    /// Tests the pattern against a root-relative path, ignoring negation.
    ///
    /// Directory-only patterns match a directory path itself and every path
    /// beneath a matching directory.
    #[must_use]
    pub fn matches(&self, path: &str, is_dir: bool) -> bool {
        let rel = if self.base.is_empty() {
            path
        } else {
            match path.strip_prefix(self.base.as_str()).and_then(|r| r.strip_prefix('/')) {
                Some(rel) => rel,
                None => return false,
            }
        };
        if rel.is_empty() {
            return false;
        }

        let tokens: Vec<&str> = rel.split('/').collect();
        if self.dir_only {
            let deepest_dir = if is_dir { tokens.len() } else { tokens.len() - 1 };
            (1..=deepest_dir).any(|n| self.matches_tokens(&tokens[..n]))
        } else {
            self.matches_tokens(&tokens)
        }
    }

    fn matches_tokens(&self, tokens: &[&str]) -> bool {
        if self.anchored {
            match_tokens(tokens, &self.segments)
        } else {
            tokens.last().is_some_and(|name| self.segments[0].is_match(name))
        }
    }
}

/// An ordered list of compiled patterns.
///
/// Malformed entries are dropped at compile time and therefore never match.
#[derive(Debug, Clone, Default)]
pub struct PatternList {
    patterns: Vec<Pattern>,
}

impl PatternList {
    /// Compiles root-level patterns.
    pub fn compile<S: AsRef<str>>(raw: &[S]) -> Self {
        let mut list = Self::default();
        list.extend_in(raw, "");
        list
    }

    /// Appends patterns declared in `base`, preserving order.
    pub fn extend_in<S: AsRef<str>>(&mut self, raw: &[S], base: &str) {
        for line in raw {
            match Pattern::parse_in(line.as_ref(), base) {
                Ok(Some(pattern)) => self.patterns.push(pattern),
                Ok(None) => {}
                Err(err) => debug!(%err, "ignoring malformed pattern"),
            }
        }
    }

    /// Whether no pattern compiled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Evaluates the list as exclusion rules.
    ///
    /// Later negations re-include a path, except when a directory-only pattern
    /// matched: that exclusion is final.
    #[must_use]
    pub fn is_excluded(&self, path: &str, is_dir: bool) -> bool {
        let mut excluded = false;
        for pattern in &self.patterns {
            if !pattern.matches(path, is_dir) {
                continue;
            }
            if pattern.negated {
                excluded = false;
            } else if pattern.dir_only {
                return true;
            } else {
                excluded = true;
            }
        }
        excluded
    }

    /// Evaluates the list as inclusion rules: the last matching pattern decides,
    /// and a path matched by nothing is not included.
    #[must_use]
    pub fn is_included(&self, path: &str, is_dir: bool) -> bool {
        let mut included = false;
        for pattern in &self.patterns {
            if pattern.matches(path, is_dir) {
                included = !pattern.negated;
            }
        }
        included
    }
}

/// Returns `true` when `path` is not excluded and is matched by the inclusion patterns.
///
/// A trailing `/` on `path` marks it as a directory.
#[must_use]
pub fn is_included<E: AsRef<str>, I: AsRef<str>>(
    path: &str,
    exclusions: &[E],
    inclusions: &[I],
) -> bool {
    let (path, is_dir) = split_kind(path);
    !PatternList::compile(exclusions).is_excluded(path, is_dir)
        && PatternList::compile(inclusions).is_included(path, is_dir)
}

/// Returns `true` when `path` is excluded by the given patterns.
///
/// A trailing `/` on `path` marks it as a directory.
#[must_use]
pub fn is_excluded<E: AsRef<str>>(path: &str, exclusions: &[E]) -> bool {
    let (path, is_dir) = split_kind(path);
    PatternList::compile(exclusions).is_excluded(path, is_dir)
}

/// Checks that a pattern would be honoured by the matcher.
///
/// # Errors
///
/// Returns the reason the pattern would be silently ignored.
pub fn validate_pattern(raw: &str) -> Result<(), PatternError> {
    Pattern::parse(raw).map(|_| ())
}

fn split_kind(path: &str) -> (&str, bool) {
    let path = path.strip_prefix("./").unwrap_or(path);
    match path.strip_suffix('/') {
        Some(dir) => (dir, true),
        None => (path, false),
    }
}

/// Matches path segments against pattern segments, `**` spanning zero or more segments.
fn match_tokens(path: &[&str], pattern: &[Segment]) -> bool {
    let Some((head, rest)) = pattern.split_first() else {
        return path.is_empty();
    };

    if matches!(head, Segment::AnyDepth) {
        if match_tokens(path, rest) {
            return true;
        }
        return !path.is_empty() && match_tokens(&path[1..], pattern);
    }

    match path.split_first() {
        Some((segment, remaining)) => head.is_match(segment) && match_tokens(remaining, rest),
        None => false,
    }
}
