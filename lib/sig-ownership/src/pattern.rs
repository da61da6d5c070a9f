use regex::Regex;
use tracing::warn;

/// Marks a single directory wildcard inside an ownership path pattern, e.g. `docs/*/readme.md`
pub const DIRECTORY_WILDCARD: &str = "/*/";

// `regex::escape` output for DIRECTORY_WILDCARD
const ESCAPED_DIRECTORY_WILDCARD: &str = r"/\*/";

// one path segment made of non-whitespace characters, bounded by separators
const SEGMENT_REGEX: &str = r"/[^\s/]+/";

/// A path pattern taken from an ownership relation.
///
/// Patterns without a [`DIRECTORY_WILDCARD`] match any path that contains them. Patterns with
/// one are compiled once so the same rule set can be checked against every changed file.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    wildcard: Option<Regex>,
}

impl PathPattern {
    pub fn new<S: Into<String>>(pattern: S) -> Result<Self, regex::Error> {
        let raw = pattern.into();
        let wildcard = if raw.contains(DIRECTORY_WILDCARD) {
            Some(wildcard_to_regex(&raw)?)
        } else {
            None
        };

        Ok(Self { raw, wildcard })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, file_path: &str) -> bool {
        match &self.wildcard {
            Some(re) => re.is_match(file_path),
            None => file_path.contains(&self.raw),
        }
    }
}

/// Checks a single changed file path against a single ownership pattern.
pub fn matches(file_path: &str, pattern: &str) -> bool {
    match PathPattern::new(pattern) {
        Ok(pattern) => pattern.matches(file_path),
        Err(e) => {
            warn!("ignoring ownership pattern {pattern}: {e}");
            false
        }
    }
}

/// Transform a wildcard ownership pattern into an unanchored regex.
/// Everything other than the wildcard marker is matched literally.
pub(crate) fn wildcard_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut pattern = regex::escape(pattern);

    // adjacent wildcards share a separator so a single pass would skip every other one
    while pattern.contains(ESCAPED_DIRECTORY_WILDCARD) {
        pattern = pattern.replacen(ESCAPED_DIRECTORY_WILDCARD, SEGMENT_REGEX, 1);
    }

    Regex::new(&pattern)
}
