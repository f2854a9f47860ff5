use serde::Serialize;
use thiserror::Error;

pub const HASHTAG_MAX_LEN: usize = 50;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct HashtagMarker;

/// Lower-case tag name without the leading `#`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct HashtagName(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Hashtag {0:?} is longer than {HASHTAG_MAX_LEN} characters")]
pub struct InvalidHashtagError(String);

impl HashtagName {
    /// Normalizes a single raw token. Returns `Ok(None)` for tokens that are empty once
    /// whitespace and leading `#` are removed.
    pub fn normalize(raw: &str) -> Result<Option<Self>, InvalidHashtagError> {
        let name = raw.trim().trim_start_matches('#').trim().to_lowercase();

        if name.is_empty() {
            Ok(None)
        } else if name.chars().count() > HASHTAG_MAX_LEN {
            Err(InvalidHashtagError(name))
        } else {
            Ok(Some(Self(name)))
        }
    }

    /// Wraps a name read back from storage.
    #[must_use]
    pub fn from_stored(name: String) -> Self {
        Self(name)
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

/// Splits comma separated hashtag text into distinct names, keeping first-seen order.
pub fn parse_hashtags(text: &str) -> Result<Vec<HashtagName>, InvalidHashtagError> {
    let mut names: Vec<HashtagName> = Vec::new();

    for raw in text.split(',') {
        if let Some(name) = HashtagName::normalize(raw)?
            && !names.contains(&name)
        {
            names.push(name);
        }
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use crate::model::hashtag::{HASHTAG_MAX_LEN, parse_hashtags};

    fn names(text: &str) -> Vec<String> {
        parse_hashtags(text)
            .unwrap()
            .into_iter()
            .map(|name| name.get().to_owned())
            .collect()
    }

    #[test]
    fn mixed_case_duplicates_and_blanks() {
        assert_eq!(names("#Foo, bar ,, FOO"), ["foo", "bar"]);
    }

    #[test]
    fn empty_input() {
        assert!(names("").is_empty());
        assert!(names(" , ,# ,##").is_empty());
    }

    #[test]
    fn repeated_hashes_are_stripped() {
        assert_eq!(names("##rust, # async"), ["rust", "async"]);
    }

    #[test]
    fn overlong_tags_are_rejected() {
        assert!(parse_hashtags(&"x".repeat(HASHTAG_MAX_LEN)).is_ok());
        assert!(parse_hashtags(&"x".repeat(HASHTAG_MAX_LEN + 1)).is_err());
    }
}
