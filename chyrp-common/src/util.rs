use std::borrow::Cow;
use thiserror::Error;
use time::Duration;

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Default, Hash)]
pub struct PositiveDuration(Duration);

impl PositiveDuration {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        duration.is_positive().then_some(Self(duration))
    }

    /// `0` means "no duration" and yields `None`, like a missing value would.
    #[must_use]
    pub fn from_seconds(seconds: u64) -> Option<Self> {
        i64::try_from(seconds)
            .ok()
            .and_then(|seconds| Self::new(Duration::seconds(seconds)))
    }

    #[must_use]
    pub fn get(&self) -> Duration {
        self.0
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The duration is not positive: {0}")]
pub struct NonPositiveDurationError(Duration);

impl TryFrom<Duration> for PositiveDuration {
    type Error = NonPositiveDurationError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(NonPositiveDurationError(value))
    }
}

/// Cuts `text` after `max_chars` characters, appending `...` only if something was cut.
#[must_use]
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => Cow::Owned(format!("{}...", &text[..byte_index])),
        None => Cow::Borrowed(text),
    }
}

#[cfg(test)]
mod tests {
    use crate::util::{PositiveDuration, truncate_with_ellipsis};
    use std::borrow::Cow;
    use time::Duration;

    #[test]
    fn positive_durations() {
        assert!(PositiveDuration::new(Duration::seconds(1)).is_some());
        assert!(PositiveDuration::new(Duration::ZERO).is_none());
        assert!(PositiveDuration::new(Duration::seconds(-5)).is_none());

        assert_eq!(PositiveDuration::from_seconds(0), None);
        assert_eq!(
            PositiveDuration::from_seconds(60).map(|duration| duration.get()),
            Some(Duration::minutes(1))
        );
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        assert!(matches!(truncate_with_ellipsis("short", 10), Cow::Borrowed("short")));
        assert_eq!(truncate_with_ellipsis("exactly", 7), "exactly");
        assert_eq!(truncate_with_ellipsis("exactly!", 7), "exactly...");
        assert_eq!(truncate_with_ellipsis("äöüß", 2), "äö...");
    }
}
