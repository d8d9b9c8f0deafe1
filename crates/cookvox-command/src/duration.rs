//! Duration phrase parsing shared by timer commands and the rest of the app.

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

use crate::numbers::parse_small_number;

static SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?P<num>\d+|[a-z]+(?:[ -]five)?)\s+(?P<unit>seconds?|secs?|minutes?|mins?|hours?|hrs?)\b",
    )
    .expect("duration segment regex")
});

static HALF_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bhalf\s+an?\s+(?P<unit>minute|hour)\b").expect("half-unit regex")
});

static TRAILING_HALF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:seconds?|secs?|minutes?|mins?|hours?|hrs?)\s+and\s+a\s+half\b")
        .expect("trailing-half regex")
});

fn unit_seconds(unit: &str) -> u64 {
    let unit = unit.to_ascii_lowercase();
    if unit.starts_with("hour") || unit.starts_with("hr") {
        3600
    } else if unit.starts_with("min") {
        60
    } else {
        1
    }
}

/// Parse a spoken duration phrase into a [`Duration`].
///
/// Handles digit and word numbers, multiple segments ("1 hour 20 minutes"),
/// and half forms ("half an hour", "an hour and a half", "two minutes and a
/// half"). Returns `None` when no duration phrase is present.
pub fn parse_duration_phrase(text: &str) -> Option<Duration> {
    // Normalize "half an hour" / "half a minute" so the segment scan below
    // does not see the bare "an hour" inside them.
    let text = HALF_UNIT.replace_all(text, |caps: &regex::Captures| {
        match unit_seconds(&caps["unit"]) {
            3600 => "30 minutes".to_string(),
            _ => "30 seconds".to_string(),
        }
    });

    let mut total_secs: u64 = 0;
    let mut matched = false;

    for caps in SEGMENT.captures_iter(&text) {
        let Some(count) = parse_small_number(&caps["num"]) else {
            continue;
        };
        total_secs += count as u64 * unit_seconds(&caps["unit"]);
        matched = true;
    }

    // "an hour and a half", "two minutes and a half": the segment scan has
    // already counted the whole units; add the trailing half.
    if let Some(m) = TRAILING_HALF.find(&text) {
        let unit = m.as_str().split_whitespace().next().unwrap_or("seconds");
        total_secs += unit_seconds(unit) / 2;
        matched = true;
    }

    if matched && total_secs > 0 {
        Some(Duration::from_secs(total_secs))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(text: &str) -> Option<u64> {
        parse_duration_phrase(text).map(|d| d.as_secs())
    }

    #[test]
    fn plain_units() {
        assert_eq!(secs("10 minutes"), Some(600));
        assert_eq!(secs("90 seconds"), Some(90));
        assert_eq!(secs("2 hours"), Some(7200));
        assert_eq!(secs("1 min"), Some(60));
    }

    #[test]
    fn word_numbers_match_digits() {
        assert_eq!(secs("ten minutes"), secs("10 minutes"));
        assert_eq!(secs("five seconds"), Some(5));
        assert_eq!(secs("an hour"), Some(3600));
        assert_eq!(secs("a minute"), Some(60));
    }

    #[test]
    fn half_forms() {
        assert_eq!(secs("half an hour"), Some(1800));
        assert_eq!(secs("half a minute"), Some(30));
        assert_eq!(secs("an hour and a half"), Some(5400));
        assert_eq!(secs("a minute and a half"), Some(90));
    }

    #[test]
    fn compound_segments_sum() {
        assert_eq!(secs("1 hour 20 minutes"), Some(4800));
        assert_eq!(secs("2 minutes 30 seconds"), Some(150));
    }

    #[test]
    fn embedded_in_a_sentence() {
        assert_eq!(secs("set a timer for 10 minutes please"), Some(600));
    }

    #[test]
    fn no_duration_is_none() {
        assert_eq!(secs("start the timer"), None);
        assert_eq!(secs("what temperature for the oven"), None);
    }
}
