//! Topic and topic filter types
//!
//! Topics are `/`-delimited paths. A filter is either an exact topic or a
//! prefix ending in the `#` wildcard segment, which matches the rest of the
//! path (including nothing at all).

use std::fmt;
use std::str::FromStr;

use crate::error::ProtocolError;

/// Segment delimiter
pub const DELIMITER: char = '/';

/// Trailing multi-level wildcard segment
pub const WILDCARD: &str = "#";

/// Routing key for a published message
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic(String);

impl Topic {
    /// Parse and validate a topic
    ///
    /// Segments may be empty (`/drone/position` has a leading empty segment
    /// and is distinct from `drone/position`).
    pub fn new(topic: impl Into<String>) -> Result<Self, ProtocolError> {
        let topic = topic.into();
        if topic.is_empty()
            || topic.contains(|c: char| c == '#' || c == '\0' || c.is_whitespace())
        {
            return Err(ProtocolError::InvalidTopic(topic));
        }
        Ok(Self(topic))
    }

    /// Topic as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over path segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(DELIMITER)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Topic {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Subscription filter
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicFilter {
    raw: String,
    /// Segments before the wildcard (all segments for exact filters)
    prefix: Vec<String>,
    wildcard: bool,
}

impl TopicFilter {
    /// Parse and validate a filter
    pub fn new(filter: impl Into<String>) -> Result<Self, ProtocolError> {
        let raw = filter.into();
        if raw.is_empty() || raw.contains(|c: char| c == '\0' || c.is_whitespace()) {
            return Err(ProtocolError::InvalidFilter(raw));
        }

        let mut prefix: Vec<String> = raw.split(DELIMITER).map(str::to_owned).collect();
        let wildcard = prefix.last().is_some_and(|s| s == WILDCARD);
        if wildcard {
            prefix.pop();
        }

        // '#' is only meaningful as a whole trailing segment
        if prefix.iter().any(|s| s.contains('#')) {
            return Err(ProtocolError::InvalidFilter(raw));
        }

        Ok(Self {
            raw,
            prefix,
            wildcard,
        })
    }

    /// Filter matching exactly one topic
    pub fn exact(topic: &Topic) -> Self {
        Self {
            raw: topic.as_str().to_owned(),
            prefix: topic.segments().map(str::to_owned).collect(),
            wildcard: false,
        }
    }

    /// Filter as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the filter ends with the wildcard segment
    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Segments before the wildcard
    pub fn prefix(&self) -> &[String] {
        &self.prefix
    }

    /// Check a single topic against this filter
    pub fn matches(&self, topic: &Topic) -> bool {
        let mut segments = topic.segments();
        for expected in &self.prefix {
            match segments.next() {
                Some(seg) if seg == expected => {}
                _ => return false,
            }
        }
        self.wildcard || segments.next().is_none()
    }
}

impl fmt::Display for TopicFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for TopicFilter {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(s: &str) -> Topic {
        Topic::new(s).unwrap()
    }

    #[test]
    fn test_topic_validation() {
        assert!(Topic::new("drone/position").is_ok());
        assert!(Topic::new("/drone/position").is_ok());
        assert!(Topic::new("").is_err());
        assert!(Topic::new("drone/#").is_err());
        assert!(Topic::new("drone position").is_err());
    }

    #[test]
    fn test_topic_segments() {
        let t = topic("/drone/position");
        assert_eq!(t.segments().collect::<Vec<_>>(), vec!["", "drone", "position"]);
    }

    #[test]
    fn test_filter_parse() {
        let f = TopicFilter::new("drone/#").unwrap();
        assert!(f.is_wildcard());
        assert_eq!(f.prefix(), &["drone".to_string()]);

        let all = TopicFilter::new("#").unwrap();
        assert!(all.is_wildcard());
        assert!(all.prefix().is_empty());

        let exact = TopicFilter::new("drone/position").unwrap();
        assert!(!exact.is_wildcard());
    }

    #[test]
    fn test_filter_invalid() {
        assert!(TopicFilter::new("").is_err());
        assert!(TopicFilter::new("drone/#/position").is_err());
        assert!(TopicFilter::new("drone#").is_err());
        assert!(TopicFilter::new("drone/ #").is_err());
    }

    #[test]
    fn test_exact_match() {
        let f = TopicFilter::new("drone/position").unwrap();
        assert!(f.matches(&topic("drone/position")));
        assert!(!f.matches(&topic("drone/position/x")));
        assert!(!f.matches(&topic("drone")));
        assert!(!f.matches(&topic("Drone/position")));
        assert!(!f.matches(&topic("/drone/position")));
    }

    #[test]
    fn test_wildcard_match() {
        let f = TopicFilter::new("drone/#").unwrap();
        assert!(f.matches(&topic("drone/position")));
        assert!(f.matches(&topic("drone/battery")));
        assert!(f.matches(&topic("drone/a/b/c")));
        assert!(f.matches(&topic("drone")));
        assert!(!f.matches(&topic("rover/position")));
        assert!(!f.matches(&topic("drones/position")));
    }

    #[test]
    fn test_exact_from_topic() {
        let t = topic("drone/position");
        let f = TopicFilter::exact(&t);
        assert_eq!(f, TopicFilter::new("drone/position").unwrap());
        assert!(f.matches(&t));
    }
}
