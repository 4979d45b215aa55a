//! Position record type
//!
//! A `PositionRecord` can only be built through validation, so any value of
//! this type is known to be in range.

use crate::error::DecodeError;

/// Valid latitude range in decimal degrees
pub const LATITUDE_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;

/// Valid longitude range in decimal degrees
pub const LONGITUDE_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

/// A single geo-position sample reported by a publisher
#[derive(Debug, Clone, PartialEq)]
pub struct PositionRecord {
    timestamp: u64,
    publisher_id: String,
    name: String,
    latitude: f64,
    longitude: f64,
}

impl PositionRecord {
    /// Build a validated record
    pub fn new(
        timestamp: u64,
        publisher_id: impl Into<String>,
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self, DecodeError> {
        let publisher_id = publisher_id.into();
        let name = name.into();

        if publisher_id.is_empty() {
            return Err(DecodeError::InvalidField("uuid"));
        }
        if name.is_empty() {
            return Err(DecodeError::InvalidField("name"));
        }
        if !latitude.is_finite() || !LATITUDE_RANGE.contains(&latitude) {
            return Err(DecodeError::InvalidField("latitude"));
        }
        if !longitude.is_finite() || !LONGITUDE_RANGE.contains(&longitude) {
            return Err(DecodeError::InvalidField("longitude"));
        }

        Ok(Self {
            timestamp,
            publisher_id,
            name,
            latitude,
            longitude,
        })
    }

    /// Publisher-supplied timestamp (payload data only, never used for ordering)
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Stable publisher identity
    pub fn publisher_id(&self) -> &str {
        &self.publisher_id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Latitude in decimal degrees
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in decimal degrees
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_valid() {
        let record = PositionRecord::new(1531604906, "abc", "drone1", 48.85, 2.21).unwrap();
        assert_eq!(record.timestamp(), 1531604906);
        assert_eq!(record.publisher_id(), "abc");
        assert_eq!(record.name(), "drone1");
    }

    #[test]
    fn test_bounds_inclusive() {
        assert!(PositionRecord::new(0, "a", "b", 90.0, 180.0).is_ok());
        assert!(PositionRecord::new(0, "a", "b", -90.0, -180.0).is_ok());
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(
            PositionRecord::new(0, "a", "b", 90.5, 0.0),
            Err(DecodeError::InvalidField("latitude"))
        );
        assert_eq!(
            PositionRecord::new(0, "a", "b", 0.0, -180.1),
            Err(DecodeError::InvalidField("longitude"))
        );
        assert_eq!(
            PositionRecord::new(0, "a", "b", f64::NAN, 0.0),
            Err(DecodeError::InvalidField("latitude"))
        );
    }

    #[test]
    fn test_empty_strings() {
        assert_eq!(
            PositionRecord::new(0, "", "b", 0.0, 0.0),
            Err(DecodeError::InvalidField("uuid"))
        );
        assert_eq!(
            PositionRecord::new(0, "a", "", 0.0, 0.0),
            Err(DecodeError::InvalidField("name"))
        );
    }
}
