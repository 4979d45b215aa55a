//! Drone simulator
//!
//! A drone with a fixed identity that wanders randomly and publishes its
//! position at a fixed interval.

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;

use super::publisher::RelayPublisher;
use crate::codec::PositionRecord;
use crate::error::{DecodeError, Result};
use crate::router::Topic;

/// Topic simulated drones publish on
pub const DEFAULT_TOPIC: &str = "drone/position";

/// Starting latitude in decimal degrees
pub const INITIAL_LATITUDE: f64 = 48.8581824;

/// Starting longitude in decimal degrees
pub const INITIAL_LONGITUDE: f64 = 2.212730400000055;

/// Largest change in either coordinate per step, in degrees
pub const MAX_STEP: f64 = 0.001;

/// Default publish interval
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// A simulated drone
#[derive(Debug, Clone)]
pub struct Drone {
    publisher_id: String,
    name: String,
    latitude: f64,
    longitude: f64,
}

impl Drone {
    /// Create a drone at the given position
    pub fn new(
        publisher_id: impl Into<String>,
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            publisher_id: publisher_id.into(),
            name: name.into(),
            latitude,
            longitude,
        }
    }

    /// Create a drone at the default starting position
    pub fn at_default_position(publisher_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(publisher_id, name, INITIAL_LATITUDE, INITIAL_LONGITUDE)
    }

    /// Identifier published as `uuid`
    pub fn publisher_id(&self) -> &str {
        &self.publisher_id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current latitude in decimal degrees
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Current longitude in decimal degrees
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Move by up to [`MAX_STEP`] on each axis, staying inside valid ranges
    pub fn step<R: Rng>(&mut self, rng: &mut R) {
        self.latitude = (self.latitude + rng.gen_range(-MAX_STEP..=MAX_STEP)).clamp(-90.0, 90.0);
        self.longitude =
            (self.longitude + rng.gen_range(-MAX_STEP..=MAX_STEP)).clamp(-180.0, 180.0);
    }

    /// Current position as a record stamped `timestamp`
    pub fn position(&self, timestamp: u64) -> std::result::Result<PositionRecord, DecodeError> {
        PositionRecord::new(
            timestamp,
            self.publisher_id.clone(),
            self.name.clone(),
            self.latitude,
            self.longitude,
        )
    }

    /// Publish, step and sleep until `shutdown` resolves
    ///
    /// A rejected record is logged and the loop goes on; losing the
    /// connection ends it.
    pub async fn run<F>(
        mut self,
        publisher: &mut RelayPublisher,
        topic: &Topic,
        interval: Duration,
        shutdown: F,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(published = publisher.published(), "Simulator stopped");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            let record = self.position(unix_timestamp())?;
            match publisher.publish(topic, &record).await {
                Ok(()) => tracing::info!(
                    publisher = %self.publisher_id,
                    latitude = self.latitude,
                    longitude = self.longitude,
                    "Position published"
                ),
                Err(crate::error::Error::Rejected(reason)) => {
                    tracing::warn!(reason = %reason, "Position rejected by relay")
                }
                Err(e) => return Err(e),
            }

            self.step(&mut rand::thread_rng());
        }
    }
}

/// Seconds since the Unix epoch
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_default_position() {
        let drone = Drone::at_default_position("d-1", "Alpha");
        assert_eq!(drone.latitude(), INITIAL_LATITUDE);
        assert_eq!(drone.longitude(), INITIAL_LONGITUDE);
    }

    #[test]
    fn test_step_is_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut drone = Drone::at_default_position("d-1", "Alpha");

        for _ in 0..1000 {
            let (lat, lon) = (drone.latitude(), drone.longitude());
            drone.step(&mut rng);
            assert!((drone.latitude() - lat).abs() <= MAX_STEP + f64::EPSILON);
            assert!((drone.longitude() - lon).abs() <= MAX_STEP + f64::EPSILON);
        }
    }

    #[test]
    fn test_step_clamps_at_pole() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut drone = Drone::new("d-1", "Alpha", 90.0, 180.0);

        for _ in 0..100 {
            drone.step(&mut rng);
            assert!(drone.latitude() <= 90.0);
            assert!(drone.longitude() <= 180.0);
        }
    }

    #[test]
    fn test_position_record() {
        let drone = Drone::new("d-1", "Alpha", 1.5, -2.5);
        let record = drone.position(42).unwrap();

        assert_eq!(record.timestamp(), 42);
        assert_eq!(record.publisher_id(), "d-1");
        assert_eq!(record.name(), "Alpha");
        assert_eq!(record.latitude(), 1.5);
        assert_eq!(record.longitude(), -2.5);
    }

    #[test]
    fn test_position_rejects_empty_identity() {
        let drone = Drone::new("", "Alpha", 0.0, 0.0);
        assert!(drone.position(1).is_err());
    }

    #[test]
    fn test_unix_timestamp_is_recent() {
        // 2020-09-13
        assert!(unix_timestamp() > 1_600_000_000);
    }
}
