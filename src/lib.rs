// lib.rs

use std::fmt;

pub use anyhow::{anyhow, bail};
pub use chrono::{DateTime, Utc};
pub use log::*;
pub use serde::{Deserialize, Serialize};
pub use tokio::time::{sleep, Duration};

mod config;
pub use config::*;

mod sht21;
pub use sht21::*;

mod wifi;
pub use wifi::*;

mod publish;
pub use publish::*;

mod agent;
pub use agent::*;

#[cfg(test)]
mod testutil;

pub const FW_VERSION: &str = env!("CARGO_PKG_VERSION");

/// One temperature/humidity sample. Only constructible from finite values,
/// so holding a `Reading` means it is fit to publish.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    temperature: f32,
    humidity: f32,
    taken_at: DateTime<Utc>,
}

impl Reading {
    pub fn new(temperature: f32, humidity: f32) -> Option<Self> {
        Self::at(temperature, humidity, Utc::now())
    }

    pub fn at(temperature: f32, humidity: f32, taken_at: DateTime<Utc>) -> Option<Self> {
        if temperature.is_finite() && humidity.is_finite() {
            Some(Reading {
                temperature,
                humidity,
                taken_at,
            })
        } else {
            None
        }
    }

    /// degrees Celsius
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// percent relative humidity
    pub fn humidity(&self) -> f32 {
        self.humidity
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2}°C, {:.2}%RH",
            self.temperature, self.humidity
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_rejects_non_finite_values() {
        assert!(Reading::new(f32::NAN, 40.0).is_none());
        assert!(Reading::new(21.0, f32::NAN).is_none());
        assert!(Reading::new(f32::INFINITY, 40.0).is_none());
        assert!(Reading::new(0.0, 0.0).is_some());
    }

    #[test]
    fn reading_display() {
        let r = Reading::new(23.456, 45.678).unwrap();
        assert_eq!(r.to_string(), "23.46°C, 45.68%RH");
    }
}

// EOF
