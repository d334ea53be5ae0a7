//! Processor configuration from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use flight_core::{BaseLocation, FlightRules, PositionSimulator};

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub database_max_connections: u32,
    pub notifier_url: String,
    pub status_port: u16,
    /// Deliberate wait between "processing" and validation
    pub processing_delay: Duration,
    /// Simulation tick
    pub position_update_interval: Duration,
    pub intake_interval: Duration,
    pub zone_refresh_interval: Duration,
    pub flight_speed_mps: f64,
    pub base_location: BaseLocation,
    pub rules: FlightRules,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "data/flights.db".to_string(),
            database_max_connections: 5,
            notifier_url: "http://localhost:1234".to_string(),
            status_port: 5051,
            processing_delay: Duration::from_secs(10),
            position_update_interval: Duration::from_millis(1000),
            intake_interval: Duration::from_secs(5),
            zone_refresh_interval: Duration::from_secs(300),
            flight_speed_mps: 15.0,
            base_location: BaseLocation::default(),
            rules: FlightRules::default(),
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let rules = FlightRules {
            min_altitude_m: env_or("MIN_ALTITUDE_M", defaults.rules.min_altitude_m),
            max_altitude_m: env_or("MAX_ALTITUDE_M", defaults.rules.max_altitude_m),
            proximity_stop_m: env_or("PROXIMITY_STOP_DISTANCE_M", defaults.rules.proximity_stop_m),
            proximity_warning_m: env_parse("PROXIMITY_WARNING_DISTANCE_M"),
            demo_pause_after: Duration::from_secs(env_or(
                "DEMO_PAUSE_AFTER_SECS",
                defaults.rules.demo_pause_after.as_secs(),
            )),
            demo_pause_duration: Duration::from_secs(env_or(
                "DEMO_PAUSE_DURATION_SECS",
                defaults.rules.demo_pause_duration.as_secs(),
            )),
            ..defaults.rules
        };

        Self {
            database_path: env::var("DATABASE_PATH").unwrap_or(defaults.database_path),
            database_max_connections: env_or(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            notifier_url: env::var("NOTIFIER_URL").unwrap_or(defaults.notifier_url),
            status_port: env_or("STATUS_PORT", defaults.status_port),
            processing_delay: Duration::from_secs(env_or("PROCESSING_DELAY_SECONDS", 10)),
            position_update_interval: Duration::from_millis(env_or(
                "POSITION_UPDATE_INTERVAL_MS",
                1000,
            )),
            intake_interval: Duration::from_secs(env_or("INTAKE_INTERVAL_SECS", 5)),
            zone_refresh_interval: Duration::from_secs(env_or("ZONE_REFRESH_SECS", 300)),
            flight_speed_mps: env_or("FLIGHT_SPEED_MS", defaults.flight_speed_mps),
            base_location: BaseLocation {
                lat: env_or("BASE_LATITUDE", defaults.base_location.lat),
                lon: env_or("BASE_LONGITUDE", defaults.base_location.lon),
                altitude_m: env_or("BASE_ALTITUDE", defaults.base_location.altitude_m),
            },
            rules,
            log_format: env_or("LOG_FORMAT", defaults.log_format),
        }
    }

    pub fn simulator(&self) -> PositionSimulator {
        PositionSimulator::new(self.flight_speed_mps, self.position_update_interval)
    }

    /// Returns a list of configuration problems (empty = valid).
    pub fn validate(&self) -> Vec<String> {
        let mut errors = self.rules.validate();

        if !(self.flight_speed_mps > 0.0) || !self.flight_speed_mps.is_finite() {
            errors.push(format!(
                "Flight speed must be positive, got {}",
                self.flight_speed_mps
            ));
        }
        if self.position_update_interval.is_zero() {
            errors.push("Position update interval must be positive".to_string());
        }
        if self.intake_interval.is_zero() {
            errors.push("Intake interval must be positive".to_string());
        }
        if self.zone_refresh_interval.is_zero() {
            errors.push("Zone refresh interval must be positive".to_string());
        }
        if !(-90.0..=90.0).contains(&self.base_location.lat)
            || !(-180.0..=180.0).contains(&self.base_location.lon)
        {
            errors.push(format!(
                "Base location ({}, {}) is not a valid coordinate",
                self.base_location.lat, self.base_location.lon
            ));
        }
        if self.database_max_connections == 0 {
            errors.push("Database pool needs at least one connection".to_string());
        }

        errors
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|raw| match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable environment value");
            None
        }
    })
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env_parse(key).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_empty(), "{:?}", config.validate());
        assert_eq!(config.processing_delay, Duration::from_secs(10));
        assert_eq!(config.rules.proximity_stop_m, 100.0);
        assert_eq!(config.status_port, 5051);
    }

    #[test]
    fn zero_speed_is_rejected() {
        let config = Config {
            flight_speed_mps: 0.0,
            ..Config::default()
        };
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Flight speed"));
    }

    #[test]
    fn inverted_altitude_bounds_are_rejected() {
        let mut config = Config::default();
        config.rules.min_altitude_m = 600.0;
        assert!(!config.validate().is_empty());
    }

    #[test]
    fn log_format_parses() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
