/*
 * This file is part of Thermistat.
 *
 * Copyright (C) 2025 Thermistat contributors
 *
 * Thermistat is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Thermistat is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Thermistat. If not, see <https://www.gnu.org/licenses/>.
 */

//! Unified error handling for Thermistat
//!
//! A single error type is shared by the sensor, the conversion model and the
//! thermostat. Sensor errors split into fatal initialization failures
//! (`SensorNotFound`) and recoverable per-sample failures (`InvalidReading`).

use std::io;
use std::path::PathBuf;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    // ============================================================================
    // Sensor Errors
    // ============================================================================
    #[error("Sensor not found: {sensor} (gave up after {attempts} attempt(s))")]
    SensorNotFound {
        sensor: String,
        attempts: u32,
    },

    #[error("Invalid reading (raw {raw}): {reason}")]
    InvalidReading {
        raw: u16,
        reason: String,
    },

    #[error("ADC error on pin {pin}: {reason}")]
    Adc {
        pin: u8,
        reason: String,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Invalid configuration value for {field}: {reason}")]
    ConfigurationInvalid {
        field: String,
        reason: String,
    },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },
}

impl Error {
    /// Create an invalid reading error for a raw sample
    pub fn invalid_reading(raw: u16, reason: impl Into<String>) -> Self {
        Self::InvalidReading {
            raw,
            reason: reason.into(),
        }
    }

    /// Create a configuration error for a named field
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigurationInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a sensor-not-found error
    pub fn sensor_not_found(sensor: impl Into<String>, attempts: u32) -> Self {
        Self::SensorNotFound {
            sensor: sensor.into(),
            attempts,
        }
    }

    /// Whether the control loop may continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidReading { .. } | Self::Adc { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_reading(4095, "log ratio is zero");
        assert_eq!(format!("{}", err), "Invalid reading (raw 4095): log ratio is zero");

        let err = Error::invalid_config("upper_limit_c", "must exceed lower limit");
        assert_eq!(
            format!("{}", err),
            "Invalid configuration value for upper_limit_c: must exceed lower limit"
        );

        let err = Error::sensor_not_found("bme280@0x76", 3);
        assert!(format!("{}", err).contains("bme280@0x76"));
        assert!(format!("{}", err).contains("3 attempt"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::JsonParse(_)));
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(Error::invalid_reading(0, "x").is_recoverable());
        assert!(Error::Adc { pin: 34, reason: "busy".into() }.is_recoverable());
        assert!(!Error::sensor_not_found("ntc", 1).is_recoverable());
        assert!(!Error::invalid_config("x", "y").is_recoverable());
    }
}
