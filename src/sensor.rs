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

//! Sensor capability contract and the measurement record it maintains.

use std::io::{self, Write};

use serde::Serialize;

use crate::error::Result;

/// Nominal reference temperature of the NTC in °C
pub const NOMINAL_TEMP_C: f64 = 25.0;

/// Offset between Celsius and Kelvin, expressed in °C
pub const ABSOLUTE_ZERO_C: f64 = -273.15;

/// Outcome of the most recent read
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingStatus {
    /// No read has completed yet
    Pending,
    Valid,
    /// The last sample was rejected or could not be taken; derived values are from the previous valid read
    Discarded,
}

/// Latest raw and derived values of one sensor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorData {
    pub sensor_pin: u8,
    /// Raw ADC sample behind the derived values below
    pub analog_value: u16,
    /// Raw ADC sample that was last rejected; `None` if the ADC itself failed
    pub rejected_value: Option<u16>,
    /// Millivolts per ADC step
    pub v: f64,
    /// Reconstructed input voltage in mV
    pub vin: f64,
    /// Divider ratio Rt / Rs
    pub k: f64,
    /// NTC resistance in ohms
    pub rt: f64,
    /// NTC resistance for T -> infinity
    pub roo: f64,
    pub t_celsius: f64,
    pub t_fahrenheit: f64,
    pub t_kelvin: f64,
    pub status: ReadingStatus,
}

impl SensorData {
    pub fn new(sensor_pin: u8) -> Self {
        Self {
            sensor_pin,
            analog_value: 0,
            rejected_value: None,
            v: 0.0,
            vin: 0.0,
            k: 0.0,
            rt: 0.0,
            roo: 0.0,
            t_celsius: 0.0,
            t_fahrenheit: 0.0,
            t_kelvin: 0.0,
            status: ReadingStatus::Pending,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == ReadingStatus::Valid
    }

    /// Write the human-readable value dump
    pub fn write_report<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "--- Sensor Values ---")?;
        match self.status {
            ReadingStatus::Pending => writeln!(out, "Status       pending (no reading yet)")?,
            ReadingStatus::Valid => writeln!(out, "Status       valid")?,
            ReadingStatus::Discarded => match self.rejected_value {
                Some(raw) => writeln!(
                    out,
                    "Status       DISCARDED raw {} (showing last valid reading)",
                    raw
                )?,
                None => writeln!(
                    out,
                    "Status       DISCARDED no sample (showing last valid reading)"
                )?,
            },
        }
        writeln!(out, "Analog Value {}", self.analog_value)?;
        writeln!(out, "v        {:7.5} mV", self.v)?;
        writeln!(out, "Vin      {:7.0} mV", self.vin)?;
        writeln!(out, "k        {:7.5}", self.k)?;
        writeln!(out, "Rt         {:5.0} Ohm", self.rt)?;
        writeln!(out, "Tc         {:5.1} °C", self.t_celsius)?;
        writeln!(out, "Tf         {:5.1} °F", self.t_fahrenheit)?;
        writeln!(out, "Tk         {:5.1} K", self.t_kelvin)?;
        writeln!(out)
    }
}

/// Capabilities every temperature sensor offers to the thermostat.
///
/// Reads are explicit: `celsius()` returns whatever the last successful
/// `read_sensor()` stored, so the caller owns the refresh cadence.
pub trait Sensor {
    /// One-time hardware initialization followed by an initial read.
    ///
    /// Sensors that need a handshake return `Error::SensorNotFound` once their
    /// bounded retries are exhausted.
    fn setup(&mut self) -> Result<()>;

    /// Take a fresh sample and recompute every derived field.
    ///
    /// On any error the previous derived values are kept and the record is
    /// marked as discarded.
    fn read_sensor(&mut self) -> Result<()>;

    /// Temperature in °C from the last successful read
    fn celsius(&self) -> f64 {
        self.data().t_celsius
    }

    fn data(&self) -> &SensorData;

    fn data_mut(&mut self) -> &mut SensorData;

    /// Dump the current measurement record
    fn print_data(&self, out: &mut dyn Write) -> io::Result<()> {
        self.data().write_report(out)
    }
}
