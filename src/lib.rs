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

//! Thermistat - NTC thermistor sensing and hysteresis heating control
//!
//! This library converts raw ADC samples from an NTC voltage divider into
//! temperatures and drives a two-threshold heating thermostat from them.

pub mod adc;
pub mod clock;
pub mod config;
pub mod error;
pub mod logger;
pub mod ntc;
pub mod sensor;
pub mod service;
pub mod sim;
pub mod thermostat;

pub use error::{Error, Result};

#[cfg(test)]
pub mod test_utils;
