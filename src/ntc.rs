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

//! NTC thermistor in a voltage divider
//!
//! ```text
//!    ---+--- Vcc                 ---+--- Vcc
//!       |                           |
//!      [Rs]                       [NTC]
//!       |                           |
//!       +---> Vin (ADC)             +---> Vin (ADC)
//!       |                           |
//!     [NTC]                        [Rs]
//!       |                           |
//!    ---+--- GND                 ---+--- GND
//!   ntc_to_ground = true       ntc_to_ground = false
//! ```
//!
//! The raw sample is turned back into the divider voltage, the divider ratio
//! gives the NTC resistance, and the beta equation gives the temperature:
//!
//! ```text
//! Roo = Ro * exp(-beta / To)        (To = 298.15 K, computed once)
//! T   = beta / ln(Rt / Roo)
//! ```

use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::adc::{AnalogInput, Attenuation};
use crate::error::{Error, Result};
use crate::sensor::{ReadingStatus, Sensor, SensorData, ABSOLUTE_ZERO_C, NOMINAL_TEMP_C};

/// NTC calibration: series resistor, nominal resistance at 25 °C and beta
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NtcParams {
    /// Rs in ohms
    pub series_resistance: f64,
    /// Ro in ohms at 25 °C
    pub nominal_resistance: f64,
    /// Material constant in K
    pub beta: f64,
}

impl NtcParams {
    /// 10k NTC (B 2800) with a 10k series resistor
    pub const RS_10K: Self = Self {
        series_resistance: 10_000.0,
        nominal_resistance: 10_000.0,
        beta: 2800.0,
    };

    /// 10k NTC (B 2800) with a 20k series resistor
    pub const RS_20K: Self = Self {
        series_resistance: 20_000.0,
        nominal_resistance: 10_000.0,
        beta: 2800.0,
    };

    pub fn validate(&self) -> Result<()> {
        check_positive("ntc.series_resistance", self.series_resistance)?;
        check_positive("ntc.nominal_resistance", self.nominal_resistance)?;
        check_positive("ntc.beta", self.beta)?;
        Ok(())
    }
}

impl Default for NtcParams {
    fn default() -> Self {
        Self::RS_10K
    }
}

/// ADC channel calibration. Voltages are in millivolts.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdcParams {
    pub pin: u8,
    /// true if the NTC sits between the ADC pin and GND, false if between Vcc and the pin
    pub ntc_to_ground: bool,
    /// Largest digital value the ADC produces
    pub adc_max: u16,
    pub attenuation: Attenuation,
    pub vcc_mv: f64,
    pub vref_mv: f64,
    pub voff_mv: f64,
}

impl AdcParams {
    /// ESP32 12-bit ADC, NTC to ground, with the measured range of each attenuation level
    pub fn esp32(pin: u8, attenuation: Attenuation) -> Self {
        let (vref_mv, voff_mv) = match attenuation {
            Attenuation::Db0 => (1100.0, 65.0),
            Attenuation::Db2_5 => (1300.0, 65.0),
            Attenuation::Db6 => (1800.0, 90.0),
            Attenuation::Db11 => (3200.0, 130.0),
        };
        Self {
            pin,
            ntc_to_ground: true,
            adc_max: 4095,
            attenuation,
            vcc_mv: 3300.0,
            vref_mv,
            voff_mv,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.adc_max == 0 {
            return Err(Error::invalid_config("adc.adc_max", "must be greater than 0"));
        }
        check_positive("adc.vcc_mv", self.vcc_mv)?;
        check_positive("adc.vref_mv", self.vref_mv)?;
        if !self.voff_mv.is_finite() || self.voff_mv < 0.0 {
            return Err(Error::invalid_config("adc.voff_mv", "must be finite and not negative"));
        }
        if self.vref_mv <= self.voff_mv {
            return Err(Error::invalid_config("adc.vref_mv", "must exceed adc.voff_mv"));
        }
        Ok(())
    }
}

impl Default for AdcParams {
    fn default() -> Self {
        Self::esp32(34, Attenuation::Db11)
    }
}

fn check_positive(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::invalid_config(field, format!("must be finite and positive, got {}", value)))
    }
}

/// Every intermediate value of one conversion
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Conversion {
    pub v: f64,
    pub vin: f64,
    pub k: f64,
    pub rt: f64,
    pub t_kelvin: f64,
    pub t_celsius: f64,
    pub t_fahrenheit: f64,
}

/// Pure raw-sample to temperature conversion for one calibration
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NtcModel {
    ntc: NtcParams,
    adc: AdcParams,
    roo: f64,
    v: f64,
}

impl NtcModel {
    pub fn new(ntc: NtcParams, adc: AdcParams) -> Result<Self> {
        ntc.validate()?;
        adc.validate()?;
        let roo = ntc.nominal_resistance * (-ntc.beta / (NOMINAL_TEMP_C - ABSOLUTE_ZERO_C)).exp();
        let v = (adc.vref_mv - adc.voff_mv) / adc.adc_max as f64;
        Ok(Self { ntc, adc, roo, v })
    }

    pub fn ntc(&self) -> &NtcParams {
        &self.ntc
    }

    pub fn adc(&self) -> &AdcParams {
        &self.adc
    }

    /// NTC resistance for T -> infinity
    pub fn roo(&self) -> f64 {
        self.roo
    }

    /// Millivolts per ADC step
    pub fn volts_per_step(&self) -> f64 {
        self.v
    }

    /// Reconstructed input voltage in mV for a raw sample
    pub fn input_voltage(&self, raw: u16) -> f64 {
        raw as f64 * self.v + self.adc.voff_mv
    }

    pub fn convert(&self, raw: u16) -> Result<Conversion> {
        if raw > self.adc.adc_max {
            return Err(Error::invalid_reading(
                raw,
                format!("sample above ADC maximum {}", self.adc.adc_max),
            ));
        }

        let vin = self.input_voltage(raw);
        if vin >= self.adc.vcc_mv {
            return Err(Error::invalid_reading(
                raw,
                format!("input voltage {:.1} mV at or above supply {:.1} mV", vin, self.adc.vcc_mv),
            ));
        }

        let mut k = vin / (self.adc.vcc_mv - vin);
        if !self.adc.ntc_to_ground {
            k = 1.0 / k;
        }
        if !(k.is_finite() && k > 0.0) {
            return Err(Error::invalid_reading(raw, format!("divider ratio {} out of range", k)));
        }

        let rt = self.ntc.series_resistance * k;
        let (t_kelvin, t_celsius, t_fahrenheit) = self
            .temperature_from_resistance(rt)
            .map_err(|reason| Error::invalid_reading(raw, reason))?;

        Ok(Conversion {
            v: self.v,
            vin,
            k,
            rt,
            t_kelvin,
            t_celsius,
            t_fahrenheit,
        })
    }

    /// Beta equation for a resistance. Returns (K, °C, °F) or the reason it is out of domain.
    pub fn temperature_from_resistance(&self, rt: f64) -> std::result::Result<(f64, f64, f64), String> {
        if !(rt.is_finite() && rt > 0.0) {
            return Err(format!("resistance {} ohm out of range", rt));
        }
        let ln_ratio = (rt / self.roo).ln();
        // ln(1) == 0 when Rt == Roo
        if !(ln_ratio.is_finite() && ln_ratio > 0.0) {
            return Err(format!("ln(Rt/Roo) = {} gives no finite temperature", ln_ratio));
        }
        let t_kelvin = self.ntc.beta / ln_ratio;
        let t_celsius = t_kelvin + ABSOLUTE_ZERO_C;
        let t_fahrenheit = t_celsius * 9.0 / 5.0 + 32.0;
        Ok((t_kelvin, t_celsius, t_fahrenheit))
    }

    /// NTC resistance at a temperature
    pub fn resistance_at(&self, celsius: f64) -> f64 {
        self.roo * (self.ntc.beta / (celsius - ABSOLUTE_ZERO_C)).exp()
    }

    /// Fractional raw sample the ADC would report for an NTC resistance
    pub fn raw_for_resistance(&self, rt: f64) -> f64 {
        let ratio = if self.adc.ntc_to_ground {
            rt / self.ntc.series_resistance
        } else {
            self.ntc.series_resistance / rt
        };
        let vin = self.adc.vcc_mv * ratio / (1.0 + ratio);
        (vin - self.adc.voff_mv) / self.v
    }

    pub fn raw_for_celsius(&self, celsius: f64) -> f64 {
        self.raw_for_resistance(self.resistance_at(celsius))
    }

    /// Copy of this model with another beta; Roo is computed for the new value
    pub fn with_beta(&self, beta: f64) -> Result<Self> {
        Self::new(NtcParams { beta, ..self.ntc }, self.adc)
    }
}

/// NTC sensor reading its divider through an `AnalogInput`
pub struct NtcSensor<A> {
    input: A,
    model: NtcModel,
    data: SensorData,
}

impl<A: AnalogInput> NtcSensor<A> {
    pub fn new(ntc: NtcParams, adc: AdcParams, input: A) -> Result<Self> {
        let model = NtcModel::new(ntc, adc)?;
        let mut data = SensorData::new(adc.pin);
        data.roo = model.roo();
        data.v = model.volts_per_step();
        Ok(Self { input, model, data })
    }

    pub fn model(&self) -> &NtcModel {
        &self.model
    }

    pub fn input_mut(&mut self) -> &mut A {
        &mut self.input
    }

    pub fn set_beta(&mut self, beta: f64) -> Result<()> {
        self.model = self.model.with_beta(beta)?;
        self.data.roo = self.model.roo();
        info!(beta, roo = self.model.roo(), "NTC beta updated");
        Ok(())
    }

    /// Dump the NTC and ADC calibration
    pub fn print_params(&self, out: &mut dyn Write) -> io::Result<()> {
        let ntc = self.model.ntc();
        let adc = self.model.adc();
        writeln!(out, "--- NTC Parameters ---")?;
        writeln!(out, "beta        {:.0}", ntc.beta)?;
        writeln!(out, "Ro          {:.0}", ntc.nominal_resistance)?;
        writeln!(out, "Rs          {:.0}", ntc.series_resistance)?;
        writeln!(out, "Roo      {:7.5}", self.model.roo())?;
        writeln!(out, "To       {:7.2} °C", NOMINAL_TEMP_C)?;
        writeln!(out, "Tabs     {:7.2} °C", ABSOLUTE_ZERO_C)?;
        writeln!(out, "--- ADC Parameters ---")?;
        writeln!(out, "Pin         {}", adc.pin)?;
        writeln!(out, "Analog Max  {}", adc.adc_max)?;
        writeln!(out, "Atten       {}", adc.attenuation)?;
        writeln!(out, "NTC to      {}", if adc.ntc_to_ground { "GND" } else { "Vcc" })?;
        writeln!(out, "Vcc        {:5.0} mV", adc.vcc_mv)?;
        writeln!(out, "Vref       {:5.0} mV", adc.vref_mv)?;
        writeln!(out, "Voff       {:5.0} mV", adc.voff_mv)?;
        writeln!(out)
    }
}

impl<A: AnalogInput> Sensor for NtcSensor<A> {
    fn setup(&mut self) -> Result<()> {
        let adc = *self.model.adc();
        self.input.configure(adc.pin, adc.attenuation)?;
        match self.read_sensor() {
            Ok(()) => info!(pin = adc.pin, celsius = self.data.t_celsius, "NTC sensor ready"),
            Err(e) if e.is_recoverable() => warn!(pin = adc.pin, "NTC sensor ready, initial reading discarded: {}", e),
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn read_sensor(&mut self) -> Result<()> {
        let raw = match self.input.read_raw(self.model.adc().pin) {
            Ok(raw) => raw,
            Err(e) => {
                self.data.rejected_value = None;
                self.data.status = ReadingStatus::Discarded;
                return Err(e);
            }
        };
        match self.model.convert(raw) {
            Ok(c) => {
                self.data.analog_value = raw;
                self.data.rejected_value = None;
                self.data.v = c.v;
                self.data.vin = c.vin;
                self.data.k = c.k;
                self.data.rt = c.rt;
                self.data.t_kelvin = c.t_kelvin;
                self.data.t_celsius = c.t_celsius;
                self.data.t_fahrenheit = c.t_fahrenheit;
                self.data.status = ReadingStatus::Valid;
                debug!(raw, rt = c.rt, celsius = c.t_celsius, "NTC sample converted");
                Ok(())
            }
            Err(e) => {
                self.data.rejected_value = Some(raw);
                self.data.status = ReadingStatus::Discarded;
                Err(e)
            }
        }
    }

    fn data(&self) -> &SensorData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut SensorData {
        &mut self.data
    }
}
