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

//! Analog input abstraction
//!
//! The NTC sensor reads its divider through this trait so the same conversion
//! code runs against a board ADC driver, the simulator, or a mock.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Input attenuation of the ADC channel
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attenuation {
    Db0,
    Db2_5,
    Db6,
    Db11,
}

impl Attenuation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attenuation::Db0 => "0 dB",
            Attenuation::Db2_5 => "2.5 dB",
            Attenuation::Db6 => "6 dB",
            Attenuation::Db11 => "11 dB",
        }
    }
}

impl fmt::Display for Attenuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait AnalogInput {
    /// Put the pin into analog input mode with the given attenuation
    fn configure(&mut self, pin: u8, attenuation: Attenuation) -> Result<()>;

    /// Take one raw sample from the pin
    fn read_raw(&mut self, pin: u8) -> Result<u16>;
}

impl<T: AnalogInput + ?Sized> AnalogInput for Box<T> {
    fn configure(&mut self, pin: u8, attenuation: Attenuation) -> Result<()> {
        (**self).configure(pin, attenuation)
    }

    fn read_raw(&mut self, pin: u8) -> Result<u16> {
        (**self).read_raw(pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attenuation_serialization() {
        assert_eq!(serde_json::to_string(&Attenuation::Db0).unwrap(), "\"db0\"");
        assert_eq!(serde_json::to_string(&Attenuation::Db2_5).unwrap(), "\"db2_5\"");
        assert_eq!(serde_json::to_string(&Attenuation::Db11).unwrap(), "\"db11\"");
    }

    #[test]
    fn test_attenuation_deserialization() {
        assert_eq!(serde_json::from_str::<Attenuation>("\"db6\"").unwrap(), Attenuation::Db6);
        assert!(serde_json::from_str::<Attenuation>("\"db12\"").is_err());
    }

    #[test]
    fn test_boxed_input_forwards() {
        let mut mock = MockAnalogInput::new();
        mock.expect_read_raw().withf(|pin| *pin == 34).returning(|_| Ok(1234));
        let mut boxed: Box<dyn AnalogInput> = Box::new(mock);
        assert_eq!(boxed.read_raw(34).unwrap(), 1234);
    }
}
