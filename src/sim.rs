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

//! Simulated room, ADC and heating relay for running the thermostat on a host.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info};

use crate::adc::{AnalogInput, Attenuation};
use crate::error::{Error, Result};
use crate::ntc::NtcModel;

#[derive(Debug, Clone, PartialEq)]
struct RoomState {
    celsius: f64,
    ambient_c: f64,
    heating: bool,
    /// °C per second added while heating
    heat_rate: f64,
    /// Fraction of the gap to ambient lost per second
    loss_rate: f64,
}

/// First-order thermal model of a heated room. Clones share the same state.
#[derive(Debug, Clone)]
pub struct SimulatedRoom {
    state: Rc<RefCell<RoomState>>,
}

impl SimulatedRoom {
    pub fn new(initial_c: f64, ambient_c: f64) -> Self {
        Self {
            state: Rc::new(RefCell::new(RoomState {
                celsius: initial_c,
                ambient_c,
                heating: false,
                heat_rate: 0.05,
                loss_rate: 0.002,
            })),
        }
    }

    pub fn with_rates(self, heat_rate: f64, loss_rate: f64) -> Self {
        {
            let mut s = self.state.borrow_mut();
            s.heat_rate = heat_rate;
            s.loss_rate = loss_rate;
        }
        self
    }

    pub fn celsius(&self) -> f64 {
        self.state.borrow().celsius
    }

    pub fn set_celsius(&self, celsius: f64) {
        self.state.borrow_mut().celsius = celsius;
    }

    pub fn is_heating(&self) -> bool {
        self.state.borrow().heating
    }

    pub fn set_heating(&self, on: bool) {
        self.state.borrow_mut().heating = on;
    }

    /// Advance the model by `dt`
    pub fn step(&self, dt: Duration) {
        let mut s = self.state.borrow_mut();
        let secs = dt.as_secs_f64();
        let loss = (s.celsius - s.ambient_c) * s.loss_rate * secs;
        let gain = if s.heating { s.heat_rate * secs } else { 0.0 };
        s.celsius += gain - loss;
    }
}

/// ADC that samples the room through the inverse NTC model
pub struct SimulatedAdc {
    room: SimulatedRoom,
    model: NtcModel,
    configured: Option<(u8, Attenuation)>,
    injected: VecDeque<u16>,
}

impl SimulatedAdc {
    pub fn new(room: SimulatedRoom, model: NtcModel) -> Self {
        Self {
            room,
            model,
            configured: None,
            injected: VecDeque::new(),
        }
    }

    /// Queue a raw sample returned instead of the room's next reading
    pub fn inject_raw(&mut self, raw: u16) {
        self.injected.push_back(raw);
    }
}

impl AnalogInput for SimulatedAdc {
    fn configure(&mut self, pin: u8, attenuation: Attenuation) -> Result<()> {
        if pin != self.model.adc().pin {
            return Err(Error::Adc {
                pin,
                reason: format!("no NTC wired to pin {}", pin),
            });
        }
        self.configured = Some((pin, attenuation));
        debug!(pin, %attenuation, "simulated ADC configured");
        Ok(())
    }

    fn read_raw(&mut self, pin: u8) -> Result<u16> {
        match self.configured {
            Some((configured, _)) if configured == pin => {}
            _ => {
                return Err(Error::Adc {
                    pin,
                    reason: "pin not configured".to_string(),
                })
            }
        }
        if let Some(raw) = self.injected.pop_front() {
            return Ok(raw);
        }
        let max = self.model.adc().adc_max as f64;
        let raw = self.model.raw_for_celsius(self.room.celsius()).round().clamp(0.0, max);
        Ok(raw as u16)
    }
}

/// Heating output driving the simulated room
#[derive(Debug, Clone)]
pub struct SimulatedRelay {
    room: SimulatedRoom,
    switches: u32,
}

impl SimulatedRelay {
    pub fn new(room: SimulatedRoom) -> Self {
        Self { room, switches: 0 }
    }

    pub fn set(&mut self, on: bool) {
        if self.room.is_heating() != on {
            self.switches += 1;
            info!(on, "relay switched");
        }
        self.room.set_heating(on);
    }

    pub fn is_on(&self) -> bool {
        self.room.is_heating()
    }

    /// Number of state changes so far
    pub fn switches(&self) -> u32 {
        self.switches
    }
}
