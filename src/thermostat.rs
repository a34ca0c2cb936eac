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

//! Hysteresis thermostat
//!
//! The thermostat polls its sensor at a fixed interval and switches heating
//! with two thresholds:
//!
//! ```text
//!            enable()                 t < lower
//! Disabled ----------> Idle ------------------------> Heating
//!     ^                  ^     on_below_lower_limit      |
//!     |                  |                               |
//!     |                  +-------------------------------+
//!     |                          t >= upper
//!     |                     on_above_upper_limit
//!     +---- disable() from any state
//! ```
//!
//! Heating callbacks are edge-triggered: each crossing produces exactly one
//! command. `tick()` never blocks; when the interval has not elapsed it
//! returns `PollOutcome::NotDue` immediately.

use std::fmt;
use std::io::{self, Write};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::sensor::{Sensor, SensorData};

/// Longest accepted poll interval (one day)
pub const MAX_POLL_INTERVAL_MS: u64 = 86_400_000;

fn default_lower_limit() -> f64 { 18.0 }
fn default_upper_limit() -> f64 { 22.0 }
fn default_poll_interval_ms() -> u64 { 5000 }
fn default_enabled() -> bool { true }

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThermostatConfig {
    #[serde(default = "default_lower_limit")]
    pub lower_limit_c: f64,
    #[serde(default = "default_upper_limit")]
    pub upper_limit_c: f64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for ThermostatConfig {
    fn default() -> Self {
        Self {
            lower_limit_c: default_lower_limit(),
            upper_limit_c: default_upper_limit(),
            poll_interval_ms: default_poll_interval_ms(),
            enabled: default_enabled(),
        }
    }
}

impl ThermostatConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.lower_limit_c.is_finite() {
            return Err(Error::invalid_config("thermostat.lower_limit_c", "must be finite"));
        }
        if !self.upper_limit_c.is_finite() {
            return Err(Error::invalid_config("thermostat.upper_limit_c", "must be finite"));
        }
        if self.upper_limit_c <= self.lower_limit_c {
            return Err(Error::invalid_config(
                "thermostat.upper_limit_c",
                format!(
                    "upper limit {} °C must exceed lower limit {} °C",
                    self.upper_limit_c, self.lower_limit_c
                ),
            ));
        }
        if self.poll_interval_ms == 0 || self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(Error::invalid_config(
                "thermostat.poll_interval_ms",
                format!("must be within 1..={} ms", MAX_POLL_INTERVAL_MS),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThermostatState {
    Disabled,
    /// Armed, heating off
    Idle,
    /// Armed, heating on
    Heating,
}

impl fmt::Display for ThermostatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ThermostatState::Disabled => "disabled",
            ThermostatState::Idle => "idle",
            ThermostatState::Heating => "heating",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Transition {
    HeatingOn,
    HeatingOff,
}

/// Result of one `tick()`
#[derive(Debug)]
pub enum PollOutcome {
    /// The poll interval has not elapsed yet
    NotDue,
    Polled {
        celsius: f64,
        transition: Option<Transition>,
    },
    /// The read failed or the sample was rejected; the previous reading stays in place
    Discarded(Error),
}

impl PollOutcome {
    pub fn is_polled(&self) -> bool {
        matches!(self, PollOutcome::Polled { .. })
    }

    pub fn transition(&self) -> Option<Transition> {
        match self {
            PollOutcome::Polled { transition, .. } => *transition,
            _ => None,
        }
    }
}

/// Handlers the thermostat drives
#[cfg_attr(test, mockall::automock)]
pub trait ThermostatEvents {
    /// After every successful poll
    fn on_tick(&mut self, data: &SensorData);

    /// Temperature dropped below the lower limit: turn heating on
    fn on_below_lower_limit(&mut self);

    /// Temperature reached the upper limit: turn heating off
    fn on_above_upper_limit(&mut self);

    fn on_invalid_reading(&mut self, _error: &Error) {}
}

/// `ThermostatEvents` built from closures
pub struct Callbacks {
    on_tick: Box<dyn FnMut(&SensorData)>,
    on_below: Box<dyn FnMut()>,
    on_above: Box<dyn FnMut()>,
    on_invalid: Option<Box<dyn FnMut(&Error)>>,
}

impl Callbacks {
    pub fn new(
        on_tick: impl FnMut(&SensorData) + 'static,
        on_below_lower_limit: impl FnMut() + 'static,
        on_above_upper_limit: impl FnMut() + 'static,
    ) -> Self {
        Self {
            on_tick: Box::new(on_tick),
            on_below: Box::new(on_below_lower_limit),
            on_above: Box::new(on_above_upper_limit),
            on_invalid: None,
        }
    }

    pub fn with_invalid_reading(mut self, f: impl FnMut(&Error) + 'static) -> Self {
        self.on_invalid = Some(Box::new(f));
        self
    }
}

impl ThermostatEvents for Callbacks {
    fn on_tick(&mut self, data: &SensorData) {
        (self.on_tick)(data)
    }

    fn on_below_lower_limit(&mut self) {
        (self.on_below)()
    }

    fn on_above_upper_limit(&mut self) {
        (self.on_above)()
    }

    fn on_invalid_reading(&mut self, error: &Error) {
        if let Some(f) = self.on_invalid.as_mut() {
            f(error)
        }
    }
}

pub struct Thermostat<S, E, C = SystemClock> {
    sensor: S,
    events: E,
    clock: C,
    config: ThermostatConfig,
    state: ThermostatState,
    last_poll: Option<Duration>,
    polls: u64,
}

impl<S: Sensor, E: ThermostatEvents> Thermostat<S, E, SystemClock> {
    pub fn new(sensor: S, config: ThermostatConfig, events: E) -> Result<Self> {
        Self::with_clock(sensor, config, events, SystemClock::new())
    }
}

impl<S: Sensor, E: ThermostatEvents, C: Clock> Thermostat<S, E, C> {
    pub fn with_clock(sensor: S, config: ThermostatConfig, events: E, clock: C) -> Result<Self> {
        config.validate()?;
        let state = if config.enabled { ThermostatState::Idle } else { ThermostatState::Disabled };
        Ok(Self {
            sensor,
            events,
            clock,
            config,
            state,
            last_poll: None,
            polls: 0,
        })
    }

    /// Initialize the sensor. Its initial read starts the poll interval.
    pub fn setup(&mut self) -> Result<()> {
        self.sensor.setup()?;
        self.last_poll = Some(self.clock.now());
        info!(
            lower = self.config.lower_limit_c,
            upper = self.config.upper_limit_c,
            interval_ms = self.config.poll_interval_ms,
            "thermostat ready"
        );
        Ok(())
    }

    /// Poll the sensor if the interval has elapsed. Never blocks.
    pub fn tick(&mut self) -> PollOutcome {
        let now = self.clock.now();
        if let Some(last) = self.last_poll {
            if now.saturating_sub(last) < self.config.poll_interval() {
                return PollOutcome::NotDue;
            }
        }
        self.last_poll = Some(now);
        self.poll()
    }

    fn poll(&mut self) -> PollOutcome {
        if let Err(e) = self.sensor.read_sensor() {
            warn!("reading discarded: {}", e);
            self.events.on_invalid_reading(&e);
            return PollOutcome::Discarded(e);
        }
        self.polls += 1;

        let celsius = self.sensor.celsius();
        debug!(celsius, state = %self.state, "poll");
        self.events.on_tick(self.sensor.data());

        let transition = self.evaluate(celsius);
        PollOutcome::Polled { celsius, transition }
    }

    fn evaluate(&mut self, celsius: f64) -> Option<Transition> {
        match self.state {
            ThermostatState::Idle if celsius < self.config.lower_limit_c => {
                self.state = ThermostatState::Heating;
                info!(celsius, lower = self.config.lower_limit_c, "heating on");
                self.events.on_below_lower_limit();
                Some(Transition::HeatingOn)
            }
            ThermostatState::Heating if celsius >= self.config.upper_limit_c => {
                self.state = ThermostatState::Idle;
                info!(celsius, upper = self.config.upper_limit_c, "heating off");
                self.events.on_above_upper_limit();
                Some(Transition::HeatingOff)
            }
            _ => None,
        }
    }

    pub fn enable(&mut self) {
        if self.state == ThermostatState::Disabled {
            self.state = ThermostatState::Idle;
            info!("thermostat enabled");
        }
        self.config.enabled = true;
    }

    /// Stop switching. If heating is on, one final heating-off command is sent.
    pub fn disable(&mut self) {
        if self.state == ThermostatState::Heating {
            info!("heating off (thermostat disabled)");
            self.events.on_above_upper_limit();
        }
        if self.state != ThermostatState::Disabled {
            info!("thermostat disabled");
        }
        self.state = ThermostatState::Disabled;
        self.config.enabled = false;
    }

    /// Flip between enabled and disabled. Returns whether the thermostat is now enabled.
    pub fn toggle(&mut self) -> bool {
        if self.is_enabled() {
            self.disable();
        } else {
            self.enable();
        }
        self.is_enabled()
    }

    pub fn set_limits(&mut self, lower_limit_c: f64, upper_limit_c: f64) -> Result<()> {
        let candidate = ThermostatConfig {
            lower_limit_c,
            upper_limit_c,
            ..self.config
        };
        candidate.validate()?;
        self.config = candidate;
        info!(lower = lower_limit_c, upper = upper_limit_c, "limits updated");
        Ok(())
    }

    pub fn set_lower_limit(&mut self, lower_limit_c: f64) -> Result<()> {
        self.set_limits(lower_limit_c, self.config.upper_limit_c)
    }

    pub fn set_upper_limit(&mut self, upper_limit_c: f64) -> Result<()> {
        self.set_limits(self.config.lower_limit_c, upper_limit_c)
    }

    /// Keep the lower limit and place the upper limit `delta_c` above it
    pub fn set_temp_delta(&mut self, delta_c: f64) -> Result<()> {
        if !(delta_c.is_finite() && delta_c > 0.0) {
            return Err(Error::invalid_config("thermostat.temp_delta", "must be finite and positive"));
        }
        self.set_limits(self.config.lower_limit_c, self.config.lower_limit_c + delta_c)
    }

    pub fn set_poll_interval(&mut self, interval: Duration) -> Result<()> {
        let candidate = ThermostatConfig {
            poll_interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            ..self.config
        };
        candidate.validate()?;
        self.config = candidate;
        info!(interval_ms = self.config.poll_interval_ms, "poll interval updated");
        Ok(())
    }

    /// Replace limits, interval and enabled flag at once
    pub fn apply_config(&mut self, config: ThermostatConfig) -> Result<()> {
        config.validate()?;
        self.config.lower_limit_c = config.lower_limit_c;
        self.config.upper_limit_c = config.upper_limit_c;
        self.config.poll_interval_ms = config.poll_interval_ms;
        if config.enabled {
            self.enable();
        } else {
            self.disable();
        }
        Ok(())
    }

    pub fn config(&self) -> &ThermostatConfig {
        &self.config
    }

    pub fn state(&self) -> ThermostatState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state != ThermostatState::Disabled
    }

    pub fn is_heating(&self) -> bool {
        self.state == ThermostatState::Heating
    }

    /// Successful polls so far
    pub fn poll_count(&self) -> u64 {
        self.polls
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    pub fn print_settings(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "--- Thermostat Settings ---")?;
        writeln!(out, "State        {}", self.state)?;
        writeln!(out, "Lower limit  {:5.1} °C", self.config.lower_limit_c)?;
        writeln!(out, "Upper limit  {:5.1} °C", self.config.upper_limit_c)?;
        writeln!(out, "Interval     {} ms", self.config.poll_interval_ms)?;
        writeln!(out, "Polls        {}", self.polls)?;
        writeln!(out)
    }
}
