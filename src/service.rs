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

use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{AppConfig, Metric};
use crate::error::Error;
use crate::logger;
use crate::ntc::{NtcModel, NtcSensor};
use crate::sensor::{Sensor, SensorData};
use crate::sim::{SimulatedAdc, SimulatedRelay, SimulatedRoom};
use crate::thermostat::{PollOutcome, Thermostat, ThermostatEvents};

/// Upper bound on how long the loop sleeps between ticks
const MAX_LOOP_SLEEP: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Stop after this many polls; run forever if `None`
    pub polls: Option<u64>,
    /// Write events to the JSON event log
    pub logging: bool,
    /// Dump NTC, ADC and thermostat parameters before the first poll
    pub print_params: bool,
    pub initial_celsius: f64,
    pub ambient_celsius: f64,
    /// Raw samples the simulated ADC serves before the room's readings, starting with the first poll
    pub injected_raw: Vec<u16>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            polls: None,
            logging: false,
            print_params: false,
            initial_celsius: 16.0,
            ambient_celsius: 10.0,
            injected_raw: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSummary {
    /// Successful polls
    pub polls: u64,
    pub discarded: u64,
    pub relay_switches: u32,
    pub heating: bool,
    pub last_celsius: f64,
}

/// Console and event-log output; drives the relay
struct ServiceEvents<W> {
    relay: SimulatedRelay,
    metric: Metric,
    out: W,
    logging: bool,
    last_celsius: f64,
    write_failed: bool,
}

impl<W: Write> ServiceEvents<W> {
    fn new(relay: SimulatedRelay, metric: Metric, out: W, logging: bool) -> Self {
        Self {
            relay,
            metric,
            out,
            logging,
            last_celsius: 0.0,
            write_failed: false,
        }
    }

    /// Write one console line. The first failure is logged, later ones are dropped.
    fn print(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{}", line) {
            if !self.write_failed {
                warn!("console output failed, further lines dropped: {}", e);
                self.write_failed = true;
            }
        }
    }

    fn record(&self, event: &str, data: serde_json::Value) {
        if self.logging {
            logger::log_event(event, data);
        }
    }
}

impl<W: Write> ThermostatEvents for ServiceEvents<W> {
    fn on_tick(&mut self, data: &SensorData) {
        self.last_celsius = data.t_celsius;
        let line = format!(
            "{}  raw {:4}  Rt {:7.0} Ohm  heating {}",
            self.metric.format(data),
            data.analog_value,
            data.rt,
            if self.relay.is_on() { "on" } else { "off" }
        );
        self.print(&line);
        self.record("poll", serde_json::to_value(data).unwrap_or_default());
    }

    fn on_below_lower_limit(&mut self) {
        self.relay.set(true);
        self.print("heating ON");
        self.record("heating_on", json!({ "celsius": self.last_celsius }));
    }

    fn on_above_upper_limit(&mut self) {
        self.relay.set(false);
        self.print("heating OFF");
        self.record("heating_off", json!({ "celsius": self.last_celsius }));
    }

    fn on_invalid_reading(&mut self, error: &Error) {
        self.print(&format!("reading discarded: {}", error));
        self.record("reading_discarded", json!({ "error": error.to_string() }));
    }
}

/// Run the thermostat against the simulated room on the wall clock, printing to stdout
pub fn run_service(config: &AppConfig, options: &ServiceOptions) -> Result<ServiceSummary> {
    let clock = SystemClock::new();
    run_with(config, options, &clock, io::stdout(), thread::sleep)
}

/// Service loop with an injectable clock, output and sleep
pub fn run_with<C, W, F>(
    config: &AppConfig,
    options: &ServiceOptions,
    clock: &C,
    mut out: W,
    mut sleep: F,
) -> Result<ServiceSummary>
where
    C: Clock,
    W: Write,
    F: FnMut(Duration),
{
    info!(polls = ?options.polls, "starting thermostat service");

    let model = NtcModel::new(config.ntc, config.adc).context("NTC model")?;
    let room = SimulatedRoom::new(options.initial_celsius, options.ambient_celsius);
    let adc = SimulatedAdc::new(room.clone(), model);
    let sensor = NtcSensor::new(config.ntc, config.adc, adc).context("NTC sensor")?;

    if options.print_params {
        sensor.print_params(&mut out).context("print parameters")?;
    }

    let mut events = ServiceEvents::new(SimulatedRelay::new(room.clone()), config.metric, out, options.logging);
    events.last_celsius = room.celsius();
    let mut thermostat =
        Thermostat::with_clock(sensor, config.thermostat, events, clock).context("thermostat")?;
    thermostat.setup().context("sensor setup")?;

    for raw in &options.injected_raw {
        thermostat.sensor_mut().input_mut().inject_raw(*raw);
    }

    if options.print_params {
        let mut buf = Vec::new();
        thermostat.print_settings(&mut buf).context("print settings")?;
        thermostat.events_mut().out.write_all(&buf).context("print settings")?;
    }

    let (polls, discarded) = drive(&mut thermostat, &room, clock, options.polls, &mut sleep)?;

    let summary = ServiceSummary {
        polls,
        discarded,
        relay_switches: thermostat.events().relay.switches(),
        heating: thermostat.is_heating(),
        last_celsius: thermostat.sensor().celsius(),
    };
    info!(polls, discarded, switches = summary.relay_switches, "thermostat service stopped");
    Ok(summary)
}

/// Tick until `wanted` polls have been attempted. Returns (successful, discarded).
fn drive<S, W, C, F>(
    thermostat: &mut Thermostat<S, ServiceEvents<W>, &C>,
    room: &SimulatedRoom,
    clock: &C,
    wanted: Option<u64>,
    sleep: &mut F,
) -> Result<(u64, u64)>
where
    S: Sensor,
    W: Write,
    C: Clock,
    F: FnMut(Duration),
{
    let loop_sleep = thermostat.config().poll_interval().min(MAX_LOOP_SLEEP);
    let mut polls = 0u64;
    let mut discarded = 0u64;
    let mut last = clock.now();

    while wanted.map_or(true, |n| polls + discarded < n) {
        let now = clock.now();
        room.step(now.saturating_sub(last));
        last = now;

        match thermostat.tick() {
            PollOutcome::NotDue => sleep(loop_sleep),
            PollOutcome::Polled { .. } => polls += 1,
            PollOutcome::Discarded(e) if e.is_recoverable() => discarded += 1,
            PollOutcome::Discarded(e) => {
                warn!("sensor failed: {}", e);
                return Err(anyhow::Error::new(e).context("read sensor"));
            }
        }
    }
    Ok((polls, discarded))
}
