/*
 * Test utilities and mock helpers for Thermistat
 *
 * This module provides scripted sensors and assertion helpers shared by the
 * unit tests of different modules.
 */

#[cfg(test)]
pub mod test_utils {
    use std::collections::VecDeque;

    use crate::error::{Error, Result};
    use crate::sensor::{ReadingStatus, Sensor, SensorData, ABSOLUTE_ZERO_C};

    /// Sensor that replays a fixed series of temperatures.
    ///
    /// `None` entries are rejected samples. Once the script runs out the last
    /// temperature repeats.
    pub struct ScriptedSensor {
        script: VecDeque<std::result::Result<f64, Error>>,
        data: SensorData,
        fail_setup: bool,
        /// Calls to `read_sensor`
        pub reads: usize,
        /// Calls to `setup`
        pub setups: usize,
    }

    impl ScriptedSensor {
        pub fn new(temps: &[f64]) -> Self {
            Self::from_script(temps.iter().copied().map(Some).collect())
        }

        pub fn from_script(script: Vec<Option<f64>>) -> Self {
            Self {
                script: script
                    .into_iter()
                    .map(|step| step.ok_or_else(|| Error::invalid_reading(0, "scripted rejection")))
                    .collect(),
                data: SensorData::new(0),
                fail_setup: false,
                reads: 0,
                setups: 0,
            }
        }

        /// Sensor whose handshake never succeeds
        pub fn failing_setup() -> Self {
            Self {
                fail_setup: true,
                ..Self::from_script(Vec::new())
            }
        }

        /// Append a read that fails with `error`
        pub fn then_fail(mut self, error: Error) -> Self {
            self.script.push_back(Err(error));
            self
        }

        /// Append a read that reports `celsius`
        pub fn then(mut self, celsius: f64) -> Self {
            self.script.push_back(Ok(celsius));
            self
        }

        fn store(&mut self, celsius: f64) {
            self.data.t_celsius = celsius;
            self.data.t_kelvin = celsius - ABSOLUTE_ZERO_C;
            self.data.t_fahrenheit = celsius * 9.0 / 5.0 + 32.0;
            self.data.rejected_value = None;
            self.data.status = ReadingStatus::Valid;
        }
    }

    impl Sensor for ScriptedSensor {
        fn setup(&mut self) -> Result<()> {
            self.setups += 1;
            if self.fail_setup {
                return Err(Error::sensor_not_found("scripted", 3));
            }
            Ok(())
        }

        fn read_sensor(&mut self) -> Result<()> {
            self.reads += 1;
            match self.script.pop_front() {
                Some(Ok(celsius)) => {
                    self.store(celsius);
                    Ok(())
                }
                Some(Err(e)) => {
                    self.data.rejected_value = match &e {
                        Error::InvalidReading { raw, .. } => Some(*raw),
                        _ => None,
                    };
                    self.data.status = ReadingStatus::Discarded;
                    Err(e)
                }
                None => {
                    let last = self.data.t_celsius;
                    self.store(last);
                    Ok(())
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

    /// Asserts that two floating point numbers are approximately equal
    pub fn assert_approx_eq(a: f64, b: f64, tolerance: f64) {
        assert!(
            (a - b).abs() < tolerance,
            "Values {} and {} are not approximately equal (tolerance: {})",
            a, b, tolerance
        );
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use crate::error::Error;
    use crate::sensor::{ReadingStatus, Sensor};

    #[test]
    fn test_scripted_sensor_replays_and_repeats() {
        let mut sensor = ScriptedSensor::new(&[20.0, 21.5]);
        sensor.read_sensor().unwrap();
        assert_eq!(sensor.celsius(), 20.0);
        sensor.read_sensor().unwrap();
        assert_eq!(sensor.celsius(), 21.5);
        sensor.read_sensor().unwrap();
        assert_eq!(sensor.celsius(), 21.5);
        assert_eq!(sensor.reads, 3);
        assert_approx_eq(sensor.data().t_kelvin, 294.65, 1e-9);
    }

    #[test]
    fn test_scripted_sensor_rejection_keeps_last_value() {
        let mut sensor = ScriptedSensor::from_script(vec![Some(19.0), None]);
        sensor.read_sensor().unwrap();
        assert!(matches!(sensor.read_sensor(), Err(Error::InvalidReading { .. })));
        assert_eq!(sensor.celsius(), 19.0);
        assert_eq!(sensor.data().status, ReadingStatus::Discarded);
    }

    #[test]
    fn test_scripted_sensor_chosen_failure() {
        let mut sensor = ScriptedSensor::new(&[18.0])
            .then_fail(Error::Adc { pin: 7, reason: "bus fault".into() })
            .then(18.5);
        sensor.read_sensor().unwrap();
        assert!(matches!(sensor.read_sensor(), Err(Error::Adc { pin: 7, .. })));
        assert_eq!(sensor.data().rejected_value, None);
        assert_eq!(sensor.celsius(), 18.0);
        sensor.read_sensor().unwrap();
        assert_eq!(sensor.celsius(), 18.5);
    }

    #[test]
    fn test_failing_setup() {
        let mut sensor = ScriptedSensor::failing_setup();
        assert!(matches!(sensor.setup(), Err(Error::SensorNotFound { attempts: 3, .. })));
    }

    #[test]
    fn test_assert_approx_eq() {
        assert_approx_eq(1.0, 1.001, 0.01);
        assert_approx_eq(25.5, 25.49, 0.1);
    }

    #[test]
    #[should_panic]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq(1.0, 1.1, 0.01);
    }
}
