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

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ntc::{AdcParams, NtcParams};
use crate::sensor::SensorData;
use crate::thermostat::ThermostatConfig;

/// Unit used for console output
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    C,
    F,
    K,
}

impl Metric {
    pub fn format(&self, data: &SensorData) -> String {
        match self {
            Metric::C => format!("{:.1} °C", data.t_celsius),
            Metric::F => format!("{:.1} °F", data.t_fahrenheit),
            Metric::K => format!("{:.1} K", data.t_kelvin),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub ntc: NtcParams,
    #[serde(default)]
    pub adc: AdcParams,
    #[serde(default)]
    pub thermostat: ThermostatConfig,
    #[serde(default)]
    pub metric: Metric,
}

pub fn config_path() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return Path::new(&xdg).join("thermistat").join("config.json");
    }
    if let Ok(home) = env::var("HOME") {
        return Path::new(&home)
            .join(".config")
            .join("thermistat")
            .join("config.json");
    }
    PathBuf::from("/etc/thermistat/config.json")
}

pub fn validate_config(cfg: &AppConfig) -> Result<()> {
    cfg.ntc.validate()?;
    cfg.adc.validate()?;
    cfg.thermostat.validate()?;
    Ok(())
}

pub fn load_config(path: &Path) -> Result<AppConfig> {
    let data = fs::read_to_string(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg: AppConfig = serde_json::from_str(&data)?;
    validate_config(&cfg)?;
    Ok(cfg)
}

/// Load the config at `config_path()`, or defaults if no file exists there
pub fn load_or_default() -> Result<AppConfig> {
    let path = config_path();
    if path.exists() {
        load_config(&path)
    } else {
        Ok(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adc::Attenuation;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn write_config(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_metric_serialization() {
        assert_eq!(serde_json::to_string(&Metric::C).unwrap(), "\"c\"");
        assert_eq!(serde_json::from_str::<Metric>("\"k\"").unwrap(), Metric::K);
    }

    #[test]
    fn test_metric_format() {
        let mut data = SensorData::new(34);
        data.t_celsius = 21.04;
        data.t_fahrenheit = 69.87;
        data.t_kelvin = 294.19;
        assert_eq!(Metric::C.format(&data), "21.0 °C");
        assert_eq!(Metric::F.format(&data), "69.9 °F");
        assert_eq!(Metric::K.format(&data), "294.2 K");
    }

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.ntc, NtcParams::RS_10K);
        assert_eq!(cfg.adc, AdcParams::esp32(34, Attenuation::Db11));
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"{
                "ntc": { "series_resistance": 20000, "nominal_resistance": 10000, "beta": 3950 },
                "adc": {
                    "pin": 35, "ntc_to_ground": false, "adc_max": 4095, "attenuation": "db6",
                    "vcc_mv": 3300, "vref_mv": 1800, "voff_mv": 90
                },
                "thermostat": { "lower_limit_c": 19.5, "upper_limit_c": 21.5, "poll_interval_ms": 2000 },
                "metric": "f"
            }"#,
        );
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.ntc.beta, 3950.0);
        assert_eq!(cfg.adc.pin, 35);
        assert!(!cfg.adc.ntc_to_ground);
        assert_eq!(cfg.adc.attenuation, Attenuation::Db6);
        assert_eq!(cfg.thermostat.upper_limit_c, 21.5);
        assert!(cfg.thermostat.enabled);
        assert_eq!(cfg.metric, Metric::F);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let file = write_config(r#"{ "thermostat": { "lower_limit_c": 5, "upper_limit_c": 7 } }"#);
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.ntc, NtcParams::default());
        assert_eq!(cfg.thermostat.lower_limit_c, 5.0);
        assert_eq!(cfg.metric, Metric::C);
    }

    #[test]
    fn test_load_rejects_unknown_fields() {
        let file = write_config(r#"{ "fans": [] }"#);
        assert!(matches!(load_config(file.path()), Err(Error::JsonParse(_))));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let file = write_config(r#"{ "ntc": { "series_resistance": 0, "nominal_resistance": 10000, "beta": 2800 } }"#);
        assert!(matches!(
            load_config(file.path()),
            Err(Error::ConfigurationInvalid { ref field, .. }) if field == "ntc.series_resistance"
        ));

        let file = write_config(r#"{ "thermostat": { "lower_limit_c": 22, "upper_limit_c": 18 } }"#);
        assert!(matches!(load_config(file.path()), Err(Error::ConfigurationInvalid { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.json");
        match load_config(&path) {
            Err(Error::FileRead { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected FileRead, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_catches_each_section() {
        let mut cfg = AppConfig::default();
        cfg.adc.vref_mv = cfg.adc.voff_mv;
        assert!(validate_config(&cfg).is_err());

        let mut cfg = AppConfig::default();
        cfg.adc.adc_max = 0;
        assert!(validate_config(&cfg).is_err());

        let mut cfg = AppConfig::default();
        cfg.thermostat.poll_interval_ms = 0;
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    #[serial]
    fn test_config_path_with_xdg() {
        env::set_var("XDG_CONFIG_HOME", "/custom/config");
        let path = config_path();
        assert_eq!(path, PathBuf::from("/custom/config/thermistat/config.json"));
        env::remove_var("XDG_CONFIG_HOME");
    }

    #[test]
    #[serial]
    fn test_config_path_with_home() {
        env::remove_var("XDG_CONFIG_HOME");
        let old_home = env::var("HOME").ok();
        env::set_var("HOME", "/home/testuser");
        let path = config_path();
        assert_eq!(path, PathBuf::from("/home/testuser/.config/thermistat/config.json"));
        match old_home {
            Some(h) => env::set_var("HOME", h),
            None => env::remove_var("HOME"),
        }
    }

    #[test]
    #[serial]
    fn test_load_or_default_without_file() {
        let dir = TempDir::new().unwrap();
        env::set_var("XDG_CONFIG_HOME", dir.path());
        let cfg = load_or_default().unwrap();
        assert_eq!(cfg, AppConfig::default());

        let cfg_dir = dir.path().join("thermistat");
        fs::create_dir_all(&cfg_dir).unwrap();
        fs::write(cfg_dir.join("config.json"), r#"{ "metric": "k" }"#).unwrap();
        assert_eq!(load_or_default().unwrap().metric, Metric::K);
        env::remove_var("XDG_CONFIG_HOME");
    }
}
