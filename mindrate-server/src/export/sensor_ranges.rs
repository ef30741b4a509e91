//! Fixed value ranges behind the coarse sensor levels
//!
//! Units: light in lux, relative humidity in percent, ambient temperature in
//! °C, pressure in hPa, proximity in cm.

use mindrate_common::models::{Sensor, SensorLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorRange {
    pub min: i64,
    pub max: i64,
}

const fn range(min: i64, max: i64) -> SensorRange {
    SensorRange { min, max }
}

pub fn sensor_range(sensor: Sensor, level: SensorLevel) -> SensorRange {
    use SensorLevel::*;

    match sensor {
        Sensor::Light => match level {
            VeryLow => range(0, 4),
            Low => range(0, 50),
            Medium => range(50, 400),
            High => range(400, 40000),
            VeryHigh => range(1000, 40000),
        },
        Sensor::RelativeHumidity => match level {
            VeryLow => range(0, 20),
            Low => range(20, 40),
            Medium => range(40, 60),
            High => range(60, 80),
            VeryHigh => range(80, 100),
        },
        Sensor::AmbientTemperature => match level {
            VeryLow => range(-30, 0),
            Low => range(0, 10),
            Medium => range(10, 20),
            High => range(20, 30),
            VeryHigh => range(30, 50),
        },
        Sensor::Pressure => match level {
            VeryLow => range(870, 980),
            Low => range(980, 1000),
            Medium => range(1000, 1020),
            High => range(1020, 1040),
            VeryHigh => range(1040, 1090),
        },
        Sensor::Proximity => match level {
            VeryLow => range(0, 1),
            Low => range(1, 3),
            Medium => range(3, 5),
            High => range(5, 8),
            VeryHigh => range(8, 100),
        },
    }
}
