//! Unit conversions applied at classification time.
//!
//! The remote service transmits temperature in Celsius and pressure in
//! kilopascals. Derived units are computed once here with fixed one-decimal
//! rounding; nothing downstream converts again.

use crate::reading::types::SensorValue;

const KPA_PER_PSI: f64 = 6.894_757_293_168_36;
const KPA_PER_BAR: f64 = 100.0;

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Build a temperature value from a raw Celsius sample.
pub fn temperature_from_celsius(raw: f64) -> SensorValue {
    SensorValue::Temperature {
        celsius: round1(raw),
        fahrenheit: round1(raw * 9.0 / 5.0 + 32.0),
    }
}

/// Build a pressure value from a raw kilopascal sample.
pub fn pressure_from_kilopascals(raw: f64) -> SensorValue {
    SensorValue::Pressure {
        kilopascals: round1(raw),
        psi: round1(raw / KPA_PER_PSI),
        bar: round1(raw / KPA_PER_BAR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round1_rounds_half_away_from_zero() {
        assert_eq!(round1(12.34), 12.3);
        assert_eq!(round1(12.35), 12.4);
        assert_eq!(round1(-3.25), -3.3);
    }

    #[test]
    fn temperature_derives_fahrenheit() {
        let value = temperature_from_celsius(21.56);
        assert_eq!(
            value,
            SensorValue::Temperature {
                celsius: 21.6,
                fahrenheit: 70.8,
            }
        );
    }

    #[test]
    fn pressure_derives_psi_and_bar() {
        let value = pressure_from_kilopascals(827.4);
        match value {
            SensorValue::Pressure {
                kilopascals,
                psi,
                bar,
            } => {
                assert_eq!(kilopascals, 827.4);
                assert_eq!(psi, 120.0);
                assert_eq!(bar, 8.3);
            }
            other => panic!("expected pressure, got {other:?}"),
        }
    }

    #[test]
    fn zero_celsius_is_freezing_fahrenheit() {
        assert_eq!(
            temperature_from_celsius(0.0),
            SensorValue::Temperature {
                celsius: 0.0,
                fahrenheit: 32.0,
            }
        );
    }
}
