use crate::errors::CalError;
use crate::series::SeriesMap;
use serde::{Deserialize, Serialize};

/// Unit a temperature series is stored or reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TempUnit {
    Celsius,
    Fahrenheit,
}

pub fn fahrenheit_to_celsius(v: f64) -> f64 {
    (v - 32.0) / 1.8
}

pub fn celsius_to_fahrenheit(v: f64) -> f64 {
    (v * 1.8) + 32.0
}

impl TempUnit {
    pub fn parse(s: &str) -> Result<Self, CalError> {
        match s {
            "C" | "c" => Ok(TempUnit::Celsius),
            "F" | "f" => Ok(TempUnit::Fahrenheit),
            other => Err(CalError::Format(format!(
                "Unknown temperature unit [{}], expected C or F",
                other
            ))),
        }
    }

    /// Convert a value in this unit to the target unit.
    pub fn convert_to(&self, target: TempUnit, v: f64) -> f64 {
        match (self, target) {
            (TempUnit::Celsius, TempUnit::Fahrenheit) => celsius_to_fahrenheit(v),
            (TempUnit::Fahrenheit, TempUnit::Celsius) => fahrenheit_to_celsius(v),
            _ => v,
        }
    }
}

/// Convert every sample of every series from one unit to another.
pub fn convert_series(map: &mut SeriesMap, from: TempUnit, to: TempUnit) {
    if from == to {
        return;
    }
    for series in map.values_mut() {
        for sample in series.iter_mut() {
            sample.1 = from.convert_to(to, sample.1);
        }
    }
}

impl std::fmt::Display for TempUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TempUnit::Celsius => write!(f, "C"),
            TempUnit::Fahrenheit => write!(f, "F"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_conversion() {
        assert_eq!(celsius_to_fahrenheit(0.0), 32.0);
        assert_eq!(celsius_to_fahrenheit(100.0), 212.0);
        assert_eq!(fahrenheit_to_celsius(32.0), 0.0);
        assert!((fahrenheit_to_celsius(212.0) - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_convert_to() {
        assert_eq!(TempUnit::Celsius.convert_to(TempUnit::Celsius, 21.5), 21.5);
        assert_eq!(
            TempUnit::Celsius.convert_to(TempUnit::Fahrenheit, 100.0),
            212.0
        );
        assert_eq!(
            TempUnit::Fahrenheit.convert_to(TempUnit::Celsius, 32.0),
            0.0
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!(TempUnit::parse("C").unwrap(), TempUnit::Celsius);
        assert_eq!(TempUnit::parse("f").unwrap(), TempUnit::Fahrenheit);
        assert!(TempUnit::parse("K").is_err());
    }

    #[test]
    fn test_convert_series() {
        let ts = chrono::DateTime::parse_from_rfc3339("2023-05-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let mut map = SeriesMap::new();
        map.insert("sensor.a".to_owned(), vec![(ts, 0.0), (ts, 100.0)]);
        convert_series(&mut map, TempUnit::Celsius, TempUnit::Fahrenheit);
        let series = map.get("sensor.a").unwrap();
        assert_eq!(series[0].1, 32.0);
        assert_eq!(series[1].1, 212.0);
        // same unit leaves the values untouched
        convert_series(&mut map, TempUnit::Celsius, TempUnit::Celsius);
        assert_eq!(map.get("sensor.a").unwrap()[0].1, 32.0);
    }
}
