use crate::errors::CalError;
use crate::humidity::calibrated_humidity;
use crate::segmented::SegmentedTable;
use serde::{Deserialize, Serialize};

/// A derived temperature breakpoint: what the sensor reported and what the
/// reference said at the same conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempPoint {
    pub measured: f64,
    pub reference: f64,
}

/// One humidity calibration anchor: reference temperature, the band's
/// reference humidity and the sensor's reading at that instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumAnchor {
    pub temp: f64,
    pub reference: f64,
    pub measured: f64,
}

/// A humidity band anchored at its coldest and warmest observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumBand {
    pub cold: HumAnchor,
    pub warm: HumAnchor,
}

/// Calibration derived for a single sensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sensor {
    pub name: String,
    pub temp_points: Vec<TempPoint>,
    pub hum_bands: Vec<HumBand>,
}

impl Sensor {
    pub fn new(name: &str, temp_points: Vec<TempPoint>, hum_bands: Vec<HumBand>) -> Self {
        Self {
            name: name.to_string(),
            temp_points,
            hum_bands,
        }
    }

    /// ESPHome `calibrate_linear` filter block for the temperature sensor.
    pub fn temp_calibration_yaml(&self) -> String {
        let mut output = vec![
            "calibrate_linear:".to_owned(),
            "  method: exact".to_owned(),
            "  datapoints:".to_owned(),
        ];
        for point in &self.temp_points {
            output.push(format!(
                "    - {:.3} -> {:.3}",
                point.measured, point.reference
            ));
        }
        output.join("\n").trim().to_owned()
    }

    /// ESPHome lambda correcting the humidity sensor.
    ///
    /// Only two bands are rendered; with more than two the first and last are
    /// used.
    pub fn hum_calibration_lambda(&self) -> Result<String, CalError> {
        let low = self.hum_bands.first().ok_or_else(|| {
            CalError::InsufficientData(format!(
                "Sensor [{}] has no humidity calibration bands",
                self.name
            ))
        })?;
        let high = self.hum_bands.last().unwrap();
        let ref_low_hum = format!("return {:?};", low.cold.reference);
        let ref_high_hum = format!("return {:?};", high.cold.reference);
        let raw_low_hum = format!(
            "{{{:.3}, {:.3}}}, {{{:.3}, {:.3}}}",
            low.cold.temp, low.cold.measured, low.warm.temp, low.warm.measured
        );
        let raw_high_hum = format!(
            "{{{:.3}, {:.3}}}, {{{:.3}, {:.3}}}",
            high.cold.temp, high.cold.measured, high.warm.temp, high.warm.measured
        );
        Ok(format!(
            "lambda: |-
  static auto expected1 = [](float x) -> float {{
    {}
  }};
  static auto expected2 = [](float x) -> float {{
    {}
  }};
  static auto measured1 = [](float x) -> float {{
    static std::vector<std::vector<float>> mapping = {{
      {}
    }};
    return segmented_linear(mapping, x);
  }};
  static auto measured2 = [](float x) -> float {{
    static std::vector<std::vector<float>> mapping = {{
      {}
    }};
    return segmented_linear(mapping, x);
  }};
  return calibrated_humidity(
    id(temperature).state,
    x, expected1, expected2, measured1, measured2
  );",
            ref_low_hum, ref_high_hum, raw_low_hum, raw_high_hum
        ))
    }

    /// Apply the derived temperature breakpoints to a raw reading.
    pub fn correct_temperature(&self, raw: f64) -> Result<f64, CalError> {
        let points = self
            .temp_points
            .iter()
            .map(|p| (p.measured, p.reference))
            .collect();
        let table = SegmentedTable::new(points)?;
        Ok(table.value_at(raw))
    }

    /// Apply the derived humidity correction to a raw reading, the in-process
    /// equivalent of the generated lambda.
    pub fn correct_humidity(&self, temp: f64, raw: f64) -> Result<f64, CalError> {
        let low = self.hum_bands.first().ok_or_else(|| {
            CalError::InsufficientData(format!(
                "Sensor [{}] has no humidity calibration bands",
                self.name
            ))
        })?;
        let high = self.hum_bands.last().unwrap();
        let measured1 = SegmentedTable::new(vec![
            (low.cold.temp, low.cold.measured),
            (low.warm.temp, low.warm.measured),
        ])?;
        let measured2 = SegmentedTable::new(vec![
            (high.cold.temp, high.cold.measured),
            (high.warm.temp, high.warm.measured),
        ])?;
        let expected_low = low.cold.reference;
        let expected_high = high.cold.reference;
        Ok(calibrated_humidity(
            temp,
            raw,
            move |_| expected_low,
            move |_| expected_high,
            |t| measured1.value_at(t),
            |t| measured2.value_at(t),
        ))
    }
}
