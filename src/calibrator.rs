use crate::errors::CalError;
use crate::sensor::{HumAnchor, HumBand, Sensor, TempPoint};
use crate::series::{
    key_value, mean, pstdev, round_to, standardize, value_key, IntervalGrid, SeriesMap,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

pub(crate) const PRECISION: i32 = 3;
const GRID_INTERVAL_SECS: i64 = 30;
/// A value bucket needs more ticks than this to become a calibration candidate.
const MINIMUM_SAMPLES: usize = 4;
/// Candidate temperatures must be at least 2 degrees apart (bucket keys are tenths).
const CANDIDATE_SPACING_TENTHS: i64 = 20;

/// Derives per-sensor calibration from reference and uncalibrated series.
///
/// All series are resampled onto a common 30 second grid spanning the first
/// reference temperature series. Temperature calibration breakpoints come from
/// stable reference temperature buckets; humidity calibration anchors come
/// from the low and high reference humidity bands (mean -/+ one population
/// standard deviation) at their coldest and warmest observations.
#[derive(Debug, Clone)]
pub struct Calibrator {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    ref_temp: IntervalGrid,
    ref_hum: IntervalGrid,
    uncal_temps: BTreeMap<String, IntervalGrid>,
    uncal_hums: BTreeMap<String, IntervalGrid>,
    sensors: BTreeMap<String, Sensor>,
}

impl Calibrator {
    pub fn new(
        ref_temps: &SeriesMap,
        ref_hums: &SeriesMap,
        uncal_temps: &SeriesMap,
        uncal_hums: &SeriesMap,
    ) -> Result<Self, CalError> {
        let (start, end) = derive_start_end(ref_temps)?;
        let interval = Duration::seconds(GRID_INTERVAL_SECS);
        let ref_temp = standardize(ref_temps, start, end, interval);
        let ref_hum = standardize(ref_hums, start, end, interval);
        log::debug!(
            "Reference grids: {} temperature ticks, {} humidity ticks",
            ref_temp.by_time.len(),
            ref_hum.by_time.len()
        );
        let mut calibrator = Self {
            start,
            end,
            ref_temp,
            ref_hum,
            uncal_temps: per_sensor_grids(uncal_temps, start, end, interval),
            uncal_hums: per_sensor_grids(uncal_hums, start, end, interval),
            sensors: BTreeMap::new(),
        };
        calibrator.sensors = calibrator.process_sensors()?;
        log::info!("Derived calibration for {} sensor(s)", calibrator.sensors.len());
        Ok(calibrator)
    }

    pub fn sensors(&self) -> &BTreeMap<String, Sensor> {
        &self.sensors
    }

    /// Time span covered by the interval grid.
    pub fn span(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.start, self.end)
    }

    fn process_sensors(&self) -> Result<BTreeMap<String, Sensor>, CalError> {
        let hum_bands = self.process_humidity()?;
        let temp_points = self.process_temperatures();

        let temp_names: Vec<&String> = self.uncal_temps.keys().collect();
        let hum_names: Vec<&String> = self.uncal_hums.keys().collect();
        if temp_names.len() != hum_names.len() {
            return Err(CalError::Logic(format!(
                "The number of uncalibrated temperature sensors [{}] must be identical \
                 to the number of uncalibrated humidity sensors [{}]",
                temp_names.len(),
                hum_names.len()
            )));
        }

        let mut sensors = BTreeMap::new();
        for i in 0..temp_names.len() {
            let temp_name = temp_names[i];
            let hum_name = hum_names[i];
            let points = temp_points.get(temp_name).cloned().unwrap_or_default();
            let bands = hum_bands.get(hum_name).cloned().unwrap_or_default();
            sensors.insert(temp_name.clone(), Sensor::new(temp_name, points, bands));
        }
        Ok(sensors)
    }

    fn process_temperatures(&self) -> BTreeMap<String, Vec<TempPoint>> {
        // Reference temperatures only qualify as calibration candidates when
        // the grid held them for a while and they are spaced apart.
        let mut candidates: Vec<(f64, &Vec<DateTime<Utc>>)> = vec![];
        let mut last_key: Option<i64> = None;
        for (key, ticks) in &self.ref_temp.by_value {
            if ticks.len() > MINIMUM_SAMPLES
                && last_key.map_or(true, |lk| *key > lk + CANDIDATE_SPACING_TENTHS)
            {
                candidates.push((key_value(*key), ticks));
                last_key = Some(*key);
            }
        }
        log::debug!("{} candidate reference temperature(s)", candidates.len());

        let mut result = BTreeMap::new();
        for (name, grid) in &self.uncal_temps {
            let mut points = vec![];
            for (reference, ticks) in &candidates {
                let values: Vec<f64> = ticks
                    .iter()
                    .filter_map(|tick| grid.by_time.get(tick).copied())
                    .collect();
                if values.is_empty() {
                    log::warn!(
                        "Sensor [{}] has no interval data at reference temperature [{}]",
                        name,
                        reference
                    );
                    continue;
                }
                points.push(TempPoint {
                    measured: mean(&values),
                    reference: *reference,
                });
            }
            result.insert(name.clone(), points);
        }
        result
    }

    fn process_humidity(&self) -> Result<BTreeMap<String, Vec<HumBand>>, CalError> {
        let all_hums: Vec<f64> = self.ref_hum.by_time.values().copied().collect();
        if all_hums.is_empty() {
            return Err(CalError::InsufficientData(
                "The reference humidity grid is empty".to_owned(),
            ));
        }
        let hum_mean = mean(&all_hums);
        let hum_stddev = pstdev(&all_hums);
        let hum_low = round_to(hum_mean - hum_stddev, PRECISION);
        let hum_high = round_to(hum_mean + hum_stddev, PRECISION);
        log::debug!(
            "Reference humidity bands: low [{}], high [{}]",
            hum_low,
            hum_high
        );

        let low_anchors = self.band_anchors(hum_low)?;
        let high_anchors = self.band_anchors(hum_high)?;

        let mut result = BTreeMap::new();
        for (name, grid) in &self.uncal_hums {
            let anchor = |(temp, tick): (f64, DateTime<Utc>),
                          reference: f64|
             -> Result<HumAnchor, CalError> {
                let measured = grid.by_time.get(&tick).ok_or_else(|| {
                    CalError::InsufficientData(format!(
                        "Sensor [{}] has no interval data at [{}]",
                        name, tick
                    ))
                })?;
                Ok(HumAnchor {
                    temp,
                    reference,
                    measured: *measured,
                })
            };
            let bands = vec![
                HumBand {
                    cold: anchor(low_anchors.0, hum_low)?,
                    warm: anchor(low_anchors.1, hum_low)?,
                },
                HumBand {
                    cold: anchor(high_anchors.0, hum_high)?,
                    warm: anchor(high_anchors.1, hum_high)?,
                },
            ];
            result.insert(name.clone(), bands);
        }
        Ok(result)
    }

    /// Coldest and warmest (reference temperature, tick) of a humidity band.
    fn band_anchors(
        &self,
        hum: f64,
    ) -> Result<((f64, DateTime<Utc>), (f64, DateTime<Utc>)), CalError> {
        let ticks = self.ref_hum.by_value.get(&value_key(hum)).ok_or_else(|| {
            CalError::InsufficientData(format!(
                "No interval data at reference humidity [{}]",
                hum
            ))
        })?;
        let mut pairs: Vec<(f64, DateTime<Utc>)> = vec![];
        for tick in ticks {
            if let Some(temp) = self.ref_temp.by_time.get(tick) {
                pairs.push((*temp, *tick));
            }
        }
        if pairs.is_empty() {
            return Err(CalError::InsufficientData(format!(
                "No reference temperature at the ticks of humidity band [{}]",
                hum
            )));
        }
        let mut cold = pairs[0];
        let mut warm = pairs[0];
        for p in &pairs[1..] {
            if p.0 < cold.0 || (p.0 == cold.0 && p.1 < cold.1) {
                cold = *p;
            }
            if p.0 > warm.0 || (p.0 == warm.0 && p.1 > warm.1) {
                warm = *p;
            }
        }
        Ok((cold, warm))
    }
}

fn derive_start_end(ref_temps: &SeriesMap) -> Result<(DateTime<Utc>, DateTime<Utc>), CalError> {
    let series = ref_temps.values().next().ok_or_else(|| {
        CalError::InsufficientData("No reference temperature series was provided".to_owned())
    })?;
    let first = series.first().ok_or_else(|| {
        CalError::InsufficientData("The reference temperature series is empty".to_owned())
    })?;
    let last = series.last().unwrap();
    Ok((first.0, last.0))
}

fn per_sensor_grids(
    map: &SeriesMap,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    interval: Duration,
) -> BTreeMap<String, IntervalGrid> {
    let mut grids = BTreeMap::new();
    for (name, series) in map {
        let mut single = SeriesMap::new();
        single.insert(name.clone(), series.clone());
        grids.insert(name.clone(), standardize(&single, start, end, interval));
    }
    grids
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::series::Series;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn start() -> DateTime<Utc> {
        ts("2023-05-01T00:00:00Z")
    }

    // samples every 30s for t = 0..=750s, value chosen by the closure
    fn step_series(f: impl Fn(i64) -> f64) -> Series {
        (0..=25)
            .map(|i| {
                let t = i * 30;
                (start() + Duration::seconds(t), f(t))
            })
            .collect()
    }

    fn ref_temp_at(t: i64) -> f64 {
        // two plateaus visited twice, so both humidity bands span both
        if t <= 180 || (t > 360 && t <= 540) {
            18.0
        } else {
            22.0
        }
    }

    fn ref_hum_at(t: i64) -> f64 {
        if t <= 360 {
            40.0
        } else {
            60.0
        }
    }

    fn build_maps() -> (SeriesMap, SeriesMap, SeriesMap, SeriesMap) {
        let mut ref_temps = SeriesMap::new();
        ref_temps.insert("sensor.ref_temp".to_owned(), step_series(ref_temp_at));
        let mut ref_hums = SeriesMap::new();
        ref_hums.insert("sensor.ref_hum".to_owned(), step_series(ref_hum_at));
        let mut uncal_temps = SeriesMap::new();
        uncal_temps.insert(
            "sensor.office_temp".to_owned(),
            step_series(|t| ref_temp_at(t) - 1.0),
        );
        let mut uncal_hums = SeriesMap::new();
        uncal_hums.insert(
            "sensor.office_hum".to_owned(),
            step_series(|t| ref_hum_at(t) - 5.0),
        );
        (ref_temps, ref_hums, uncal_temps, uncal_hums)
    }

    fn build_calibrator() -> Calibrator {
        let (rt, rh, ut, uh) = build_maps();
        Calibrator::new(&rt, &rh, &ut, &uh).unwrap()
    }

    #[test]
    fn test_span() {
        let cal = build_calibrator();
        assert_eq!(cal.span(), (start(), start() + Duration::seconds(750)));
    }

    #[test]
    fn test_temperature_breakpoints() {
        let cal = build_calibrator();
        let sensor = cal.sensors().get("sensor.office_temp").unwrap();
        assert_eq!(sensor.temp_points.len(), 2);
        assert_eq!(sensor.temp_points[0].reference, 18.0);
        assert!((sensor.temp_points[0].measured - 17.0).abs() < 1e-9);
        assert_eq!(sensor.temp_points[1].reference, 22.0);
        assert!((sensor.temp_points[1].measured - 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_humidity_bands() {
        let cal = build_calibrator();
        let sensor = cal.sensors().get("sensor.office_temp").unwrap();
        assert_eq!(sensor.hum_bands.len(), 2);
        let low = &sensor.hum_bands[0];
        // mean 50, population stddev 10
        assert_eq!(low.cold.reference, 40.0);
        assert_eq!(low.cold.temp, 18.0);
        assert_eq!(low.warm.temp, 22.0);
        assert!((low.cold.measured - 35.0).abs() < 1e-9);
        assert!((low.warm.measured - 35.0).abs() < 1e-9);
        let high = &sensor.hum_bands[1];
        assert_eq!(high.cold.reference, 60.0);
        assert_eq!(high.cold.temp, 18.0);
        assert_eq!(high.warm.temp, 22.0);
        assert!((high.cold.measured - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_derived_corrections_roundtrip() {
        let cal = build_calibrator();
        let sensor = cal.sensors().get("sensor.office_temp").unwrap();
        assert!((sensor.correct_temperature(17.0).unwrap() - 18.0).abs() < 1e-9);
        assert!((sensor.correct_temperature(21.0).unwrap() - 22.0).abs() < 1e-9);
        // the humidity sensor reads 5 points low in both bands
        assert!((sensor.correct_humidity(20.0, 35.0).unwrap() - 40.0).abs() < 1e-9);
        assert!((sensor.correct_humidity(20.0, 55.0).unwrap() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_rendered_report() {
        let cal = build_calibrator();
        let sensor = cal.sensors().get("sensor.office_temp").unwrap();
        let yaml = sensor.temp_calibration_yaml();
        assert!(yaml.contains("- 17.000 -> 18.000"));
        assert!(yaml.contains("- 21.000 -> 22.000"));
        let lambda = sensor.hum_calibration_lambda().unwrap();
        assert!(lambda.contains("return 40.0;"));
        assert!(lambda.contains("return 60.0;"));
    }

    #[test]
    fn test_empty_reference_is_an_error() {
        let empty = SeriesMap::new();
        assert!(Calibrator::new(&empty, &empty, &empty, &empty).is_err());
    }

    #[test]
    fn test_sensor_count_mismatch_is_an_error() {
        let (rt, rh, ut, _) = build_maps();
        let no_hums = SeriesMap::new();
        assert!(Calibrator::new(&rt, &rh, &ut, &no_hums).is_err());
    }
}
