use crate::ipol::interpolate_linear;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

/// Time-sorted samples of a single sensor.
pub type Series = Vec<(DateTime<Utc>, f64)>;

/// Sensor name mapped to its samples.
pub type SeriesMap = BTreeMap<String, Series>;

/// Round to a fixed number of decimals.
pub(crate) fn round_to(v: f64, digits: i32) -> f64 {
    let f = 10f64.powi(digits);
    (v * f).round() / f
}

/// Map key for a value bucketed to one decimal, stored in tenths.
pub(crate) fn value_key(v: f64) -> i64 {
    (v * 10.0).round() as i64
}

pub(crate) fn key_value(key: i64) -> f64 {
    key as f64 / 10.0
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub(crate) fn pstdev(values: &[f64]) -> f64 {
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

/// Interpolate a series at an arbitrary instant.
///
/// Returns None when the instant is not bracketed by two samples.
pub(crate) fn interpolate_at(series: &[(DateTime<Utc>, f64)], dt: DateTime<Utc>) -> Option<f64> {
    let i = series.partition_point(|(ts, _)| *ts < dt);
    if i < 1 || i >= series.len() {
        return None;
    }
    let (t0, v0) = series[i - 1];
    let (t1, v1) = series[i];
    Some(interpolate_linear(
        (dt - t0).num_milliseconds() as f64,
        0.0,
        (t1 - t0).num_milliseconds() as f64,
        v0,
        v1,
    ))
}

/// Measurement series resampled onto a fixed interval grid.
#[derive(Debug, Clone)]
pub struct IntervalGrid {
    /// Grid tick mapped to the mean of all contributing sensors.
    pub by_time: BTreeMap<DateTime<Utc>, f64>,
    /// Grid value bucketed to one decimal (in tenths) mapped to its ticks.
    pub by_value: BTreeMap<i64, Vec<DateTime<Utc>>>,
}

/// Resample a set of series onto a fixed interval grid between start and end.
///
/// At each tick every sensor whose samples bracket the tick contributes an
/// interpolated value; the grid stores the mean of the contributions. Ticks
/// without any contribution are omitted.
pub fn standardize(
    map: &SeriesMap,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    interval: Duration,
) -> IntervalGrid {
    let mut by_time = BTreeMap::new();
    let mut by_value: BTreeMap<i64, Vec<DateTime<Utc>>> = BTreeMap::new();
    let mut dt = start + interval;
    while dt < end {
        let mut contributions = vec![];
        for series in map.values() {
            if let Some(v) = interpolate_at(series, dt) {
                contributions.push(v);
            }
        }
        if !contributions.is_empty() {
            let avg = mean(&contributions);
            by_time.insert(dt, avg);
            by_value.entry(value_key(avg)).or_insert_with(Vec::new).push(dt);
        }
        dt = dt + interval;
    }
    IntervalGrid { by_time, by_value }
}
