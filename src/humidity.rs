use crate::linear_fit::linear_fit;

/// Correct a raw humidity reading with a per-temperature affine fit.
///
/// The four callbacks map a temperature to a reference value: `expected1` and
/// `expected2` give the reference humidity of the low and high calibration
/// conditions, `measured1` and `measured2` give what the sensor reported under
/// those conditions. A line is fitted through the two (measured, expected)
/// points at `temp` and applied to `hum`.
///
/// Every call re-evaluates the callbacks and refits the line.
pub fn calibrated_humidity(
    temp: f64,
    hum: f64,
    expected1: impl Fn(f64) -> f64,
    expected2: impl Fn(f64) -> f64,
    measured1: impl Fn(f64) -> f64,
    measured2: impl Fn(f64) -> f64,
) -> f64 {
    let (slope, intercept) = linear_fit(
        measured1(temp),
        expected1(temp),
        measured2(temp),
        expected2(temp),
    );
    slope * hum + intercept
}
