#![allow(dead_code)]
mod calibrator;
pub use calibrator::*;
mod errors;
pub use errors::*;
mod humidity;
pub use humidity::*;
mod ipol;
mod linear_fit;
pub use linear_fit::*;
mod measurements;
pub use measurements::*;
mod segmented;
pub use segmented::*;
mod sensor;
pub use sensor::*;
mod series;
pub use series::*;
mod units;
pub use units::*;

use console::Term;
use std::collections::BTreeMap;

/// Write the ESPHome calibration report for every sensor to the terminal.
pub fn print_sensor_calibrations(
    term: &Term,
    sensors: &BTreeMap<String, Sensor>,
) -> Result<(), CalError> {
    for (name, sensor) in sensors {
        write_line(term, "")?;
        write_line(term, &format!("Sensor: {}", name))?;
        write_line(term, "")?;
        write_line(term, "========== Temperature Calibration ==========")?;
        write_line(term, &sensor.temp_calibration_yaml())?;
        write_line(term, "")?;
        write_line(term, "=========== Humidity Calibration ============")?;
        write_line(term, &sensor.hum_calibration_lambda()?)?;
    }
    Ok(())
}

fn write_line(term: &Term, msg: &str) -> Result<(), CalError> {
    if let Err(e) = term.write_line(msg) {
        return Err(CalError::Terminal(e.to_string()));
    }
    Ok(())
}
