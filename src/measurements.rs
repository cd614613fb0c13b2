use crate::errors::CalError;
use crate::series::SeriesMap;
use async_std::task;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

// File name prefixes of exported measurement series.
pub const REF_TEMP_PREFIX: &str = "reference_temperatures";
pub const REF_HUM_PREFIX: &str = "reference_humidities";
pub const UNCAL_TEMP_PREFIX: &str = "uncalibrated_temperatures";
pub const UNCAL_HUM_PREFIX: &str = "uncalibrated_humidities";

#[derive(Debug, Clone)]
pub struct MeasurementPaths {
    pub ref_temps: PathBuf,
    pub ref_hums: PathBuf,
    pub uncal_temps: PathBuf,
    pub uncal_hums: PathBuf,
}

#[derive(Debug, Clone)]
pub struct MeasurementSet {
    pub ref_temps: SeriesMap,
    pub ref_hums: SeriesMap,
    pub uncal_temps: SeriesMap,
    pub uncal_hums: SeriesMap,
}

/// Parse measurement rows in `SENSOR_ID,TIMESTAMP,VALUE` format.
///
/// Header rows are skipped; each series is sorted by timestamp afterwards.
pub fn parse_series_csv<R: std::io::Read>(reader: R) -> Result<SeriesMap, CalError> {
    let mut map = SeriesMap::new();
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    for record in rdr.records() {
        if let Err(e) = record {
            return Err(CalError::IO(e.to_string()));
        }
        let record = record.unwrap();
        if record.len() == 0 {
            continue;
        }
        if record.iter().any(|field| field.contains("TIMESTAMP")) {
            continue;
        }
        if record.len() != 3 {
            return Err(CalError::Format(format!(
                "Expected rows with [SENSOR_ID,TIMESTAMP,VALUE], got [{}] column(s)",
                record.len()
            )));
        }
        let name = record[0].to_string();
        let res_dt = DateTime::parse_from_rfc3339(&record[1]);
        if let Err(e) = res_dt {
            return Err(CalError::Format(format!(
                "Invalid timestamp [{}]: {}",
                &record[1], e
            )));
        }
        let res_value = record[2].parse::<f64>();
        if let Err(e) = res_value {
            return Err(CalError::Format(format!(
                "Invalid value [{}]: {}",
                &record[2], e
            )));
        }
        map.entry(name).or_insert_with(Vec::new).push((
            res_dt.unwrap().with_timezone(&Utc),
            res_value.unwrap(),
        ));
    }
    for series in map.values_mut() {
        series.sort_by(|a, b| a.0.cmp(&b.0));
    }
    Ok(map)
}

pub fn read_series_csv(path: &Path) -> Result<SeriesMap, CalError> {
    let file = std::fs::File::open(path)?;
    parse_series_csv(file)
}

/// Read the four measurement CSV files concurrently.
pub async fn load_measurement_set(paths: &MeasurementPaths) -> Result<MeasurementSet, CalError> {
    let p_ref_temps = paths.ref_temps.clone();
    let p_ref_hums = paths.ref_hums.clone();
    let p_uncal_temps = paths.uncal_temps.clone();
    let p_uncal_hums = paths.uncal_hums.clone();
    let h_ref_temps = task::spawn(async move { read_series_csv(&p_ref_temps) });
    let h_ref_hums = task::spawn(async move { read_series_csv(&p_ref_hums) });
    let h_uncal_temps = task::spawn(async move { read_series_csv(&p_uncal_temps) });
    let h_uncal_hums = task::spawn(async move { read_series_csv(&p_uncal_hums) });

    let set = MeasurementSet {
        ref_temps: h_ref_temps.await?,
        ref_hums: h_ref_hums.await?,
        uncal_temps: h_uncal_temps.await?,
        uncal_hums: h_uncal_hums.await?,
    };
    if set.ref_temps.is_empty()
        || set.ref_hums.is_empty()
        || set.uncal_temps.is_empty()
        || set.uncal_hums.is_empty()
    {
        return Err(CalError::InsufficientData(
            "Unable to read all measurement CSVs".to_owned(),
        ));
    }
    log::info!(
        "Loaded {} reference temperature, {} reference humidity, {} uncalibrated \
         temperature and {} uncalibrated humidity series",
        set.ref_temps.len(),
        set.ref_hums.len(),
        set.uncal_temps.len(),
        set.uncal_hums.len()
    );
    Ok(set)
}

/// Locate the four measurement files in a data directory by prefix.
///
/// Exports carry their time span in the file name, so the lexicographically
/// last match per prefix is the newest one.
pub fn find_measurement_files(dirname: &str) -> Result<MeasurementPaths, CalError> {
    let dir = PathBuf::from(dirname);
    if !dir.is_dir() {
        return Err(CalError::DirNotFound(dir));
    }
    let mut v_ref_temps = vec![];
    let mut v_ref_hums = vec![];
    let mut v_uncal_temps = vec![];
    let mut v_uncal_hums = vec![];
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let ep = entry.path();
        if ep.is_dir() {
            continue;
        }
        let file_name = entry.file_name();
        let file_name = file_name.to_str().unwrap_or("");
        if file_name.starts_with(REF_TEMP_PREFIX) {
            v_ref_temps.push(ep);
        } else if file_name.starts_with(REF_HUM_PREFIX) {
            v_ref_hums.push(ep);
        } else if file_name.starts_with(UNCAL_TEMP_PREFIX) {
            v_uncal_temps.push(ep);
        } else if file_name.starts_with(UNCAL_HUM_PREFIX) {
            v_uncal_hums.push(ep);
        }
    }
    Ok(MeasurementPaths {
        ref_temps: pick_newest(v_ref_temps, REF_TEMP_PREFIX)?,
        ref_hums: pick_newest(v_ref_hums, REF_HUM_PREFIX)?,
        uncal_temps: pick_newest(v_uncal_temps, UNCAL_TEMP_PREFIX)?,
        uncal_hums: pick_newest(v_uncal_hums, UNCAL_HUM_PREFIX)?,
    })
}

fn pick_newest(mut paths: Vec<PathBuf>, prefix: &str) -> Result<PathBuf, CalError> {
    paths.sort();
    paths
        .pop()
        .ok_or_else(|| CalError::MeasurementFileNotFound(prefix.to_owned()))
}
