use async_std::task;
use clap::{App, Arg, ArgMatches};
use console::Term;
use hygrocal::{
    convert_series, find_measurement_files, load_measurement_set, print_sensor_calibrations,
    CalError, Calibrator, MeasurementPaths, Sensor, TempUnit,
};
use std::path::PathBuf;

fn main() {
    let default_data_dir = default_data_dir();
    let matches = App::new("hygrocal")
        .version("0.1.0")
        .about(
            "Derive temperature and humidity calibrations for climate sensors by \
             comparing their measurements against reference sensors. \
             The expected CSV format is: SENSOR_ID,TIMESTAMP,VALUE",
        )
        .arg(
            Arg::with_name("reference_temperature_csv")
                .long("reference_temperature_csv")
                .alias("rt")
                .takes_value(true)
                .value_name("FILE")
                .help("Path to CSV file for reference temperature data."),
        )
        .arg(
            Arg::with_name("reference_humidity_csv")
                .long("reference_humidity_csv")
                .alias("rh")
                .takes_value(true)
                .value_name("FILE")
                .help("Path to CSV file for reference humidity data."),
        )
        .arg(
            Arg::with_name("uncalibrated_temperature_csv")
                .long("uncalibrated_temperature_csv")
                .alias("ut")
                .takes_value(true)
                .value_name("FILE")
                .help("Path to CSV file for uncalibrated temperature data."),
        )
        .arg(
            Arg::with_name("uncalibrated_humidity_csv")
                .long("uncalibrated_humidity_csv")
                .alias("uh")
                .takes_value(true)
                .value_name("FILE")
                .help("Path to CSV file for uncalibrated humidity data."),
        )
        .arg(
            Arg::with_name("data_dir")
                .long("data_dir")
                .takes_value(true)
                .value_name("DIR")
                .help(
                    "Directory scanned for the four measurement CSV files \
                     when no explicit paths are given.",
                ),
        )
        .arg(
            Arg::with_name("stored_temp_unit")
                .long("stored_temp_unit")
                .takes_value(true)
                .default_value("C")
                .help("What unit are the temperature values stored in?"),
        )
        .arg(
            Arg::with_name("reported_temp_unit")
                .long("reported_temp_unit")
                .takes_value(true)
                .default_value("C")
                .help("What unit are the temperature values reported in?"),
        )
        .arg(
            Arg::with_name("json")
                .long("json")
                .help("Print the derived calibration as JSON instead of the ESPHome report."),
        )
        .arg(
            Arg::with_name("verbose")
                .long("verbose")
                .short("v")
                .help("Enable debug logging."),
        )
        .get_matches();

    let level = if matches.is_present("verbose") {
        log::Level::Debug
    } else {
        log::Level::Info
    };
    if let Err(e) = simple_logger::init_with_level(level) {
        eprintln!("Unable to initialize the logger: {}", e);
    }

    if let Err(e) = run(&matches, &default_data_dir) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(matches: &ArgMatches, default_data_dir: &str) -> Result<(), CalError> {
    let paths = resolve_paths(matches, default_data_dir)?;
    let mut set = task::block_on(load_measurement_set(&paths))?;

    let stored = TempUnit::parse(matches.value_of("stored_temp_unit").unwrap())?;
    let reported = TempUnit::parse(matches.value_of("reported_temp_unit").unwrap())?;
    convert_series(&mut set.ref_temps, stored, reported);
    convert_series(&mut set.uncal_temps, stored, reported);

    let calibrator = Calibrator::new(
        &set.ref_temps,
        &set.ref_hums,
        &set.uncal_temps,
        &set.uncal_hums,
    )?;

    if matches.is_present("json") {
        let sensors: Vec<&Sensor> = calibrator.sensors().values().collect();
        let res = serde_json::to_string_pretty(&sensors);
        if let Err(e) = res {
            return Err(CalError::Format(e.to_string()));
        }
        println!("{}", res.unwrap());
    } else {
        let term = Term::stdout();
        print_sensor_calibrations(&term, calibrator.sensors())?;
    }
    Ok(())
}

fn resolve_paths(matches: &ArgMatches, default_data_dir: &str) -> Result<MeasurementPaths, CalError> {
    let explicit = [
        matches.value_of("reference_temperature_csv"),
        matches.value_of("reference_humidity_csv"),
        matches.value_of("uncalibrated_temperature_csv"),
        matches.value_of("uncalibrated_humidity_csv"),
    ];
    if explicit.iter().any(|p| p.is_some()) {
        if explicit.iter().any(|p| p.is_none()) {
            return Err(CalError::Str(
                "All four measurement CSV paths must be given together; \
                 use --data_dir to scan a directory instead."
                    .to_owned(),
            ));
        }
        return Ok(MeasurementPaths {
            ref_temps: PathBuf::from(explicit[0].unwrap()),
            ref_hums: PathBuf::from(explicit[1].unwrap()),
            uncal_temps: PathBuf::from(explicit[2].unwrap()),
            uncal_hums: PathBuf::from(explicit[3].unwrap()),
        });
    }
    let dirname = matches.value_of("data_dir").unwrap_or(default_data_dir);
    log::debug!("Scanning [{}] for measurement files", dirname);
    find_measurement_files(dirname)
}

fn default_data_dir() -> String {
    match dirs::data_dir() {
        Some(dir) => dir.join("hygrocal").to_string_lossy().into_owned(),
        None => ".".to_owned(),
    }
}
