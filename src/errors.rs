use serde::{Deserialize, Serialize};
use std::io::Error;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CalError {
    InvalidTable(String),
    InsufficientData(String),
    MeasurementFileNotFound(String),
    SensorNotFound(String),
    DirNotFound(PathBuf),
    Format(String),
    Terminal(String),
    Logic(String),
    Str(String),
    IO(String),
}

impl std::fmt::Display for CalError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self {
            CalError::InvalidTable(msg) => write!(f, "Invalid breakpoint table: {}", msg),
            CalError::InsufficientData(msg) => {
                write!(f, "Not enough measurement data: {}", msg)
            }
            CalError::MeasurementFileNotFound(prefix) => {
                write!(f, "No measurement file starting with [{}] was found", prefix)
            }
            CalError::SensorNotFound(name) => write!(f, "Sensor [{}] was not found", name),
            CalError::DirNotFound(path_buf) => {
                write!(f, "Directory not found or does not exist: {:#?}", path_buf)
            }
            CalError::Format(msg) => write!(f, "Invalid format: {}", msg),
            CalError::Terminal(msg) => write!(f, "Terminal registered an error: {}", msg),
            CalError::Logic(msg) => write!(f, "{}", msg),
            CalError::Str(msg) => write!(f, "{}", msg),
            CalError::IO(msg) => write!(f, "Input / output error: {}", msg),
        }
    }
}

impl std::convert::From<std::io::Error> for CalError {
    fn from(e: Error) -> Self {
        Self::IO(e.to_string())
    }
}
