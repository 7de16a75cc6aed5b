//! Error types for calmwave.
//!
//! Only genuine failures live here. Weak signal, failed calibration and a
//! missing audio device are reported as explicit result states by the
//! components that encounter them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalmwaveError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Unsupported audio format: {message}")]
    AudioFormat { message: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    // Baseline persistence errors
    #[error("Failed to read baseline from {path}: {message}")]
    BaselineRead { path: String, message: String },

    #[error("Failed to write baseline to {path}: {message}")]
    BaselineWrite { path: String, message: String },

    #[error("Baseline serialization error: {0}")]
    BaselineSerde(#[from] serde_json::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CalmwaveError>;
