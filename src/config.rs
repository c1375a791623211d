use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::detection::SUSPICIOUS_SPEED_MPH;

/// Configuration for the travel-check service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Storage configuration
    pub database: DatabaseConfig,
    /// Detection policy configuration
    pub detection: DetectionConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the server binds to
    pub bind_address: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database holding login history and network blocks
    pub path: PathBuf,
}

/// Detection policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Travel speed above which a login pair is flagged, in mph
    pub suspicious_speed_mph: i64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                bind_address: "127.0.0.1:8080".to_string(),
            },
            database: DatabaseConfig {
                path: PathBuf::from("db/geolite2.db"),
            },
            detection: DetectionConfig {
                suspicious_speed_mph: SUSPICIOUS_SPEED_MPH,
            },
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file(&self, path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
