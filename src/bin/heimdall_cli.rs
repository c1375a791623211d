use std::path::PathBuf;
use std::sync::Arc;

use structopt::StructOpt;
use uuid::Uuid;

use heimdall::config::Config;
use heimdall::detection::TravelAnomalyBuilder;
use heimdall::models::LoginAttempt;
use heimdall::persistence::SqliteLocationStore;

/// Impossible-travel login checker command line interface
#[derive(StructOpt, Debug)]
#[structopt(name = "heimdall", about = "Impossible-travel login checker CLI")]
pub enum Cli {
    /// Generate a default configuration file
    Config {
        /// Output path for the configuration file
        #[structopt(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
    /// Run a single travel check against the configured database
    Check {
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
        /// Username of the login attempt
        #[structopt(short, long)]
        username: String,
        /// Source IP address or CIDR of the login attempt
        #[structopt(short, long)]
        ip: String,
        /// Unix timestamp of the attempt (defaults to now)
        #[structopt(short, long)]
        timestamp: Option<i64>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::from_args();

    match cli {
        Cli::Config { output } => {
            let config = Config::default();
            config.to_file(&output)?;
            println!("Default configuration written to: {:?}", output);
        }
        Cli::Check {
            config,
            username,
            ip,
            timestamp,
        } => {
            let config = if config.exists() {
                Config::from_file(&config)?
            } else {
                eprintln!("Config file not found: {:?}, using defaults", config);
                Config::default()
            };

            let store = Arc::new(SqliteLocationStore::new(&config.database.path)?);
            let builder =
                TravelAnomalyBuilder::with_threshold(store, config.detection.suspicious_speed_mph);

            let attempt = LoginAttempt {
                username,
                unix_timestamp: timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp()),
                event_uuid: Uuid::new_v4(),
                ip_address: ip,
            };

            let response = builder.build(&attempt)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
