// Application configuration, loaded from environment variables and CLI flags.

use std::num::NonZeroU32;
use std::path::PathBuf;

use chrono_tz::Tz;

use crate::error::{Error, Result};
use crate::rotation::{RotationSchedule, DEFAULT_EPOCH_MS, DEFAULT_TOTAL_ROTATIONS};

pub const DEFAULT_PORT: u16 = 3000;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Directory holding `<locale>/reward.json` datasets.
    pub data_dir: PathBuf,
    /// Timezone the weekly reset is observed in.
    pub timezone: Tz,
    /// Rotation epoch and cycle length.
    pub schedule: RotationSchedule,
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `PORT` - HTTP server port (default: 3000)
    /// - `DATA_DIR` - Reward dataset directory (default: `./data`)
    /// - `ROTATION_TZ` - IANA timezone of the weekly reset (default: system timezone)
    /// - `ROTATION_EPOCH_MS` - Start of rotation #1 in Unix milliseconds
    /// - `ROTATION_TOTAL` - Number of rotations in a cycle (default: 20)
    ///
    /// CLI flags override the matching variables:
    /// - `--port <PORT>`
    /// - `--data-dir <DIR>`
    /// - `--tz <ZONE>`
    pub fn load() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    /// Build a configuration from explicit arguments and a variable lookup.
    pub fn from_sources<F>(args: &[String], env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Port: CLI flag --port takes precedence, then env var, then default
        let port = match Self::parse_cli_value(args, "--port").or_else(|| env("PORT")) {
            Some(v) => v.parse().map_err(|e: std::num::ParseIntError| Error::InvalidConfig {
                key: "PORT",
                value: v.clone(),
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let data_dir = Self::parse_cli_value(args, "--data-dir")
            .or_else(|| env("DATA_DIR"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data"));

        let timezone = match Self::parse_cli_value(args, "--tz").or_else(|| env("ROTATION_TZ")) {
            Some(name) => parse_timezone(&name)?,
            None => system_timezone(),
        };

        let epoch_ms = match env("ROTATION_EPOCH_MS") {
            Some(v) => v.parse::<i64>().map_err(|e| Error::InvalidConfig {
                key: "ROTATION_EPOCH_MS",
                value: v.clone(),
                reason: e.to_string(),
            })?,
            None => DEFAULT_EPOCH_MS,
        };

        let total = match env("ROTATION_TOTAL") {
            Some(v) => v.parse::<NonZeroU32>().map_err(|e| Error::InvalidConfig {
                key: "ROTATION_TOTAL",
                value: v.clone(),
                reason: e.to_string(),
            })?,
            None => DEFAULT_TOTAL_ROTATIONS,
        };

        let schedule =
            RotationSchedule::from_epoch_millis(epoch_ms, total).ok_or_else(|| Error::InvalidConfig {
                key: "ROTATION_EPOCH_MS",
                value: epoch_ms.to_string(),
                reason: "timestamp out of range".to_string(),
            })?;

        Ok(Config {
            port,
            data_dir,
            timezone,
            schedule,
        })
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }
}

fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>().map_err(|e| Error::InvalidConfig {
        key: "ROTATION_TZ",
        value: name.to_string(),
        reason: e.to_string(),
    })
}

/// Timezone of the host, or UTC if it can't be determined.
fn system_timezone() -> Tz {
    match iana_time_zone::get_timezone() {
        Ok(name) => name.parse().unwrap_or_else(|_| {
            tracing::warn!("Unrecognized system timezone {name}, using UTC");
            Tz::UTC
        }),
        Err(e) => {
            tracing::warn!("Could not determine system timezone ({e}), using UTC");
            Tz::UTC
        }
    }
}
