use charlcd_gpio::lcd::hd44780::HD44780Timing;
use eyre::{WrapErr, eyre};
use serde::{Deserialize, Serialize};
use std::env::var_os;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "charlcd.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Multiplies every delay in `timing`, for slow clones of the controller.
    /// Must be positive.
    pub timing_scale: f64,
    pub timing: TimingConfig,
}

impl Config {
    /// `CHARLCD_CONFIG_FILE` if set, otherwise `charlcd.json` in the working directory.
    pub fn path() -> PathBuf {
        var_os("CHARLCD_CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Reads the config at `path`.
    ///
    /// `Ok(None)` means there is no file there. A file that can't be read or parsed is an error,
    /// so it never gets mistaken for a missing one and replaced.
    pub fn load(path: &Path) -> eyre::Result<Option<Self>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).wrap_err_with(|| format!("Failed to open {}", path.display()));
            }
        };
        let config = serde_json::from_reader(BufReader::new(file))
            .wrap_err_with(|| format!("Invalid config in {}", path.display()))?;
        Ok(Some(config))
    }

    /// Writes the config to a new file at `path`. Fails if something is already there.
    pub fn save_new(&self, path: &Path) -> eyre::Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .wrap_err_with(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// The delays to hand to the driver, with [Self::timing_scale] applied.
    pub fn timing(&self) -> eyre::Result<HD44780Timing> {
        HD44780Timing::from(self.timing)
            .scaled(self.timing_scale)
            .ok_or_else(|| eyre!("timing_scale must be positive, got {}", self.timing_scale))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timing_scale: 1.0,
            timing: TimingConfig::default(),
        }
    }
}

/// [HD44780Timing] as stored on disk, every field in microseconds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    pub bootup_us: u64,
    pub enable_pulse_us: u64,
    pub write_data_us: u64,
    pub command_us: u64,
    pub soft_reset_us: [u64; 3],
    pub set_4bit_mode_us: u64,
    pub clear_display_us: u64,
    pub cursor_home_us: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        HD44780Timing::default().into()
    }
}

impl From<HD44780Timing> for TimingConfig {
    fn from(timing: HD44780Timing) -> Self {
        // Rounded up, a saved delay must never be shorter than the one it came from
        let us = |d: Duration| d.as_nanos().div_ceil(1_000) as u64;
        TimingConfig {
            bootup_us: us(timing.bootup),
            enable_pulse_us: us(timing.enable_pulse),
            write_data_us: us(timing.write_data),
            command_us: us(timing.command),
            soft_reset_us: timing.soft_reset.map(us),
            set_4bit_mode_us: us(timing.set_4bit_mode),
            clear_display_us: us(timing.clear_display),
            cursor_home_us: us(timing.cursor_home),
        }
    }
}

impl From<TimingConfig> for HD44780Timing {
    fn from(config: TimingConfig) -> Self {
        HD44780Timing {
            bootup: Duration::from_micros(config.bootup_us),
            enable_pulse: Duration::from_micros(config.enable_pulse_us),
            write_data: Duration::from_micros(config.write_data_us),
            command: Duration::from_micros(config.command_us),
            soft_reset: config.soft_reset_us.map(Duration::from_micros),
            set_4bit_mode: Duration::from_micros(config.set_4bit_mode_us),
            clear_display: Duration::from_micros(config.clear_display_us),
            cursor_home: Duration::from_micros(config.cursor_home_us),
        }
    }
}
