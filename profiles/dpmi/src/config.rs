//! # Diagnostic Configuration
//!
//! Command-line switches, DOS style (`/X` or `-X`, case-insensitive):
//!
//! | Switch  | Effect                                   |
//! |---------|------------------------------------------|
//! | `/D:n`  | Diagnose drive number `n` (default 0)    |
//! | `/T:ms` | Calibration interval in milliseconds     |
//! | `/Q`    | Skip the per-drive summaries             |
//! | `/C`    | Print the timer calibration              |
//! | `/V`    | More log output (repeatable)             |

use core::fmt;
use log::LevelFilter;

/// Configuration of one diagnostic run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagConfig {
    /// Index of the drive whose SMART data is read
    pub drive_index: usize,
    /// Timer calibration interval
    pub calibration_interval_ms: u32,
    /// Print identification of every drive found
    pub show_drive_summary: bool,
    /// Print the calibrated cycle count
    pub show_calibration: bool,
    /// Console log level
    pub log_level: LevelFilter,
}

impl DiagConfig {
    /// Longest accepted calibration interval: 1s
    pub const MAX_INTERVAL_MS: u32 = 1000;

    /// Default configuration
    pub const DEFAULT: Self = Self {
        drive_index: 0,
        calibration_interval_ms: 1,
        show_drive_summary: true,
        show_calibration: false,
        log_level: LevelFilter::Warn,
    };

    /// Parse command-line arguments (program name excluded)
    pub fn from_args<'a, I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut config = Self::DEFAULT;

        for arg in args {
            let body = arg
                .strip_prefix('/')
                .or_else(|| arg.strip_prefix('-'))
                .ok_or(ConfigError::NotASwitch)?;
            let mut chars = body.chars();
            let switch = chars
                .next()
                .ok_or(ConfigError::NotASwitch)?
                .to_ascii_uppercase();
            let rest = chars.as_str();

            match switch {
                'D' => config.drive_index = parse_value(switch, rest)?,
                'T' => {
                    let ms: u32 = parse_value(switch, rest)?;
                    if ms == 0 || ms > Self::MAX_INTERVAL_MS {
                        return Err(ConfigError::InvalidValue(switch));
                    }
                    config.calibration_interval_ms = ms;
                }
                'Q' if rest.is_empty() => config.show_drive_summary = false,
                'C' if rest.is_empty() => config.show_calibration = true,
                'V' if rest.is_empty() => config.log_level = more_verbose(config.log_level),
                _ => return Err(ConfigError::UnknownSwitch(switch)),
            }
        }

        Ok(config)
    }
}

impl Default for DiagConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn parse_value<T: core::str::FromStr>(switch: char, rest: &str) -> Result<T, ConfigError> {
    let value = rest
        .strip_prefix(':')
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingValue(switch))?;
    value.parse().map_err(|_| ConfigError::InvalidValue(switch))
}

fn more_verbose(level: LevelFilter) -> LevelFilter {
    match level {
        LevelFilter::Off => LevelFilter::Error,
        LevelFilter::Error => LevelFilter::Warn,
        LevelFilter::Warn => LevelFilter::Info,
        LevelFilter::Info => LevelFilter::Debug,
        LevelFilter::Debug | LevelFilter::Trace => LevelFilter::Trace,
    }
}

/// Command-line errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Argument does not start with `/` or `-`
    NotASwitch,
    /// Switch letter not recognized
    UnknownSwitch(char),
    /// Switch needs `:value`
    MissingValue(char),
    /// Value could not be used
    InvalidValue(char),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotASwitch => write!(f, "arguments must be switches (/X)"),
            Self::UnknownSwitch(c) => write!(f, "unknown switch /{}", c),
            Self::MissingValue(c) => write!(f, "switch /{} needs a value (/{}:n)", c, c),
            Self::InvalidValue(c) => write!(f, "invalid value for /{}", c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DiagConfig::from_args(core::iter::empty()).expect("no arguments");
        assert_eq!(config, DiagConfig::default());
        assert_eq!(config.drive_index, 0);
        assert_eq!(config.calibration_interval_ms, 1);
        assert!(config.show_drive_summary);
        assert_eq!(config.log_level, LevelFilter::Warn);
    }

    #[test]
    fn test_switches() {
        let config = DiagConfig::from_args(["/d:2", "-T:50", "/Q", "/c", "/V", "/v"])
            .expect("valid switches");
        assert_eq!(config.drive_index, 2);
        assert_eq!(config.calibration_interval_ms, 50);
        assert!(!config.show_drive_summary);
        assert!(config.show_calibration);
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn test_rejected_arguments() {
        assert_eq!(DiagConfig::from_args(["drive"]), Err(ConfigError::NotASwitch));
        assert_eq!(DiagConfig::from_args(["/"]), Err(ConfigError::NotASwitch));
        assert_eq!(DiagConfig::from_args(["/X"]), Err(ConfigError::UnknownSwitch('X')));
        assert_eq!(DiagConfig::from_args(["/QQ"]), Err(ConfigError::UnknownSwitch('Q')));
        assert_eq!(DiagConfig::from_args(["/D"]), Err(ConfigError::MissingValue('D')));
        assert_eq!(DiagConfig::from_args(["/D:"]), Err(ConfigError::MissingValue('D')));
        assert_eq!(DiagConfig::from_args(["/D:x"]), Err(ConfigError::InvalidValue('D')));
        assert_eq!(DiagConfig::from_args(["/T:0"]), Err(ConfigError::InvalidValue('T')));
        assert_eq!(DiagConfig::from_args(["/T:1001"]), Err(ConfigError::InvalidValue('T')));
    }

    #[test]
    fn test_verbosity_saturates() {
        let config = DiagConfig::from_args(["/V", "/V", "/V", "/V", "/V"]).expect("verbose");
        assert_eq!(config.log_level, LevelFilter::Trace);
    }
}
