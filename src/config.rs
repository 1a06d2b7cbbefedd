//! Node configuration read from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::blockchain::{ChainParams, MAX_TARGET_BLOCK_TIME_SECS, retarget};
use crate::error::ConfigError;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub chain: ChainParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            chain: ChainParams::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = lookup("HOST").unwrap_or(defaults.host);
        let port = parse_or("PORT", lookup("PORT"), defaults.port)?;

        let initial_bits = match lookup("INITIAL_BITS") {
            Some(raw) => parse_bits(&raw)?,
            None => defaults.chain.initial_bits,
        };

        let secs = parse_or(
            "TARGET_BLOCK_TIME_SECS",
            lookup("TARGET_BLOCK_TIME_SECS"),
            defaults.chain.target_block_time.as_secs(),
        )?;
        if secs == 0 {
            return Err(ConfigError::ZeroTimespan("TARGET_BLOCK_TIME_SECS"));
        }

        let retarget_window = parse_or(
            "RETARGET_WINDOW",
            lookup("RETARGET_WINDOW"),
            defaults.chain.retarget_window,
        )?;
        if retarget_window == 0 {
            return Err(ConfigError::ZeroTimespan("RETARGET_WINDOW"));
        }

        let target_block_time = Duration::from_secs(secs);
        if secs > MAX_TARGET_BLOCK_TIME_SECS
            || retarget::desired_timespan(target_block_time, retarget_window).is_err()
        {
            return Err(ConfigError::InvalidValue {
                key: "TARGET_BLOCK_TIME_SECS",
                value: secs.to_string(),
            });
        }

        Ok(Self {
            host,
            port,
            chain: ChainParams {
                initial_bits,
                target_block_time,
                retarget_window,
            },
        })
    }
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}

/// Compact bits are written in hex, with or without a `0x` prefix.
fn parse_bits(raw: &str) -> Result<u32, ConfigError> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u32::from_str_radix(digits, 16).map_err(|_| ConfigError::InvalidValue {
        key: "INITIAL_BITS",
        value: raw.to_string(),
    })
}
