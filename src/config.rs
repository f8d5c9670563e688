// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

//! Configuration of the codec limits and of the read protocol.
//!
//! The configuration is a small TOML file, every key is optional:
//!
//! ```toml
//! max_nesting_depth = 16
//! read_retries = 1
//! strict_char_arrays = false
//! ```

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::codec::{CodecLimits, DEFAULT_MAX_DEPTH};
use crate::error::{Error, Result};
use crate::read::{ReadPolicy, DEFAULT_READ_RETRIES};

use serde::{Deserialize, Serialize};
use toml;

pub const DEFAULT_CONF_NAME: &str = "p11attr.conf";

/// Environment variable naming the configuration file
pub const CONF_ENV_VAR: &str = "P11ATTR_CONF";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum nesting of attribute arrays
    pub max_nesting_depth: usize,
    /// Single attribute retries when a value changes size between the
    /// length query and the fetch
    pub read_retries: usize,
    /// Reject character sequences that are not valid UTF-8
    pub strict_char_arrays: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            max_nesting_depth: DEFAULT_MAX_DEPTH,
            read_retries: DEFAULT_READ_RETRIES,
            strict_char_arrays: false,
        }
    }
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    /// Finds the configuration file
    ///
    /// The `P11ATTR_CONF` environment variable has the highest precedence,
    /// then `$XDG_CONFIG_HOME/p11attr/p11attr.conf` and finally
    /// `$HOME/.config/p11attr/p11attr.conf`. Only existing files are
    /// returned.
    pub fn find_conf() -> Option<String> {
        /* First check for our own env var,
         * this has the highest precedence */
        if let Ok(var) = env::var(CONF_ENV_VAR) {
            if Path::new(&var).is_file() {
                return Some(var);
            }
            log::warn!("{} points to missing file {}", CONF_ENV_VAR, var);
        }
        let candidate = match env::var("XDG_CONFIG_HOME") {
            Ok(xdg) => format!("{}/p11attr/{}", xdg, DEFAULT_CONF_NAME),
            Err(_) => match env::var("HOME") {
                Ok(home) => {
                    format!("{}/.config/p11attr/{}", home, DEFAULT_CONF_NAME)
                }
                Err(_) => return None,
            },
        };
        if Path::new(&candidate).is_file() {
            Some(candidate)
        } else {
            None
        }
    }

    pub fn from_file(filename: &str) -> Result<Config> {
        let config_str = fs::read_to_string(filename)?;
        config_str.parse()
    }

    /// Loads the configuration from the default locations, falling back
    /// to the defaults when no file is found
    pub fn load() -> Result<Config> {
        match Self::find_conf() {
            Some(filename) => {
                log::debug!("loading configuration from {}", filename);
                Self::from_file(&filename)
            }
            None => Ok(Config::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.max_nesting_depth == 0 {
            return Err(Error::config_error(
                "max_nesting_depth must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn codec_limits(&self) -> CodecLimits {
        CodecLimits {
            max_depth: self.max_nesting_depth,
            strict_chars: self.strict_char_arrays,
        }
    }

    pub fn read_policy(&self) -> ReadPolicy {
        ReadPolicy {
            max_retries: self.read_retries,
            limits: self.codec_limits(),
        }
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Config> {
        let conf: Config = toml::from_str(s)?;
        conf.validate()?;
        Ok(conf)
    }
}
