//! Runtime configuration
//!
//! Settings come from the process environment, after `.env` has been
//! loaded by the binary:
//!
//! - `VECVIZ_TOP_K` - results shown per query (default 3)
//! - `VECVIZ_PACE` - multiplier on every walkthrough delay, 0 plays instantly (default 1.0)
//! - `VECVIZ_COLOR` - colored vector strips (default on)

use crate::flow::Pacing;

pub const TOP_K_VAR: &str = "VECVIZ_TOP_K";
pub const PACE_VAR: &str = "VECVIZ_PACE";
pub const COLOR_VAR: &str = "VECVIZ_COLOR";

pub const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub top_k: usize,
    pub pacing: Pacing,
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            top_k: DEFAULT_TOP_K,
            pacing: Pacing::default(),
            color: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; missing or blank keys keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = read(TOP_K_VAR) {
            config.top_k = value.trim().parse().map_err(|_| ConfigError::Invalid {
                key: TOP_K_VAR,
                value: value.clone(),
                reason: "expected a non-negative integer",
            })?;
        }

        if let Some(value) = read(PACE_VAR) {
            config.pacing = value
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Pacing::new)
                .ok_or_else(|| ConfigError::Invalid {
                    key: PACE_VAR,
                    value: value.clone(),
                    reason: "expected a finite number >= 0",
                })?;
        }

        if let Some(value) = read(COLOR_VAR) {
            config.color = parse_switch(&value).ok_or_else(|| ConfigError::Invalid {
                key: COLOR_VAR,
                value: value.clone(),
                reason: "expected on/off",
            })?;
        }

        Ok(config)
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
