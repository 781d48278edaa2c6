//! Pipeline tuning knobs.
//!
//! Every value has a built-in default and can be overridden through an
//! `ARENA_*` environment variable. Unparseable or zero values are logged and
//! ignored.

use std::time::Duration;

use tracing::warn;

use arena_ai::{DEFAULT_MAX_LABEL_CHARS, LabelPolicy};

use crate::jobs::{DEFAULT_ADMISSION_CEILING, SweepSettings};

pub const ENV_ADMISSION_CEILING: &str = "ARENA_ADMISSION_CEILING";
pub const ENV_SWEEP_PERIOD_SECS: &str = "ARENA_SWEEP_PERIOD_SECS";
pub const ENV_SWEEP_ROUNDS: &str = "ARENA_SWEEP_ROUNDS";
pub const ENV_SWEEP_ROUND_INTERVAL_SECS: &str = "ARENA_SWEEP_ROUND_INTERVAL_SECS";
pub const ENV_SWEEP_BATCH_SIZE: &str = "ARENA_SWEEP_BATCH_SIZE";
pub const ENV_CLEANUP_PERIOD_SECS: &str = "ARENA_CLEANUP_PERIOD_SECS";
pub const ENV_LABEL_MAX_CHARS: &str = "ARENA_LABEL_MAX_CHARS";
pub const ENV_NAMING_TIMEOUT_SECS: &str = "ARENA_NAMING_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub admission_ceiling: usize,
    pub sweep_period: Duration,
    pub sweep_rounds: usize,
    pub sweep_round_interval: Duration,
    pub sweep_batch_size: usize,
    pub cleanup_period: Duration,
    pub label_max_chars: usize,
    pub naming_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let sweep = SweepSettings::default();
        Self {
            admission_ceiling: DEFAULT_ADMISSION_CEILING,
            sweep_period: Duration::from_secs(60),
            sweep_rounds: sweep.rounds,
            sweep_round_interval: sweep.round_interval,
            sweep_batch_size: sweep.batch_size,
            cleanup_period: Duration::from_secs(600),
            label_max_chars: DEFAULT_MAX_LABEL_CHARS,
            naming_timeout: Duration::from_secs(30),
        }
    }
}

impl PipelineConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns per variable name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let read = |key: &str| -> Option<u64> {
            let raw = lookup(key)?;
            match raw.trim().parse::<u64>() {
                Ok(0) | Err(_) => {
                    warn!(key, value = %raw, "ignoring invalid pipeline setting");
                    None
                }
                Ok(value) => Some(value),
            }
        };
        let secs = |key: &str| read(key).map(Duration::from_secs);
        let count = |key: &str| read(key).and_then(|v| usize::try_from(v).ok());

        if let Some(v) = count(ENV_ADMISSION_CEILING) {
            config.admission_ceiling = v;
        }
        if let Some(v) = secs(ENV_SWEEP_PERIOD_SECS) {
            config.sweep_period = v;
        }
        if let Some(v) = count(ENV_SWEEP_ROUNDS) {
            config.sweep_rounds = v;
        }
        if let Some(v) = secs(ENV_SWEEP_ROUND_INTERVAL_SECS) {
            config.sweep_round_interval = v;
        }
        if let Some(v) = count(ENV_SWEEP_BATCH_SIZE) {
            config.sweep_batch_size = v;
        }
        if let Some(v) = secs(ENV_CLEANUP_PERIOD_SECS) {
            config.cleanup_period = v;
        }
        if let Some(v) = count(ENV_LABEL_MAX_CHARS) {
            config.label_max_chars = v;
        }
        if let Some(v) = secs(ENV_NAMING_TIMEOUT_SECS) {
            config.naming_timeout = v;
        }
        config
    }

    pub fn sweep_settings(&self) -> SweepSettings {
        SweepSettings {
            rounds: self.sweep_rounds,
            round_interval: self.sweep_round_interval,
            batch_size: self.sweep_batch_size,
        }
    }

    pub fn label_policy(&self) -> LabelPolicy {
        LabelPolicy::new(self.label_max_chars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.admission_ceiling, 8);
        assert_eq!(config.sweep_period, Duration::from_secs(60));
        assert_eq!(config.cleanup_period, Duration::from_secs(600));
        assert_eq!(config.label_max_chars, 12);
        assert_eq!(config.sweep_settings(), SweepSettings::default());
    }

    #[test]
    fn overrides_apply() {
        let config = PipelineConfig::from_lookup(lookup(&[
            (ENV_ADMISSION_CEILING, "3"),
            (ENV_SWEEP_ROUNDS, " 4 "),
            (ENV_SWEEP_ROUND_INTERVAL_SECS, "1"),
            (ENV_LABEL_MAX_CHARS, "16"),
        ]));
        assert_eq!(config.admission_ceiling, 3);
        assert_eq!(config.sweep_rounds, 4);
        assert_eq!(config.sweep_round_interval, Duration::from_secs(1));
        assert_eq!(config.label_policy().max_chars, 16);
        assert_eq!(config.sweep_batch_size, 10);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = PipelineConfig::from_lookup(lookup(&[
            (ENV_ADMISSION_CEILING, "lots"),
            (ENV_SWEEP_BATCH_SIZE, "0"),
            (ENV_CLEANUP_PERIOD_SECS, "-5"),
        ]));
        assert_eq!(config, PipelineConfig::default());
    }
}
