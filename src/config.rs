use crate::error::{TimetableError, TtResult};
use clap::parser::ValueSource;
use clap::{ArgMatches, Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use strum_macros::{Display, EnumString};

/// How the search loop draws candidate moves.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SelectionMode {
    /// Lesson index ascending, then candidate timeslot/room ascending, then swaps.
    Ordered,
    #[default]
    Random,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    #[arg(short = 'S', long)]
    pub seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = SelectionMode::Random)]
    pub selection: SelectionMode,

    #[arg(short = 'T', long)]
    pub time_limit_ms: Option<u64>,

    #[arg(long, default_value_t = 20_000)]
    pub max_unimproved_steps: u64,

    #[arg(long)]
    pub max_steps: Option<u64>,

    #[arg(long, default_value_t = 2.0)]
    pub temp_start: f64,
    #[arg(long, default_value_t = 0.01)]
    pub temp_min: f64,
    #[arg(long, default_value_t = 0.9995)]
    pub cooling_rate: f64,

    // Soft points one hard point is worth when annealing.
    #[arg(long, default_value_t = 1000.0)]
    pub hard_weight: f64,

    // 0 disables oracle checks inside the loop.
    #[arg(long, default_value_t = 0)]
    pub verify_interval: u64,

    #[arg(long, default_value_t = 600)]
    pub session_ttl_secs: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            seed: None,
            selection: SelectionMode::Random,
            time_limit_ms: None,
            max_unimproved_steps: 20_000,
            max_steps: None,
            temp_start: 2.0,
            temp_min: 0.01,
            cooling_rate: 0.9995,
            hard_weight: 1000.0,
            verify_interval: 0,
            session_ttl_secs: 600,
        }
    }
}

impl SolverConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> TtResult<Self> {
        let config = Self::read_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a config file without validating it, for callers that still
    /// merge overrides on top.
    pub fn read_from_file<P: AsRef<Path>>(path: P) -> TtResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn validate(&self) -> TtResult<()> {
        if !(self.temp_start > 0.0) || !(self.temp_min > 0.0) {
            return Err(TimetableError::Config(format!(
                "temperatures must be positive (start={}, min={})",
                self.temp_start, self.temp_min
            )));
        }
        if self.temp_min > self.temp_start {
            return Err(TimetableError::Config(format!(
                "temp_min {} exceeds temp_start {}",
                self.temp_min, self.temp_start
            )));
        }
        if !(self.cooling_rate > 0.0 && self.cooling_rate <= 1.0) {
            return Err(TimetableError::Config(format!(
                "cooling_rate must be in (0, 1], got {}",
                self.cooling_rate
            )));
        }
        if !(self.hard_weight >= 1.0) {
            return Err(TimetableError::Config(format!(
                "hard_weight must be at least 1, got {}",
                self.hard_weight
            )));
        }
        Ok(())
    }

    /// Overwrites fields that were given explicitly on the command line, so
    /// flags win over a loaded config file and defaults do not.
    pub fn merge_from_cli(&mut self, cli: &SolverConfig, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($field:ident) => {
                if matches.value_source(stringify!($field)) == Some(ValueSource::CommandLine) {
                    self.$field = cli.$field.clone();
                }
            };
        }

        update_if_present!(seed);
        update_if_present!(selection);
        update_if_present!(time_limit_ms);
        update_if_present!(max_unimproved_steps);
        update_if_present!(max_steps);
        update_if_present!(temp_start);
        update_if_present!(temp_min);
        update_if_present!(cooling_rate);
        update_if_present!(hard_weight);
        update_if_present!(verify_interval);
        update_if_present!(session_ttl_secs);
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SolverConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_cooling_rate() {
        let cfg = SolverConfig {
            cooling_rate: 1.5,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(TimetableError::Config(_))));
    }

    #[test]
    fn explicit_flags_override_file_values() {
        use clap::{CommandFactory, FromArgMatches, Parser};

        #[derive(Parser)]
        struct Harness {
            #[command(flatten)]
            config: SolverConfig,
        }

        let matches = Harness::command().get_matches_from(["t", "--seed", "9", "--temp-start", "3.5"]);
        let cli = Harness::from_arg_matches(&matches).unwrap().config;

        let mut file = SolverConfig {
            seed: Some(1),
            cooling_rate: 0.99,
            ..Default::default()
        };
        file.merge_from_cli(&cli, &matches);
        assert_eq!(file.seed, Some(9));
        assert_eq!(file.temp_start, 3.5);
        assert_eq!(file.cooling_rate, 0.99);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: SolverConfig = serde_json::from_str(r#"{"seed": 7, "selection": "ordered"}"#).unwrap();
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.selection, SelectionMode::Ordered);
        assert_eq!(cfg.max_unimproved_steps, 20_000);
    }
}
