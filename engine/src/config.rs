use std::{env, path::PathBuf, str::FromStr, time::Duration};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub rounds_dir: PathBuf,
    pub mines_file: PathBuf,
    pub scenario_dir: PathBuf,
    pub scenario_id: String,
    pub tick: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rounds_dir: PathBuf::from("rounds"),
            mines_file: PathBuf::from("mines/mines.txt"),
            scenario_dir: PathBuf::from("medialab"),
            scenario_id: "1".to_string(),
            tick: Duration::from_secs(1),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup, falling back to defaults for missing or unparsable
    /// values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            rounds_dir: lookup("SUPERMINE_ROUNDS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.rounds_dir),
            mines_file: lookup("SUPERMINE_MINES_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.mines_file),
            scenario_dir: lookup("SUPERMINE_SCENARIO_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scenario_dir),
            scenario_id: lookup("SUPERMINE_SCENARIO").unwrap_or(defaults.scenario_id),
            tick: parsed(&lookup, "SUPERMINE_TICK_MILLIS")
                .filter(|&millis| millis > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick),
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key)?.parse().ok()
}
