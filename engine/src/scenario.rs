use std::{fs, path::Path};

use supermine_common::models::{Level, ScenarioParams};

use crate::error::ScenarioError;

/// Loads `SCENARIO-<id>.txt` from `dir`.
pub fn read_scenario(dir: &Path, id: &str) -> Result<ScenarioParams, ScenarioError> {
    let path = dir.join(format!("SCENARIO-{id}.txt"));
    let text = fs::read_to_string(&path).map_err(|source| ScenarioError::Io {
        path: path.clone(),
        source,
    })?;
    parse_scenario(&text)
}

/// Parses the four-line scenario format: level, mines, max time, supermine flag.
pub fn parse_scenario(text: &str) -> Result<ScenarioParams, ScenarioError> {
    let mut lines = text.lines();
    let mut next = |field: &'static str| -> Result<u64, ScenarioError> {
        let line = lines.next().ok_or(ScenarioError::MissingField(field))?;
        line.trim()
            .parse()
            .map_err(|_| ScenarioError::NotANumber {
                field,
                value: line.to_string(),
            })
    };

    let level = match next("difficulty level")? {
        1 => Level::One,
        2 => Level::Two,
        _ => {
            return Err(ScenarioError::InvalidValue(
                "difficulty level should be 1 or 2",
            ));
        }
    };
    let mines = next("number of mines")?;
    let max_time = next("maximum time")?;
    let supermine = next("supermine information")?;

    let (mine_range, time_range) = match level {
        Level::One => (9..=11, 120..=180),
        Level::Two => (35..=45, 240..=360),
    };
    if !mine_range.contains(&mines) {
        return Err(ScenarioError::InvalidValue(
            "number of mines is not within acceptable limits for the difficulty level",
        ));
    }
    if !time_range.contains(&max_time) {
        return Err(ScenarioError::InvalidValue(
            "maximum time is not within acceptable limits for the difficulty level",
        ));
    }
    let has_supermine = match supermine {
        0 => false,
        1 => true,
        _ => return Err(ScenarioError::InvalidValue("supermine should be 0 or 1")),
    };
    if has_supermine && level == Level::One {
        return Err(ScenarioError::InvalidValue(
            "difficulty level 1 cannot have a supermine",
        ));
    }

    Ok(ScenarioParams {
        level,
        mines: mines as usize,
        max_time,
        has_supermine,
    })
}
