use std::fmt;

use serde::{Deserialize, Serialize};

/// Player-visible state of a single tile.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "state")]
pub enum Cell {
    #[serde(rename = "hidden")]
    Hidden,
    #[serde(rename = "flagged")]
    Flagged,
    #[serde(rename = "revealed")]
    Revealed { adjacent: u8 },
    #[serde(rename = "mine")]
    Mine,
    #[serde(rename = "supermine")]
    SuperMine,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Difficulty level, which fixes the board size.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
}

impl Level {
    pub const fn board_size(self) -> usize {
        match self {
            Level::One => 9,
            Level::Two => 16,
        }
    }
}

/// Parameters of an already validated scenario.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct ScenarioParams {
    pub level: Level,
    pub mines: usize,
    pub max_time: u64,
    pub has_supermine: bool,
}

impl ScenarioParams {
    pub const fn board_size(&self) -> usize {
        self.level.board_size()
    }
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            level: Level::One,
            mines: 10,
            max_time: 150,
            has_supermine: false,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RoundStatus {
    #[default]
    #[serde(rename = "not_started")]
    NotStarted,
    #[serde(rename = "playing")]
    Playing,
    #[serde(rename = "won")]
    Won,
    #[serde(rename = "lost")]
    Lost,
}

impl RoundStatus {
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Winner {
    Player,
    #[serde(rename = "PC")]
    Pc,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Winner::Player => f.write_str("Player"),
            Winner::Pc => f.write_str("PC"),
        }
    }
}

/// Statistics of a finished round, as kept in the round history.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundSummary {
    pub total_mines: usize,
    pub attempts: u32,
    pub elapsed_secs: u64,
    pub winner: Winner,
}

impl fmt::Display for RoundSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total number of mines: {}.", self.total_mines)?;
        writeln!(
            f,
            "Total number of attempts (left clicks): {}.",
            self.attempts
        )?;
        writeln!(f, "Total game time: {} secs.", self.elapsed_secs)?;
        writeln!(f, "Winner: {}.", self.winner)
    }
}
