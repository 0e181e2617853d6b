use std::{io, path::PathBuf};

use supermine_common::models::Pos;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameError {
    #[error("Position {pos} is outside the {size}x{size} board")]
    OutOfBounds { pos: Pos, size: usize },
    #[error("The game has not started yet, open a tile first")]
    NotStarted,
}

pub type Result<T> = std::result::Result<T, GameError>;

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("Round history I/O failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Cannot read scenario {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Description file is missing {0}")]
    MissingField(&'static str),
    #[error("{field} is not a number: {value:?}")]
    NotANumber { field: &'static str, value: String },
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),
}
