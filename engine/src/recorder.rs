use std::{fs, io::ErrorKind, path::PathBuf, time::SystemTime};

use supermine_common::models::{RoundSummary, Winner};
use tracing::{debug, info, warn};

use crate::error::RecorderError;

pub const MAX_ROUNDS: usize = 5;
const FILE_PREFIX: &str = "round-";
const FILE_EXTENSION: &str = ".txt";

/// Destination for summaries of finished rounds.
pub trait RoundSink: Send + Sync {
    fn record(&self, summary: &RoundSummary) -> Result<(), RecorderError>;
}

/// Keeps the last [`MAX_ROUNDS`] round summaries as `round-<n>.txt` files in one directory.
///
/// Once every slot is used the file with the oldest modification time is overwritten. Files
/// sharing a timestamp are ordered arbitrarily, so eviction is only approximately FIFO on file
/// systems with coarse timestamps.
#[derive(Debug, Clone)]
pub struct RoundRecorder {
    dir: PathBuf,
}

struct RoundFile {
    path: PathBuf,
    modified: SystemTime,
}

impl RoundRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Writes `summary` into a free slot, or over the oldest entry. Returns the written path.
    pub fn write_round(&self, summary: &RoundSummary) -> Result<PathBuf, RecorderError> {
        fs::create_dir_all(&self.dir)?;
        let files = self.round_files()?;

        let path = if files.len() < MAX_ROUNDS {
            self.free_slot(&files)
        } else {
            // sorted oldest first
            files[0].path.clone()
        };

        fs::write(&path, summary.to_string())?;
        info!("Recorded round summary to {}", path.display());
        Ok(path)
    }

    /// Retained summaries, oldest first. A missing directory means no history.
    pub fn history(&self) -> Result<Vec<RoundSummary>, RecorderError> {
        let files = match self.round_files() {
            Ok(files) => files,
            Err(RecorderError::Io(e)) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut rounds = Vec::with_capacity(files.len());
        for file in files {
            let text = fs::read_to_string(&file.path)?;
            match parse_summary(&text) {
                Some(summary) => rounds.push(summary),
                None => warn!("Skipping malformed round file {}", file.path.display()),
            }
        }
        Ok(rounds)
    }

    fn free_slot(&self, files: &[RoundFile]) -> PathBuf {
        (1..=MAX_ROUNDS)
            .map(|id| self.dir.join(format!("{FILE_PREFIX}{id}{FILE_EXTENSION}")))
            .find(|path| files.iter().all(|file| &file.path != path))
            .unwrap_or_else(|| {
                self.dir
                    .join(format!("{FILE_PREFIX}{}{FILE_EXTENSION}", files.len() + 1))
            })
    }

    fn round_files(&self) -> Result<Vec<RoundFile>, RecorderError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !(name.starts_with(FILE_PREFIX) && name.ends_with(FILE_EXTENSION)) {
                continue;
            }
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            files.push(RoundFile {
                path: entry.path(),
                modified: metadata.modified()?,
            });
        }
        files.sort_by_key(|file| file.modified);
        debug!("Found {} round files in {}", files.len(), self.dir.display());
        Ok(files)
    }
}

impl RoundSink for RoundRecorder {
    fn record(&self, summary: &RoundSummary) -> Result<(), RecorderError> {
        self.write_round(summary).map(|_| ())
    }
}

/// Reads back the four-line format produced by `RoundSummary`'s `Display`.
pub fn parse_summary(text: &str) -> Option<RoundSummary> {
    let mut lines = text.lines();
    let total_mines = lines
        .next()?
        .strip_prefix("Total number of mines: ")?
        .strip_suffix('.')?
        .parse()
        .ok()?;
    let attempts = lines
        .next()?
        .strip_prefix("Total number of attempts (left clicks): ")?
        .strip_suffix('.')?
        .parse()
        .ok()?;
    let elapsed_secs = lines
        .next()?
        .strip_prefix("Total game time: ")?
        .strip_suffix(" secs.")?
        .parse()
        .ok()?;
    let winner = match lines.next()?.strip_prefix("Winner: ")?.strip_suffix('.')? {
        "Player" => Winner::Player,
        "PC" => Winner::Pc,
        _ => return None,
    };
    Some(RoundSummary {
        total_mines,
        attempts,
        elapsed_secs,
        winner,
    })
}
