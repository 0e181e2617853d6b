use supermine_common::models::{Cell, Pos};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileContent {
    #[default]
    Empty,
    Mine,
    SuperMine,
}

impl TileContent {
    pub const fn is_mine(self) -> bool {
        matches!(self, Self::Mine | Self::SuperMine)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileStatus {
    #[default]
    Hidden,
    Flagged,
    Revealed,
}

/// Result of revealing a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealChange {
    /// Tile was already revealed, nothing happened.
    Unchanged,
    /// Tile became revealed, `was_flagged` tells the caller to release a flag.
    Revealed { was_flagged: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pos: Pos,
    content: TileContent,
    adjacent: u8,
    status: TileStatus,
}

impl Tile {
    pub fn new(pos: Pos) -> Self {
        Self {
            pos,
            content: TileContent::Empty,
            adjacent: 0,
            status: TileStatus::Hidden,
        }
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn content(&self) -> TileContent {
        self.content
    }

    pub fn is_mine(&self) -> bool {
        self.content.is_mine()
    }

    pub fn is_supermine(&self) -> bool {
        self.content == TileContent::SuperMine
    }

    pub fn adjacent(&self) -> u8 {
        self.adjacent
    }

    pub fn status(&self) -> TileStatus {
        self.status
    }

    pub fn is_revealed(&self) -> bool {
        self.status == TileStatus::Revealed
    }

    pub fn is_flagged(&self) -> bool {
        self.status == TileStatus::Flagged
    }

    pub(crate) fn set_content(&mut self, content: TileContent) {
        self.content = content;
    }

    pub(crate) fn set_adjacent(&mut self, adjacent: u8) {
        if !self.is_revealed() {
            self.adjacent = adjacent;
        }
    }

    /// Flips between hidden and flagged. Returns false on a revealed tile.
    pub fn toggle_flag(&mut self) -> bool {
        self.status = match self.status {
            TileStatus::Hidden => TileStatus::Flagged,
            TileStatus::Flagged => TileStatus::Hidden,
            TileStatus::Revealed => return false,
        };
        true
    }

    /// Unflags a flagged tile, otherwise does nothing.
    pub fn clear_flag(&mut self) -> bool {
        if self.is_flagged() {
            self.status = TileStatus::Hidden;
            true
        } else {
            false
        }
    }

    pub fn reveal(&mut self) -> RevealChange {
        match self.status {
            TileStatus::Revealed => RevealChange::Unchanged,
            previous => {
                self.status = TileStatus::Revealed;
                RevealChange::Revealed {
                    was_flagged: previous == TileStatus::Flagged,
                }
            }
        }
    }
}

impl From<&Tile> for Cell {
    fn from(value: &Tile) -> Self {
        match value.status {
            TileStatus::Hidden => Self::Hidden,
            TileStatus::Flagged => Self::Flagged,
            TileStatus::Revealed => match value.content {
                TileContent::Empty => Self::Revealed {
                    adjacent: value.adjacent,
                },
                TileContent::Mine => Self::Mine,
                TileContent::SuperMine => Self::SuperMine,
            },
        }
    }
}
