use std::{fmt::Write as _, fs, io, path::Path};

use rand::Rng;
use supermine_common::models::{Pos, ScenarioParams};
use tracing::{debug, warn};

use crate::data::{Board, TileContent};

/// Random mine placement for a fixed board size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardGenerator {
    size: usize,
    mines: usize,
    has_supermine: bool,
}

impl BoardGenerator {
    pub fn new(size: usize, mines: usize, has_supermine: bool) -> Self {
        let total = size * size;
        let mines = if mines >= total {
            let fits = total.saturating_sub(1);
            warn!(
                "Requested {} mines but a {}x{} board only fits {}, clamping",
                mines, size, size, fits
            );
            fits
        } else {
            mines
        };
        Self {
            size,
            mines,
            has_supermine: has_supermine && mines > 0,
        }
    }

    pub fn from_scenario(params: &ScenarioParams) -> Self {
        Self::new(params.board_size(), params.mines, params.has_supermine)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn mines(&self) -> usize {
        self.mines
    }

    /// Places the supermine first, then rejection-samples plain mines until the board holds
    /// exactly the configured number of mine-bearing tiles.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Board {
        let mut board = Board::new(self.size);

        if self.has_supermine {
            let pos = self.random_pos(rng);
            board.place(pos, TileContent::SuperMine);
        }

        while board.mine_count() < self.mines {
            let pos = self.random_pos(rng);
            if board[pos].content() == TileContent::Empty {
                board.place(pos, TileContent::Mine);
            }
        }

        debug!(
            "Generated {}x{} board with {} mines, supermine: {:?}",
            self.size,
            self.size,
            board.mine_count(),
            board.supermine()
        );
        board
    }

    fn random_pos<R: Rng + ?Sized>(&self, rng: &mut R) -> Pos {
        Pos::new(rng.random_range(0..self.size), rng.random_range(0..self.size))
    }
}

/// One `row,col,is_supermine` line per mine-bearing tile, in row-major order.
pub fn mine_snapshot(board: &Board) -> String {
    board
        .tiles()
        .filter(|tile| tile.is_mine())
        .fold(String::new(), |mut out, tile| {
            let pos = tile.pos();
            let _ = writeln!(
                out,
                "{},{},{}",
                pos.row,
                pos.col,
                u8::from(tile.is_supermine())
            );
            out
        })
}

pub fn write_mine_snapshot(board: &Board, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, mine_snapshot(board))
}
