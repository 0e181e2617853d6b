use std::ops::{Index, IndexMut};

use supermine_common::models::{Cell, Pos};

use crate::error::{GameError, Result};

pub use tile::{RevealChange, Tile, TileContent, TileStatus};

mod tile;

/// Square minefield, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: usize,
    mines: usize,
    cells: Vec<Tile>,
}

impl Board {
    /// An all-empty board.
    pub fn new(size: usize) -> Self {
        let cells = (0..size * size)
            .map(|index| Tile::new(Pos::new(index / size, index % size)))
            .collect();
        Self {
            size,
            mines: 0,
            cells,
        }
    }

    /// Builds a board with mines at fixed positions. Duplicates collapse into one mine and a
    /// supermine listed among `mines` is only counted once.
    pub fn from_mines(size: usize, mines: &[Pos], supermine: Option<Pos>) -> Result<Self> {
        let mut board = Self::new(size);
        if let Some(pos) = supermine {
            board.place(board.validate_pos(pos)?, TileContent::SuperMine);
        }
        for &pos in mines {
            let pos = board.validate_pos(pos)?;
            if board[pos].content() == TileContent::Empty {
                board.place(pos, TileContent::Mine);
            }
        }
        Ok(board)
    }

    pub(crate) fn place(&mut self, pos: Pos, content: TileContent) {
        match (self[pos].is_mine(), content.is_mine()) {
            (false, true) => self.mines += 1,
            (true, false) => self.mines -= 1,
            _ => {}
        }
        self[pos].set_content(content);
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn total_tiles(&self) -> usize {
        self.cells.len()
    }

    /// Number of mine-bearing tiles, supermine included.
    pub fn mine_count(&self) -> usize {
        self.mines
    }

    pub fn validate_pos(&self, pos: Pos) -> Result<Pos> {
        if pos.row < self.size && pos.col < self.size {
            Ok(pos)
        } else {
            Err(GameError::OutOfBounds {
                pos,
                size: self.size,
            })
        }
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.cells.iter()
    }

    pub fn mine_positions(&self) -> impl Iterator<Item = Pos> + '_ {
        self.cells
            .iter()
            .filter(|tile| tile.is_mine())
            .map(|tile| tile.pos())
    }

    pub fn supermine(&self) -> Option<Pos> {
        self.cells
            .iter()
            .find(|tile| tile.is_supermine())
            .map(|tile| tile.pos())
    }

    /// The 8-neighbourhood of `pos`, clipped at the board edges.
    pub fn neighbors(&self, pos: Pos) -> impl Iterator<Item = Pos> + use<> {
        let size = self.size;
        (-1isize..=1)
            .flat_map(|dr| (-1isize..=1).map(move |dc| (dr, dc)))
            .filter(|&delta| delta != (0, 0))
            .filter_map(move |(dr, dc)| {
                let row = pos.row.checked_add_signed(dr)?;
                let col = pos.col.checked_add_signed(dc)?;
                (row < size && col < size).then_some(Pos { row, col })
            })
    }

    pub fn count_adjacent_mines(&self, pos: Pos) -> u8 {
        self.neighbors(pos).filter(|&n| self[n].is_mine()).count() as u8
    }

    pub fn field(&self) -> Vec<Vec<Cell>> {
        self.cells
            .chunks(self.size)
            .map(|row| row.iter().map(Cell::from).collect())
            .collect()
    }

    fn index_of(&self, pos: Pos) -> usize {
        assert!(
            pos.row < self.size && pos.col < self.size,
            "position {pos} outside {0}x{0} board",
            self.size
        );
        pos.row * self.size + pos.col
    }
}

impl Index<Pos> for Board {
    type Output = Tile;

    fn index(&self, pos: Pos) -> &Self::Output {
        &self.cells[self.index_of(pos)]
    }
}

impl IndexMut<Pos> for Board {
    fn index_mut(&mut self, pos: Pos) -> &mut Self::Output {
        let index = self.index_of(pos);
        &mut self.cells[index]
    }
}
