use std::sync::Arc;

use supermine_common::{
    models::{Cell, Pos, RoundStatus, RoundSummary, Winner},
    protocol::CellUpdate,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    countdown::Countdown,
    data::{Board, RevealChange},
    error::{GameError, Result},
    recorder::RoundSink,
};

/// Flagging the supermine before this many attempts triggers its row/column reveal.
pub const SUPERMINE_ATTEMPT_WINDOW: u32 = 4;

/// One round of play on one board.
///
/// Every mutating call returns the tiles it changed so a renderer can follow along without
/// polling the whole board.
pub struct GameEngine {
    board: Board,
    mines: usize,
    max_time: u64,
    time_left: u64,
    attempts: u32,
    marked: usize,
    revealed: usize,
    status: RoundStatus,
    supermine_rule_fired: bool,
    summary: Option<RoundSummary>,
    countdown: Countdown,
    sink: Arc<dyn RoundSink>,
}

impl GameEngine {
    pub fn new(board: Board, max_time: u64, sink: Arc<dyn RoundSink>) -> Self {
        Self {
            mines: board.mine_count(),
            board,
            max_time,
            time_left: max_time,
            attempts: 0,
            marked: 0,
            revealed: 0,
            status: RoundStatus::NotStarted,
            supermine_rule_fired: false,
            summary: None,
            countdown: Countdown::idle(),
            sink,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn size(&self) -> usize {
        self.board.size()
    }

    pub fn mines(&self) -> usize {
        self.mines
    }

    pub fn time_left(&self) -> u64 {
        self.time_left
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn marked(&self) -> usize {
        self.marked
    }

    pub fn revealed(&self) -> usize {
        self.revealed
    }

    pub fn status(&self) -> RoundStatus {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    pub fn supermine_rule_fired(&self) -> bool {
        self.supermine_rule_fired
    }

    /// Summary produced when the round ended.
    pub fn summary(&self) -> Option<RoundSummary> {
        self.summary
    }

    /// Whether a reveal at `pos` would lose a still open round before any attempt was counted.
    pub fn is_unsafe_first_click(&self, pos: Pos) -> Result<bool> {
        let pos = self.board.validate_pos(pos)?;
        Ok(!self.is_finished() && self.attempts == 0 && self.board[pos].is_mine())
    }

    /// The round has started but no countdown task is attached yet.
    pub fn needs_countdown(&self) -> bool {
        self.status == RoundStatus::Playing && !self.countdown.is_armed()
    }

    pub fn attach_countdown(&mut self, handle: JoinHandle<()>) {
        if self.is_finished() {
            handle.abort();
        } else {
            self.countdown.start(handle);
        }
    }

    /// Left click: counts an attempt and reveals with flood fill.
    pub fn add_reveal_click(&mut self, pos: Pos) -> Result<Vec<CellUpdate>> {
        let pos = self.board.validate_pos(pos)?;
        self.start();
        self.attempts += 1;

        let mut updates = Vec::new();
        self.reveal_tile(pos, true, &mut updates);
        Ok(updates)
    }

    /// Right click: toggles a flag, subject to the flag budget and the supermine rule.
    pub fn flag_tile(&mut self, pos: Pos) -> Result<Vec<CellUpdate>> {
        let pos = self.board.validate_pos(pos)?;
        let mut updates = Vec::new();

        if self.board[pos].is_supermine() {
            self.start();
        }

        if self.is_finished() || self.board[pos].is_revealed() {
            return Ok(updates);
        }

        if self.board[pos].is_flagged() {
            self.board[pos].toggle_flag();
            self.marked -= 1;
            self.push_update(pos, &mut updates);
            return Ok(updates);
        }

        if self.marked == self.mines {
            debug!("Flag budget of {} exhausted", self.mines);
            return Ok(updates);
        }

        self.board[pos].toggle_flag();
        self.marked += 1;
        self.push_update(pos, &mut updates);

        if self.board[pos].is_supermine()
            && self.attempts < SUPERMINE_ATTEMPT_WINDOW
            && !self.supermine_rule_fired
        {
            self.fire_supermine_rule(pos, &mut updates);
        }

        Ok(updates)
    }

    /// Forfeits the round, showing every mine.
    pub fn solution(&mut self) -> Result<Vec<CellUpdate>> {
        if self.attempts == 0 {
            return Err(GameError::NotStarted);
        }

        let mut updates = Vec::new();
        self.reveal_mines(&mut updates);
        self.end_round(RoundStatus::Lost);
        Ok(updates)
    }

    /// One countdown second. Returns whether the countdown should keep running.
    pub fn tick(&mut self) -> bool {
        match self.status {
            RoundStatus::NotStarted => true,
            RoundStatus::Won | RoundStatus::Lost => false,
            RoundStatus::Playing if self.time_left > 0 => {
                self.time_left -= 1;
                true
            }
            RoundStatus::Playing => {
                info!("Time is up");
                self.end_round(RoundStatus::Lost);
                false
            }
        }
    }

    fn start(&mut self) {
        if self.status == RoundStatus::NotStarted {
            self.status = RoundStatus::Playing;
            debug!("Round started with {}s on the clock", self.time_left);
        }
    }

    /// Reveals `start`, spreading through zero-adjacency tiles when `cascade` is set.
    fn reveal_tile(&mut self, start: Pos, cascade: bool, updates: &mut Vec<CellUpdate>) {
        if self.is_finished() || self.board[start].is_revealed() {
            return;
        }

        if self.board[start].is_mine() {
            info!("Mine hit at {}", start);
            self.reveal_mines(updates);
            self.end_round(RoundStatus::Lost);
            return;
        }

        let mut worklist = vec![start];
        while let Some(pos) = worklist.pop() {
            if self.is_finished() {
                break;
            }
            let tile = &self.board[pos];
            if tile.is_revealed() || tile.is_mine() {
                continue;
            }

            let adjacent = self.board.count_adjacent_mines(pos);
            self.board[pos].set_adjacent(adjacent);
            self.reveal_safe(pos, updates);
            self.check_won();

            if adjacent == 0 && cascade {
                worklist.extend(
                    self.board
                        .neighbors(pos)
                        .filter(|&n| !self.board[n].is_revealed()),
                );
            }
        }
    }

    fn reveal_safe(&mut self, pos: Pos, updates: &mut Vec<CellUpdate>) {
        if let RevealChange::Revealed { was_flagged } = self.board[pos].reveal() {
            if was_flagged {
                self.marked -= 1;
            }
            self.revealed += 1;
            self.push_update(pos, updates);
        }
    }

    /// Reveals a mine-bearing tile without losing the round.
    fn expose_mine(&mut self, pos: Pos, updates: &mut Vec<CellUpdate>) {
        if let RevealChange::Revealed { was_flagged } = self.board[pos].reveal() {
            if was_flagged {
                self.marked -= 1;
            }
            self.push_update(pos, updates);
        }
    }

    fn reveal_mines(&mut self, updates: &mut Vec<CellUpdate>) {
        let mines: Vec<Pos> = self.board.mine_positions().collect();
        for pos in mines {
            self.expose_mine(pos, updates);
        }
    }

    fn fire_supermine_rule(&mut self, supermine: Pos, updates: &mut Vec<CellUpdate>) {
        info!(
            "Supermine flagged at {} on attempt {}, revealing its row and column",
            supermine, self.attempts
        );
        self.supermine_rule_fired = true;

        if self.board[supermine].clear_flag() {
            self.marked -= 1;
        }
        self.expose_mine(supermine, updates);

        let size = self.board.size();
        for i in 0..size {
            if i != supermine.row {
                self.reveal_in_line(Pos::new(i, supermine.col), updates);
            }
            if i != supermine.col {
                self.reveal_in_line(Pos::new(supermine.row, i), updates);
            }
        }
    }

    fn reveal_in_line(&mut self, pos: Pos, updates: &mut Vec<CellUpdate>) {
        if self.board[pos].is_mine() {
            self.expose_mine(pos, updates);
        } else {
            self.reveal_tile(pos, false, updates);
        }
    }

    fn check_won(&mut self) {
        if self.revealed + self.mines == self.board.total_tiles() && self.time_left > 0 {
            info!("All safe tiles revealed");
            self.end_round(RoundStatus::Won);
        }
    }

    fn end_round(&mut self, outcome: RoundStatus) {
        if self.is_finished() {
            return;
        }

        self.status = outcome;
        self.countdown.stop();

        let summary = RoundSummary {
            total_mines: self.mines,
            attempts: self.attempts,
            elapsed_secs: self.max_time - self.time_left,
            winner: if outcome == RoundStatus::Won {
                Winner::Player
            } else {
                Winner::Pc
            },
        };
        self.summary = Some(summary);
        info!(
            "Round ended, winner: {}, attempts: {}, time: {}s",
            summary.winner, summary.attempts, summary.elapsed_secs
        );

        if let Err(e) = self.sink.record(&summary) {
            warn!("Failed to record round summary: {}", e);
        }
    }

    fn push_update(&self, pos: Pos, updates: &mut Vec<CellUpdate>) {
        updates.push(CellUpdate {
            pos,
            value: Cell::from(&self.board[pos]),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, io, sync::Mutex};

    use crate::error::RecorderError;

    use super::*;

    #[derive(Default)]
    struct MemorySink(Mutex<Vec<RoundSummary>>);

    impl MemorySink {
        fn rounds(&self) -> Vec<RoundSummary> {
            self.0.lock().unwrap().clone()
        }
    }

    impl RoundSink for MemorySink {
        fn record(&self, summary: &RoundSummary) -> std::result::Result<(), RecorderError> {
            self.0.lock().unwrap().push(*summary);
            Ok(())
        }
    }

    struct BrokenSink;

    impl RoundSink for BrokenSink {
        fn record(&self, _: &RoundSummary) -> std::result::Result<(), RecorderError> {
            Err(io::Error::other("disk full").into())
        }
    }

    fn p(row: usize, col: usize) -> Pos {
        Pos::new(row, col)
    }

    fn new_engine(
        size: usize,
        mines: &[Pos],
        supermine: Option<Pos>,
        max_time: u64,
    ) -> (GameEngine, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::default());
        let board = Board::from_mines(size, mines, supermine).unwrap();
        (GameEngine::new(board, max_time, sink.clone()), sink)
    }

    fn revealed_set(engine: &GameEngine) -> HashSet<Pos> {
        engine
            .board()
            .tiles()
            .filter(|tile| tile.is_revealed())
            .map(|tile| tile.pos())
            .collect()
    }

    #[test]
    fn first_click_on_zero_tile_starts_round_and_floods() {
        // (0, 0) is walled in by mines and stays out of reach of the flood
        let mines = [p(0, 1), p(1, 0), p(1, 1), p(8, 8)];
        let (mut engine, _) = new_engine(9, &mines, None, 150);

        let updates = engine.add_reveal_click(p(4, 4)).unwrap();

        assert_eq!(engine.attempts(), 1);
        assert_eq!(engine.status(), RoundStatus::Playing);
        assert!(engine.revealed() > 1);
        assert_eq!(updates.len(), engine.revealed());
        assert!(engine.board().tiles().all(|t| !(t.is_mine() && t.is_revealed())));
    }

    #[test]
    fn flood_fill_reveals_zero_region_and_its_border_only() {
        // a wall of mines in column 3 splits the board
        let wall: Vec<Pos> = (0..9).map(|row| p(row, 3)).collect();
        let (mut engine, _) = new_engine(9, &wall, None, 150);

        engine.add_reveal_click(p(4, 0)).unwrap();

        let expected: HashSet<Pos> = (0..9)
            .flat_map(|row| (0..3).map(move |col| p(row, col)))
            .collect();
        assert_eq!(revealed_set(&engine), expected);
        assert_eq!(engine.revealed(), 27);
        assert_eq!(engine.board()[p(0, 2)].adjacent(), 2);
        assert_eq!(engine.board()[p(4, 1)].adjacent(), 0);
        assert_eq!(engine.status(), RoundStatus::Playing);
    }

    #[test]
    fn flood_fill_unflags_tiles_it_reaches() {
        let (mut engine, _) = new_engine(9, &[p(8, 8)], None, 150);
        engine.flag_tile(p(0, 1)).unwrap();
        assert_eq!(engine.marked(), 1);

        engine.add_reveal_click(p(0, 0)).unwrap();

        assert!(engine.board()[p(0, 1)].is_revealed());
        assert_eq!(engine.marked(), 0);
    }

    #[test]
    fn numbered_tile_does_not_cascade() {
        let (mut engine, _) = new_engine(9, &[p(0, 0)], None, 150);

        engine.add_reveal_click(p(1, 1)).unwrap();

        assert_eq!(engine.revealed(), 1);
        assert_eq!(engine.board()[p(1, 1)].adjacent(), 1);
    }

    #[test]
    fn hitting_a_mine_reveals_all_mines_and_loses() {
        let mines = [p(0, 0), p(4, 4), p(8, 8)];
        let (mut engine, sink) = new_engine(9, &mines, Some(p(2, 6)), 150);
        engine.flag_tile(p(8, 8)).unwrap();

        engine.add_reveal_click(p(4, 4)).unwrap();

        assert_eq!(engine.status(), RoundStatus::Lost);
        assert!(engine.board().mine_positions().all(|pos| engine.board()[pos].is_revealed()));
        assert_eq!(engine.marked(), 0);
        assert_eq!(sink.rounds().len(), 1);
        assert_eq!(sink.rounds()[0].winner, Winner::Pc);
    }

    #[test]
    fn revealing_every_safe_tile_wins() {
        let (mut engine, sink) = new_engine(3, &[p(2, 2)], None, 60);
        engine.tick();

        engine.add_reveal_click(p(0, 0)).unwrap();

        assert_eq!(engine.status(), RoundStatus::Won);
        assert_eq!(engine.revealed() + engine.mines(), 9);
        assert_eq!(
            sink.rounds(),
            vec![RoundSummary {
                total_mines: 1,
                attempts: 1,
                elapsed_secs: 0,
                winner: Winner::Player,
            }]
        );
    }

    #[test]
    fn actions_after_the_round_ends_change_nothing() {
        let (mut engine, sink) = new_engine(3, &[p(2, 2)], None, 60);
        engine.add_reveal_click(p(0, 0)).unwrap();

        assert!(engine.flag_tile(p(2, 2)).unwrap().is_empty());
        assert!(engine.add_reveal_click(p(2, 2)).unwrap().is_empty());
        assert_eq!(engine.status(), RoundStatus::Won);
        assert!(!engine.tick());
        assert_eq!(sink.rounds().len(), 1);
    }

    #[test]
    fn countdown_expiry_loses_the_round() {
        let (mut engine, sink) = new_engine(9, &[p(0, 0)], None, 3);
        engine.add_reveal_click(p(1, 1)).unwrap();

        assert!(engine.tick());
        assert!(engine.tick());
        assert!(engine.tick());
        assert_eq!(engine.time_left(), 0);
        assert_eq!(engine.status(), RoundStatus::Playing);

        assert!(!engine.tick());
        assert_eq!(engine.status(), RoundStatus::Lost);
        assert_eq!(sink.rounds()[0].elapsed_secs, 3);
        assert!(!engine.tick());
        assert_eq!(sink.rounds().len(), 1);
    }

    #[test]
    fn ticks_before_start_do_not_consume_time() {
        let (mut engine, _) = new_engine(9, &[p(0, 0)], None, 120);

        assert!(engine.tick());

        assert_eq!(engine.time_left(), 120);
        assert_eq!(engine.status(), RoundStatus::NotStarted);
    }

    #[test]
    fn no_win_once_time_has_run_out() {
        let (mut engine, _) = new_engine(3, &[p(2, 2)], None, 1);
        engine.add_reveal_click(p(1, 1)).unwrap();
        engine.tick();
        assert_eq!(engine.time_left(), 0);

        engine.add_reveal_click(p(0, 0)).unwrap();

        assert_eq!(engine.revealed() + engine.mines(), 9);
        assert_eq!(engine.status(), RoundStatus::Playing);
    }

    #[test]
    fn flag_budget_is_capped_at_mine_count() {
        let (mut engine, _) = new_engine(9, &[p(0, 0), p(0, 1)], None, 150);
        engine.add_reveal_click(p(1, 1)).unwrap();

        engine.flag_tile(p(8, 8)).unwrap();
        engine.flag_tile(p(0, 0)).unwrap();
        assert!(engine.flag_tile(p(0, 1)).unwrap().is_empty());
        assert_eq!(engine.marked(), 2);

        engine.flag_tile(p(8, 8)).unwrap();
        assert_eq!(engine.marked(), 1);
        assert_eq!(engine.flag_tile(p(0, 1)).unwrap().len(), 1);
        assert_eq!(engine.marked(), 2);
    }

    #[test]
    fn flags_do_not_count_as_attempts_or_start_the_round() {
        let (mut engine, _) = new_engine(9, &[p(0, 0)], None, 150);

        engine.flag_tile(p(3, 3)).unwrap();

        assert_eq!(engine.attempts(), 0);
        assert_eq!(engine.status(), RoundStatus::NotStarted);
        assert!(!engine.needs_countdown());
    }

    #[test]
    fn revealed_tiles_cannot_be_flagged() {
        let (mut engine, _) = new_engine(9, &[p(0, 0)], None, 150);
        engine.add_reveal_click(p(1, 1)).unwrap();

        assert!(engine.flag_tile(p(1, 1)).unwrap().is_empty());
        assert_eq!(engine.marked(), 0);
    }

    #[test]
    fn early_supermine_flag_reveals_row_and_column() {
        let supermine = p(5, 7);
        let mines = [p(0, 0), p(5, 2), p(12, 7), p(15, 15)];
        let (mut engine, sink) = new_engine(16, &mines, Some(supermine), 300);
        engine.flag_tile(p(12, 7)).unwrap();
        engine.add_reveal_click(p(1, 1)).unwrap();
        engine.add_reveal_click(p(4, 6)).unwrap();
        let before = revealed_set(&engine);
        assert_eq!(engine.attempts(), 2);

        engine.flag_tile(supermine).unwrap();

        assert!(engine.supermine_rule_fired());
        let line: HashSet<Pos> = (0..16)
            .map(|i| p(i, supermine.col))
            .chain((0..16).map(|i| p(supermine.row, i)))
            .collect();
        assert_eq!(line.len(), 2 * 16 - 1);
        let after = revealed_set(&engine);
        assert!(line.is_subset(&after));
        assert!(after.difference(&line).all(|pos| before.contains(pos)));
        assert_eq!(after.len(), before.len() + 2 * 16 - 1);
        assert!(engine.board()[p(5, 2)].is_revealed());
        assert_eq!(engine.marked(), 0);
        assert_eq!(engine.status(), RoundStatus::Playing);
        assert!(sink.rounds().is_empty());
    }

    #[test]
    fn supermine_line_reveal_does_not_cascade() {
        let (mut engine, _) = new_engine(9, &[p(8, 8)], Some(p(0, 0)), 150);

        engine.flag_tile(p(0, 0)).unwrap();

        assert_eq!(engine.status(), RoundStatus::Playing);
        assert_eq!(engine.attempts(), 0);
        assert_eq!(engine.revealed(), 16);
        assert!(!engine.board()[p(4, 4)].is_revealed());
        assert!(engine.needs_countdown());
    }

    #[test]
    fn supermine_rule_can_win_the_round() {
        // every safe tile shares the supermine's row or column
        let mines = [p(1, 1), p(1, 2), p(2, 1), p(2, 2)];
        let (mut engine, sink) = new_engine(3, &mines, Some(p(0, 0)), 60);

        engine.flag_tile(p(0, 0)).unwrap();

        assert_eq!(engine.status(), RoundStatus::Won);
        assert_eq!(engine.revealed(), 4);
        assert_eq!(sink.rounds()[0].winner, Winner::Player);
    }

    #[test]
    fn supermine_rule_fires_only_once_and_only_early() {
        let (mut engine, _) = new_engine(9, &[p(8, 8)], Some(p(4, 4)), 150);
        for pos in [p(3, 3), p(3, 4), p(3, 5), p(4, 3)] {
            engine.add_reveal_click(pos).unwrap();
        }
        assert_eq!(engine.attempts(), 4);

        engine.flag_tile(p(4, 4)).unwrap();

        assert!(!engine.supermine_rule_fired());
        assert!(engine.board()[p(4, 4)].is_flagged());

        let (mut engine, _) = new_engine(9, &[p(8, 8)], Some(p(4, 4)), 150);
        engine.flag_tile(p(4, 4)).unwrap();
        assert!(engine.board()[p(4, 4)].is_revealed());
        let revealed = engine.revealed();
        assert!(engine.flag_tile(p(4, 4)).unwrap().is_empty());
        assert_eq!(engine.revealed(), revealed);
    }

    #[test]
    fn solution_requires_an_attempt() {
        let (mut engine, sink) = new_engine(9, &[p(0, 0)], Some(p(3, 3)), 150);
        engine.flag_tile(p(3, 3)).unwrap();

        assert_eq!(engine.solution(), Err(GameError::NotStarted));
        assert_eq!(engine.status(), RoundStatus::Playing);
        assert!(sink.rounds().is_empty());
    }

    #[test]
    fn solution_forfeits_and_shows_mines() {
        let (mut engine, sink) = new_engine(9, &[p(0, 0), p(8, 8)], None, 150);
        engine.add_reveal_click(p(1, 1)).unwrap();
        for _ in 0..10 {
            engine.tick();
        }

        let updates = engine.solution().unwrap();

        assert_eq!(updates.len(), 2);
        assert_eq!(engine.status(), RoundStatus::Lost);
        assert_eq!(sink.rounds()[0].elapsed_secs, 10);
        assert_eq!(sink.rounds()[0].attempts, 1);

        engine.solution().unwrap();
        assert_eq!(sink.rounds().len(), 1);
    }

    #[test]
    fn recorder_failure_keeps_terminal_status() {
        let board = Board::from_mines(9, &[p(0, 0)], None).unwrap();
        let mut engine = GameEngine::new(board, 150, Arc::new(BrokenSink));

        engine.add_reveal_click(p(0, 0)).unwrap();

        assert_eq!(engine.status(), RoundStatus::Lost);
        assert!(engine.summary().is_some());
    }

    #[test]
    fn out_of_bounds_input_is_rejected_without_side_effects() {
        let (mut engine, _) = new_engine(9, &[p(0, 0)], None, 150);

        assert!(matches!(
            engine.add_reveal_click(p(9, 0)),
            Err(GameError::OutOfBounds { .. })
        ));
        assert!(engine.flag_tile(p(0, 42)).is_err());
        assert_eq!(engine.attempts(), 0);
        assert_eq!(engine.status(), RoundStatus::NotStarted);
    }

    #[test]
    fn unsafe_first_click_is_detected() {
        let (mut engine, _) = new_engine(9, &[p(0, 0)], None, 150);

        assert!(engine.is_unsafe_first_click(p(0, 0)).unwrap());
        assert!(!engine.is_unsafe_first_click(p(5, 5)).unwrap());

        engine.add_reveal_click(p(5, 5)).unwrap();
        assert!(!engine.is_unsafe_first_click(p(0, 0)).unwrap());
    }

    #[test]
    fn finished_round_without_attempts_is_never_rerolled() {
        let (mut engine, sink) = new_engine(9, &[p(0, 0)], Some(p(4, 4)), 1);
        engine.flag_tile(p(4, 4)).unwrap();
        assert_eq!(engine.status(), RoundStatus::Playing);

        assert!(engine.tick());
        assert!(!engine.tick());
        assert_eq!(engine.status(), RoundStatus::Lost);
        assert_eq!(engine.attempts(), 0);

        assert!(!engine.is_unsafe_first_click(p(0, 0)).unwrap());
        engine.add_reveal_click(p(0, 0)).unwrap();
        assert_eq!(engine.status(), RoundStatus::Lost);
        assert!(!engine.board()[p(0, 0)].is_revealed());
        assert_eq!(sink.rounds().len(), 1);
    }
}
