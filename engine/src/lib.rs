//! Single-player minesweeper engine with a supermine rule, a countdown and a bounded round
//! history.
//!
//! [`session::Session`] is the entry point for front-ends: it owns the current round, deals a
//! safe board for the first click, runs the countdown and records finished rounds.
//! [`logic::GameEngine`] can also be driven directly for a single round without any runtime.

pub mod config;
pub mod countdown;
pub mod data;
pub mod error;
pub mod generator;
pub mod logic;
pub mod recorder;
pub mod scenario;
pub mod session;
