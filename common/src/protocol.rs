use serde::{Deserialize, Serialize};

use crate::models::{Cell, Pos, RoundStatus, RoundSummary};

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "action")]
pub enum ClientMessage {
    #[serde(rename = "reveal")]
    Reveal { pos: Pos },
    #[serde(rename = "flag")]
    Flag { pos: Pos },
    #[serde(rename = "solution")]
    Solution,
    #[serde(rename = "restart")]
    Restart,
    #[serde(rename = "rounds")]
    Rounds,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
    pub pos: Pos,
    pub value: Cell,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "init")]
    Init {
        size: usize,
        mines: usize,
        time_left: u64,
        field: Vec<Vec<Cell>>,
    },
    #[serde(rename = "update")]
    Update {
        updates: Vec<CellUpdate>,
        status: RoundStatus,
        attempts: u32,
        marked: usize,
    },
    #[serde(rename = "tick")]
    Tick { time_left: u64, status: RoundStatus },
    #[serde(rename = "history")]
    History { rounds: Vec<RoundSummary> },
    #[serde(rename = "error")]
    Error { message: String },
}
