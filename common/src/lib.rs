//! Shared types for the supermine engine and the front-ends that drive it.

pub mod models;
pub mod protocol;
