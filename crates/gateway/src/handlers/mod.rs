//! API handlers module

pub mod export;
pub mod fields;
pub mod health;
pub mod participants;
pub mod records;
pub mod stats;
pub mod tags;
pub mod users;
