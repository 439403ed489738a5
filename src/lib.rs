// src/lib.rs

//! OSRS progress tracker library.
//!
//! Turns stored player snapshots into a timeline of progress events.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod storage;
pub mod utils;
