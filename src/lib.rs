// lib.rs
// Library modules for the bingo assistant client

pub mod defs;
pub mod logging;
pub mod config;
pub mod card;
pub mod program;
pub mod state;
pub mod matcher;
pub mod detector;
pub mod timer;
pub mod presentation;
pub mod sync;
pub mod lineup;
pub mod session;
pub mod clients;
