// src/clients/mod.rs
// Client-side plumbing for the bingo assistant server
//
// - common: request/response structures and HTTP helpers
// - api_client: typed calls to every HTTP endpoint
// - push: WebSocket push channel with reconnect
// - terminal: terminal screen and line-based command input

pub mod common;
pub mod api_client;
pub mod push;
pub mod terminal;

#[cfg(test)]
pub(crate) mod stub_server;
