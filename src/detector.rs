// src/detector.rs
// Win detection over a whole state snapshot

use serde::Serialize;
use std::collections::BTreeSet;

use crate::defs::{Cell, Number};
use crate::logging::log_debug;
use crate::matcher::evaluate;
use crate::program::{CustomRules, GameKind};
use crate::state::AppState;

/// The first winning card of a snapshot and the cells that make the win
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WinningInfo {
    pub card_idx: usize,
    pub cells: Vec<Cell>,
}

/// Distinct called numbers across every card's call log
pub fn called_numbers(state: &AppState) -> BTreeSet<Number> {
    state.cards.iter().flat_map(|card| card.called_numbers()).collect()
}

/// A custom game is void for the whole state when a disallowed number was called,
/// or when a number outside a non-empty allowed list was called.
fn custom_numbers_void(state: &AppState, rules: &CustomRules) -> bool {
    let called = called_numbers(state);

    if let Some(n) = called.iter().find(|n| rules.disallowed_numbers.contains(*n)) {
        log_debug(&format!("disallowed number {n} was called, no win possible"));
        return true;
    }
    if !rules.allowed_numbers.is_empty() {
        if let Some(n) = called.iter().find(|n| !rules.allowed_numbers.contains(*n)) {
            log_debug(&format!("called number {n} is outside the allowed list, no win possible"));
            return true;
        }
    }
    false
}

/// Scan cards in index order and return the first win. Pure and idempotent.
pub fn detect(state: &AppState) -> Option<WinningInfo> {
    let program = state.program.as_ref()?;
    if state.cards.is_empty() {
        return None;
    }

    if let GameKind::Custom(rules) = &program.kind {
        if custom_numbers_void(state, rules) {
            return None;
        }
    }

    state.cards.iter().enumerate().find_map(|(card_idx, card)| {
        evaluate(card, &program.kind).map(|cells| WinningInfo { card_idx, cells })
    })
}
