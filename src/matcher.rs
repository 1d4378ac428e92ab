// src/matcher.rs
// Pure win-rule evaluation of a single card

use crate::card::Card;
use crate::defs::{Cell, GRID};
use crate::logging::log_debug;
use crate::program::{CustomRules, GameKind, Pattern};

/// Evaluate one card under one game kind. Returns the winning cells, in rule order.
pub fn evaluate(card: &Card, kind: &GameKind) -> Option<Vec<Cell>> {
    match kind {
        GameKind::Classic { .. } => classic_win(card),
        GameKind::FixedShape { cells } => fixed_shape_win(card, cells),
        GameKind::SpecialNumber { .. } | GameKind::OddEven { .. } => coverall_win(card),
        GameKind::Custom(rules) => custom_win(card, rules),
        GameKind::Unsupported { .. } => None,
    }
}

fn all_marked(card: &Card, cells: &[Cell]) -> bool {
    cells.iter().all(|cell| card.is_marked(*cell))
}

/// Candidate lines: rows top to bottom, columns left to right, main diagonal, anti-diagonal
fn classic_lines() -> impl Iterator<Item = Vec<Cell>> {
    let g = GRID as u8;
    let rows = (0..g).map(move |r| (0..g).map(|c| Cell(r, c)).collect::<Vec<_>>());
    let cols = (0..g).map(move |c| (0..g).map(|r| Cell(r, c)).collect::<Vec<_>>());
    let diag = std::iter::once((0..g).map(|i| Cell(i, i)).collect::<Vec<_>>());
    let anti = std::iter::once((0..g).map(|i| Cell(i, g - 1 - i)).collect::<Vec<_>>());
    rows.chain(cols).chain(diag).chain(anti)
}

pub fn classic_win(card: &Card) -> Option<Vec<Cell>> {
    classic_lines().find(|line| all_marked(card, line))
}

/// An empty shape never wins
pub fn fixed_shape_win(card: &Card, shape: &[Cell]) -> Option<Vec<Cell>> {
    if shape.is_empty() || !all_marked(card, shape) {
        return None;
    }
    Some(shape.to_vec())
}

/// Full card, row-major
pub fn coverall_win(card: &Card) -> Option<Vec<Cell>> {
    let g = GRID as u8;
    let cells: Vec<Cell> = (0..g).flat_map(|r| (0..g).map(move |c| Cell(r, c))).collect();
    all_marked(card, &cells).then_some(cells)
}

/// Cells of `pattern` that count under the program's position rules
fn surviving_cells(pattern: &Pattern, rules: &CustomRules) -> Vec<Cell> {
    pattern.cells.iter()
        .copied()
        .filter(|cell| !pattern.excluded.contains(cell))
        .filter(|cell| !rules.disallowed_positions.contains(cell))
        .filter(|cell| rules.allowed_positions.is_empty() || rules.allowed_positions.contains(cell))
        .collect()
}

/// First pattern whose surviving cells are non-empty and all marked
pub fn custom_win(card: &Card, rules: &CustomRules) -> Option<Vec<Cell>> {
    rules.patterns.iter().enumerate().find_map(|(i, pattern)| {
        let cells = surviving_cells(pattern, rules);
        if cells.is_empty() {
            log_debug(&format!("custom pattern {i} has no cells left after exclusions"));
            return None;
        }
        if let Some(cell) = cells.iter().find(|cell| !card.is_marked(**cell)) {
            log_debug(&format!("custom pattern {i}: cell [{},{}] not marked", cell.0, cell.1));
            return None;
        }
        Some(cells)
    })
}
