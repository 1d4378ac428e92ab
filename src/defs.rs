// src/defs.rs
// Shared constants and small value types for the bingo engine

use serde::{Deserialize, Serialize};
use std::fmt;

pub type Number = u8;

/// Cards are 5x5 in both directions.
pub const GRID: usize = 5;
pub const CELLS_PER_CARD: usize = GRID * GRID;

pub const FIRSTNUMBER: Number = 1;
pub const LASTNUMBER: Number = 75;

/// Numbers per column letter (B:1-15, I:16-30, ...).
pub const NUMBERS_PER_LETTER: Number = 15;

/// Row/column of the FREE centre square.
pub const FREE_ROW: usize = 2;
pub const FREE_COL: usize = 2;

/// Wire value that stands for the FREE square inside `cols.N`.
pub const FREE_SENTINEL: Number = 0;

pub const MIN_SESSION_GAMES: u32 = 1;
pub const MAX_SESSION_GAMES: u32 = 20;
pub const MIN_SHEET_CARDS: u32 = 1;
pub const MAX_SHEET_CARDS: u32 = 6;
pub const MIN_GAIN: f64 = 0.5;
pub const MAX_GAIN: f64 = 6.0;
pub const MAX_SPEAKER: i32 = 100;

// ============================================================================
// Presentation timings (milliseconds)
// ============================================================================

pub const AUDIO_FALLBACK_INTERVAL_MS: u64 = 3500;
pub const OVERLAY_PULSE_MS: u64 = 420;
pub const FLASH_START_DELAY_MS: u64 = 180;
pub const FLASH_STEP_MS: u64 = 300;

// ============================================================================
// Column letters
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Letter {
    B,
    I,
    N,
    G,
    O,
}

impl Letter {
    pub const ALL: [Letter; GRID] = [Letter::B, Letter::I, Letter::N, Letter::G, Letter::O];

    pub fn from_char(c: char) -> Option<Letter> {
        match c.to_ascii_uppercase() {
            'B' => Some(Letter::B),
            'I' => Some(Letter::I),
            'N' => Some(Letter::N),
            'G' => Some(Letter::G),
            'O' => Some(Letter::O),
            _ => None,
        }
    }

    /// Column index on the card (B=0 .. O=4)
    pub fn column(self) -> usize {
        self as usize
    }

    pub fn range(self) -> std::ops::RangeInclusive<Number> {
        let low = self.column() as Number * NUMBERS_PER_LETTER + FIRSTNUMBER;
        low..=low + NUMBERS_PER_LETTER - 1
    }

    /// The letter whose range contains `number`
    pub fn for_number(number: Number) -> Option<Letter> {
        if !(FIRSTNUMBER..=LASTNUMBER).contains(&number) {
            return None;
        }
        Some(Self::ALL[((number - FIRSTNUMBER) / NUMBERS_PER_LETTER) as usize])
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Letter::B => 'B',
            Letter::I => 'I',
            Letter::N => 'N',
            Letter::G => 'G',
            Letter::O => 'O',
        };
        write!(f, "{c}")
    }
}

// ============================================================================
// Cells
// ============================================================================

/// A (row, col) position on a card. Serialized as `[row, col]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell(pub u8, pub u8);

impl Cell {
    pub fn row(&self) -> usize {
        self.0 as usize
    }

    pub fn col(&self) -> usize {
        self.1 as usize
    }

    pub fn in_grid(&self) -> bool {
        self.row() < GRID && self.col() < GRID
    }

    pub fn is_free(&self) -> bool {
        self.row() == FREE_ROW && self.col() == FREE_COL
    }
}

/// ANSI escape sequences used by the terminal renderer
pub struct Colors;

impl Colors {
    pub fn reset() -> &'static str { "\x1b[0m" }
    pub fn bold() -> &'static str { "\x1b[1m" }
    pub fn green() -> &'static str { "\x1b[1;32m" }
    pub fn yellow() -> &'static str { "\x1b[1;33m" }
    pub fn red() -> &'static str { "\x1b[1;31m" }
    pub fn cyan() -> &'static str { "\x1b[1;36m" }
    pub fn dim() -> &'static str { "\x1b[2m" }
    pub fn flash() -> &'static str { "\x1b[1;30;43m" }
}
