// src/card.rs
// Bingo card model: 5x5 number grid, structured marks and the raw call log

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

use crate::defs::{Cell, Letter, Number, FIRSTNUMBER, FREE_COL, FREE_ROW, FREE_SENTINEL, GRID, LASTNUMBER};

// ============================================================================
// Calls
// ============================================================================

/// A called ball such as "B12".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Call {
    pub letter: Letter,
    pub number: Number,
}

impl Call {
    /// Parse a call token: one of B/I/N/G/O followed by digits only, number in 1..=75.
    /// The letter is not checked against the number's column.
    pub fn parse(token: &str) -> Option<Call> {
        let mut chars = token.chars();
        let letter = match chars.next()? {
            c @ ('B' | 'I' | 'N' | 'G' | 'O') => Letter::from_char(c)?,
            _ => return None,
        };
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let number = digits.parse::<u32>().ok()?;
        if number < FIRSTNUMBER as u32 || number > LASTNUMBER as u32 {
            return None;
        }
        Some(Call { letter, number: number as Number })
    }

    /// A random ball with its proper column letter
    pub fn random() -> Call {
        let number: Number = rand::random_range(FIRSTNUMBER..=LASTNUMBER);
        let letter = Letter::for_number(number).unwrap_or(Letter::B);
        Call { letter, number }
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter, self.number)
    }
}

// ============================================================================
// Card
// ============================================================================

/// Card as the server sends it:
/// `{cols: {"B": [..5], ...}, marks: {"B5": true, "FREE": true}, calls: ["B5"]}`
#[derive(Debug, Deserialize)]
struct CardWire {
    cols: HashMap<String, Vec<Number>>,
    #[serde(default)]
    marks: HashMap<String, bool>,
    #[serde(default)]
    calls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "CardWire")]
pub struct Card {
    /// columns[col][row]
    columns: [[Number; GRID]; GRID],
    /// marked[row][col]
    marked: [[bool; GRID]; GRID],
    free: bool,
    calls: Vec<String>,
}

impl TryFrom<CardWire> for Card {
    type Error = String;

    fn try_from(wire: CardWire) -> Result<Self, Self::Error> {
        let mut columns = [[0; GRID]; GRID];
        for letter in Letter::ALL {
            let numbers = wire.cols.get(&letter.to_string())
                .ok_or_else(|| format!("card is missing column {letter}"))?;
            if numbers.len() != GRID {
                return Err(format!("column {letter} has {} numbers, expected {GRID}", numbers.len()));
            }
            columns[letter.column()].copy_from_slice(numbers);
        }

        let mut card = Card::new(columns);
        for (key, marked) in wire.marks {
            if !marked {
                continue;
            }
            if key == "FREE" {
                card.free = true;
            } else if let Some(call) = Call::parse(&key) {
                card.mark(call);
            }
        }
        card.calls = wire.calls;
        Ok(card)
    }
}

impl Card {
    /// Unmarked card from column-major numbers (B column first)
    pub fn new(columns: [[Number; GRID]; GRID]) -> Self {
        Self {
            columns,
            marked: [[false; GRID]; GRID],
            free: false,
            calls: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[[Number; GRID]; GRID] {
        &self.columns
    }

    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    pub fn free(&self) -> bool {
        self.free
    }

    pub fn set_free(&mut self, free: bool) {
        self.free = free;
    }

    /// Number printed at `cell`; `None` for the FREE square or outside the grid
    pub fn number_at(&self, cell: Cell) -> Option<Number> {
        if !cell.in_grid() || cell.is_free() {
            return None;
        }
        let n = self.columns[cell.col()][cell.row()];
        (n != FREE_SENTINEL).then_some(n)
    }

    /// Mark the call in its letter's column. Returns false if the card does not hold it.
    pub fn mark(&mut self, call: Call) -> bool {
        let col = call.letter.column();
        let found = (0..GRID).find(|&row| {
            !(row == FREE_ROW && col == FREE_COL) && self.columns[col][row] == call.number
        });
        match found {
            Some(row) => {
                self.marked[row][col] = true;
                true
            }
            None => false,
        }
    }

    /// Record a call in the log and mark it if present
    pub fn apply_call(&mut self, call: Call) -> bool {
        self.calls.push(call.to_string());
        self.mark(call)
    }

    pub fn is_marked(&self, cell: Cell) -> bool {
        if !cell.in_grid() {
            return false;
        }
        if cell.is_free() {
            return self.free;
        }
        self.marked[cell.row()][cell.col()]
    }

    /// Well-formed numbers in the call log, in call order
    pub fn called_numbers(&self) -> impl Iterator<Item = Number> + '_ {
        self.calls.iter().filter_map(|token| Call::parse(token)).map(|call| call.number)
    }
}
