// src/program.rs
// Game programs: the closed set of win rules a game can be played under,
// plus the editable game definitions served by the games editor endpoints

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::defs::{Cell, Number, FIRSTNUMBER, LASTNUMBER};

/// One custom pattern: the cells to complete, minus the excluded ones
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pattern {
    #[serde(default)]
    pub cells: Vec<Cell>,
    #[serde(default)]
    pub excluded: Vec<Cell>,
}

/// Rule-set of a `custom` program
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomRules {
    #[serde(default)]
    pub patterns: Vec<Pattern>,
    #[serde(default)]
    pub allowed_numbers: Vec<Number>,
    #[serde(default)]
    pub disallowed_numbers: Vec<Number>,
    #[serde(default)]
    pub allowed_positions: Vec<Cell>,
    #[serde(default)]
    pub disallowed_positions: Vec<Cell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    Odd,
    Even,
}

impl Parity {
    pub fn of(number: Number) -> Parity {
        if number % 2 == 0 { Parity::Even } else { Parity::Odd }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameKind {
    Classic { free_enabled: bool },
    FixedShape { cells: Vec<Cell> },
    /// Coverall; digits of the first ball are pre-marked by the server
    SpecialNumber { digits: Vec<u8> },
    /// Coverall; numbers with the first ball's parity are pre-marked by the server
    OddEven { first: Option<Parity> },
    Custom(CustomRules),
    /// A kind this client does not know. Never wins.
    Unsupported { kind: String },
}

impl GameKind {
    pub fn name(&self) -> &str {
        match self {
            GameKind::Classic { .. } => "classic",
            GameKind::FixedShape { .. } => "fixed_shape",
            GameKind::SpecialNumber { .. } => "special_number",
            GameKind::OddEven { .. } => "odd_even",
            GameKind::Custom(_) => "custom",
            GameKind::Unsupported { kind } => kind,
        }
    }
}

/// Program as carried in the state snapshot and in `/api/programs`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "ProgramWire")]
pub struct Program {
    pub key: String,
    pub name: String,
    pub desc: String,
    pub kind: GameKind,
}

#[derive(Debug, Deserialize)]
struct ProgramWire {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    desc: Option<String>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    params: Value,
    #[serde(default)]
    preview_cells: Option<Vec<Cell>>,
    #[serde(default)]
    patterns: Option<Vec<Pattern>>,
    #[serde(default)]
    allowed_numbers: Option<Vec<Number>>,
    #[serde(default)]
    disallowed_numbers: Option<Vec<Number>>,
    #[serde(default)]
    allowed_positions: Option<Vec<Cell>>,
    #[serde(default)]
    disallowed_positions: Option<Vec<Cell>>,
}

/// Top-level field if present, else the same key inside `params`
fn field_or_param<T: DeserializeOwned + Default>(top: Option<T>, params: &Value, key: &str) -> T {
    top.or_else(|| params.get(key).and_then(|v| serde_json::from_value(v.clone()).ok()))
        .unwrap_or_default()
}

impl From<ProgramWire> for Program {
    fn from(wire: ProgramWire) -> Self {
        let params = &wire.params;
        let kind_name = wire.kind.unwrap_or_default().to_lowercase();

        let kind = match kind_name.as_str() {
            "classic" => GameKind::Classic {
                free_enabled: params.get("free_enabled").and_then(Value::as_bool).unwrap_or(true),
            },
            "fixed_shape" => GameKind::FixedShape {
                cells: wire.preview_cells.unwrap_or_default(),
            },
            "special_number" => GameKind::SpecialNumber {
                digits: field_or_param(None, params, "digits"),
            },
            "odd_even" => GameKind::OddEven {
                first: field_or_param::<Option<Parity>>(None, params, "first"),
            },
            "custom" => GameKind::Custom(CustomRules {
                patterns: field_or_param(wire.patterns, params, "patterns"),
                allowed_numbers: field_or_param(wire.allowed_numbers, params, "allowed_numbers"),
                disallowed_numbers: field_or_param(wire.disallowed_numbers, params, "disallowed_numbers"),
                allowed_positions: field_or_param(wire.allowed_positions, params, "allowed_positions"),
                disallowed_positions: field_or_param(wire.disallowed_positions, params, "disallowed_positions"),
            }),
            _ => GameKind::Unsupported { kind: kind_name },
        };

        Program {
            key: wire.key.unwrap_or_default(),
            name: wire.name.unwrap_or_default(),
            desc: wire.desc.unwrap_or_default(),
            kind,
        }
    }
}

// ============================================================================
// Games editor definitions
// ============================================================================

/// A game definition as read from and written to `/api/games/editor`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameDefinition {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default, skip_serializing)]
    pub is_custom: bool,
    #[serde(default = "default_free_enabled")]
    pub free_enabled: bool,
    #[serde(flatten)]
    pub rules: CustomRules,
}

fn default_free_enabled() -> bool {
    true
}

impl GameDefinition {
    /// Body sent on create/update. The server also reads `params.free_enabled`.
    pub fn to_payload(&self) -> Value {
        let mut payload = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut payload {
            map.insert("params".to_string(), serde_json::json!({ "free_enabled": self.free_enabled }));
        }
        payload
    }
}

/// Parse a number list such as "1-10, 15, 70-75": ranges and single numbers in
/// 1..=75, deduplicated and sorted. Invalid parts are skipped.
pub fn parse_number_list(value: &str) -> Vec<Number> {
    let mut numbers = Vec::new();
    let in_range = |n: u32| (FIRSTNUMBER as u32..=LASTNUMBER as u32).contains(&n);

    for part in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if let Some((start, end)) = part.split_once('-') {
            let (Ok(start), Ok(end)) = (start.trim().parse::<u32>(), end.trim().parse::<u32>()) else {
                continue;
            };
            if in_range(start) && in_range(end) && start <= end {
                numbers.extend((start..=end).map(|n| n as Number));
            }
        } else if let Ok(n) = part.parse::<u32>() {
            if in_range(n) {
                numbers.push(n as Number);
            }
        }
    }

    numbers.sort_unstable();
    numbers.dedup();
    numbers
}
