// src/state.rs
// Authoritative application snapshot as pushed by the server

use serde::Deserialize;

use crate::card::Card;
use crate::program::Program;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum View {
    #[default]
    Welcome,
    SetupGames,
    ProgramPick,
    Overview,
    Focus,
}

impl View {
    /// Views where cards are on screen and wins are evaluated
    pub fn is_game_view(self) -> bool {
        matches!(self, View::Overview | View::Focus)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    #[default]
    Play,
    Debug,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Play => "PLAY",
            Mode::Debug => "DEBUG",
        }
    }

    pub fn toggled(self) -> Mode {
        match self {
            Mode::Play => Mode::Debug,
            Mode::Debug => Mode::Play,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct AppState {
    pub view: View,
    pub mode: Mode,
    pub status: String,
    pub gain: f64,
    /// Speaker volume 0-100, -1 when the server cannot read it
    pub speaker: i32,
    pub cards: Vec<Card>,
    pub program: Option<Program>,
    pub focus_idx: Option<usize>,
    pub session_total_games: Option<u32>,
    pub session_lineup: Vec<String>,
    pub current_game_idx: u32,
    pub sheet_n: Option<u32>,
    pub last_heard: String,
    pub free_enabled: Option<bool>,
    /// Input parser mode announced through CONFIG pushes
    #[serde(skip)]
    pub parse_mode: Option<String>,
}

impl AppState {
    pub fn is_game_view(&self) -> bool {
        self.view.is_game_view()
    }

    /// Games in the session; a session that was never configured counts as 0
    pub fn total_games(&self) -> u32 {
        self.session_total_games.unwrap_or(0)
    }

    /// True when another game follows the current one in this session
    pub fn has_next_game(&self) -> bool {
        let total = self.total_games();
        total > 0 && self.current_game_idx + 1 < total
    }

    pub fn speaker_available(&self) -> bool {
        self.speaker >= 0
    }

    /// Total length of every card's call log
    pub fn call_count(&self) -> usize {
        self.cards.iter().map(|card| card.calls().len()).sum()
    }
}
