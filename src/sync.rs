// src/sync.rs
// State sync layer: applies server push messages to the local snapshot

use serde::Deserialize;
use serde_json::Value;

use crate::logging::{log_debug, log_warning};
use crate::program::Program;
use crate::state::{AppState, Mode};

/// Server push message, tagged by `type`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum PushMessage {
    State {
        state: Box<AppState>,
    },
    Call {
        call: String,
        state: Box<AppState>,
    },
    Status {
        status: String,
    },
    Heard {
        #[serde(default)]
        raw: String,
    },
    Config {
        key: String,
        #[serde(default)]
        value: Value,
    },
    Mode {
        mode: Mode,
    },
    Ping {
        #[serde(default)]
        t: Option<f64>,
    },
}

impl PushMessage {
    pub fn parse(text: &str) -> Result<PushMessage, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// What the caller has to re-derive after a message was applied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// The snapshot was replaced: re-render and re-evaluate wins
    pub changed: bool,
    /// Text for the transient "heard" display
    pub heard: Option<String>,
}

/// Holder of the latest authoritative snapshot. Every change replaces it wholesale.
#[derive(Debug, Default)]
pub struct StateSync {
    snapshot: Option<AppState>,
}

impl StateSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<&AppState> {
        self.snapshot.as_ref()
    }

    /// Install a full snapshot obtained outside the push channel (e.g. `GET /api/state`)
    pub fn replace(&mut self, state: AppState) {
        self.install(state);
    }

    /// Full snapshots never carry the parser mode, it only arrives through CONFIG
    fn install(&mut self, mut state: AppState) {
        if state.parse_mode.is_none() {
            state.parse_mode = self.snapshot.as_mut().and_then(|s| s.parse_mode.take());
        }
        self.snapshot = Some(state);
    }

    fn mode(&self) -> Mode {
        self.snapshot.as_ref().map(|s| s.mode).unwrap_or_default()
    }

    /// Copy of the current snapshot with `update` applied, installed as the new snapshot
    fn patch(&mut self, update: impl FnOnce(&mut AppState) -> bool) -> SyncOutcome {
        let Some(current) = &self.snapshot else {
            return SyncOutcome::default();
        };
        let mut next = current.clone();
        if !update(&mut next) {
            return SyncOutcome::default();
        }
        self.snapshot = Some(next);
        SyncOutcome { changed: true, heard: None }
    }

    pub fn apply(&mut self, message: PushMessage) -> SyncOutcome {
        match message {
            PushMessage::State { state } => {
                self.install(*state);
                SyncOutcome { changed: true, heard: None }
            }
            PushMessage::Call { call, state } => {
                let heard = (state.mode == Mode::Play && !call.is_empty()).then_some(call);
                self.install(*state);
                SyncOutcome { changed: true, heard }
            }
            PushMessage::Status { status } => self.patch(|state| {
                state.status = status;
                true
            }),
            PushMessage::Heard { raw } => {
                let heard = (self.mode() == Mode::Play && !raw.is_empty()).then_some(raw);
                SyncOutcome { changed: false, heard }
            }
            PushMessage::Config { key, value } => self.patch(|state| apply_config(state, &key, value)),
            PushMessage::Mode { mode } => self.patch(|state| {
                state.mode = mode;
                true
            }),
            PushMessage::Ping { .. } => SyncOutcome::default(),
        }
    }
}

/// Returns false when the key is unknown or the value unusable
fn apply_config(state: &mut AppState, key: &str, value: Value) -> bool {
    match key {
        "gain" => match value.as_f64() {
            Some(gain) => {
                state.gain = gain;
                true
            }
            None => false,
        },
        "speaker" => match value.as_i64() {
            Some(speaker) => {
                state.speaker = speaker as i32;
                true
            }
            None => false,
        },
        "program" => match serde_json::from_value::<Program>(value) {
            Ok(program) => {
                state.program = Some(program);
                true
            }
            Err(e) => {
                log_warning(&format!("Ignoring malformed program config: {e}"));
                false
            }
        },
        "parse_mode" => {
            state.parse_mode = value.as_str().map(str::to_string);
            true
        }
        other => {
            log_debug(&format!("ignoring config key {other}"));
            false
        }
    }
}
