// src/presentation.rs
// Winner presentation state machine.
//
// Idle -> Announced (overlay + audio loop) -> tap -> ConfirmedFlashing
// (highlight loop + action bar) -> action -> Idle.
//
// The machine never performs I/O. Every input returns the effects the caller
// must carry out (screen updates, HTTP requests), and the machine owns the
// three repeating timers that drive the audio fallback, the overlay pulse and
// the cell highlight loop.

use std::time::Duration;
use tokio::time::Instant;

use crate::defs::{Cell, Number, AUDIO_FALLBACK_INTERVAL_MS, FLASH_START_DELAY_MS, FLASH_STEP_MS, GRID, OVERLAY_PULSE_MS};
use crate::detector::{detect, WinningInfo};
use crate::logging::{log_debug, log_info, log_warning};
use crate::state::{AppState, View};
use crate::timer::{wait_deadline, RepeatingTimer};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timings {
    pub audio_fallback: Duration,
    pub pulse: Duration,
    pub flash_delay: Duration,
    pub flash_step: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            audio_fallback: Duration::from_millis(AUDIO_FALLBACK_INTERVAL_MS),
            pulse: Duration::from_millis(OVERLAY_PULSE_MS),
            flash_delay: Duration::from_millis(FLASH_START_DELAY_MS),
            flash_step: Duration::from_millis(FLASH_STEP_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinnerAction {
    NextGame,
    PlayAgain,
}

impl WinnerAction {
    pub fn for_state(state: &AppState) -> Self {
        if state.has_next_game() {
            WinnerAction::NextGame
        } else {
            WinnerAction::PlayAgain
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WinnerAction::NextGame => "Next Game",
            WinnerAction::PlayAgain => "Play Again",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    AudioFallback,
    Pulse,
    Flash,
}

/// Work the session has to carry out on behalf of the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ShowOverlay(WinningInfo),
    PulseOverlay,
    HideOverlay,
    /// Ask the server to loop the winner sound; the answer comes back through
    /// `on_audio_negotiated` with the same epoch.
    StartServerAudio { epoch: u64 },
    StopServerAudio,
    PlayJingle,
    FocusCard(usize),
    FlashCell { card_idx: usize, cell: Cell },
    ShowActionBar(WinnerAction),
    RemoveActionBar,
    AdvanceGame,
    ClearLineup,
    RestartSession,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle,
    Announced { win: WinningInfo, epoch: u64 },
    ConfirmedFlashing { win: WinningInfo, cursor: usize, action: WinnerAction },
}

type Layouts = Vec<[[Number; GRID]; GRID]>;

/// What identifies "the same game" across snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
struct GameFingerprint {
    layouts: Layouts,
    calls: usize,
}

impl GameFingerprint {
    fn of(state: &AppState) -> Self {
        Self {
            layouts: state.cards.iter().map(|card| *card.columns()).collect(),
            calls: state.call_count(),
        }
    }

    /// New cards were dealt, or the call log went backwards
    fn starts_new_game(&self, previous: &GameFingerprint) -> bool {
        self.layouts != previous.layouts || self.calls < previous.calls
    }
}

pub struct WinnerPresentation {
    phase: Phase,
    epoch: u64,
    timings: Timings,
    audio_fallback: RepeatingTimer,
    pulse: RepeatingTimer,
    flash: RepeatingTimer,
    last_game: Option<GameFingerprint>,
    /// Layouts of the game whose win was already acted on
    settled: Option<Layouts>,
}

impl Default for WinnerPresentation {
    fn default() -> Self {
        Self::new(Timings::default())
    }
}

impl WinnerPresentation {
    pub fn new(timings: Timings) -> Self {
        Self {
            phase: Phase::Idle,
            epoch: 0,
            timings,
            audio_fallback: RepeatingTimer::new(timings.audio_fallback),
            pulse: RepeatingTimer::new(timings.pulse),
            flash: RepeatingTimer::new(timings.flash_step),
            last_game: None,
            settled: None,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    /// The active win, if any
    pub fn winning(&self) -> Option<&WinningInfo> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Announced { win, .. } | Phase::ConfirmedFlashing { win, .. } => Some(win),
        }
    }

    pub fn action(&self) -> Option<WinnerAction> {
        match self.phase {
            Phase::ConfirmedFlashing { action, .. } => Some(action),
            _ => None,
        }
    }

    pub fn any_timer_active(&self) -> bool {
        self.audio_fallback.is_active() || self.pulse.is_active() || self.flash.is_active()
    }

    pub fn is_settled(&self) -> bool {
        self.settled.is_some()
    }

    fn cancel_timers(&mut self) {
        self.audio_fallback.cancel();
        self.pulse.cancel();
        self.flash.cancel();
    }

    /// Back to idle from any phase, tearing down what is on screen
    fn teardown(&mut self) -> Vec<Effect> {
        self.cancel_timers();
        if self.is_idle() {
            return Vec::new();
        }
        self.phase = Phase::Idle;
        vec![Effect::StopServerAudio, Effect::HideOverlay, Effect::RemoveActionBar]
    }

    fn announce(&mut self, win: WinningInfo) -> Vec<Effect> {
        self.epoch += 1;
        log_info(&format!("BINGO detected on card {} ({} cells)", win.card_idx + 1, win.cells.len()));
        self.phase = Phase::Announced { win: win.clone(), epoch: self.epoch };
        self.pulse.start();
        vec![Effect::ShowOverlay(win), Effect::StartServerAudio { epoch: self.epoch }]
    }

    /// A new snapshot replaced the local state
    pub fn on_snapshot(&mut self, state: &AppState) -> Vec<Effect> {
        let mut effects = Vec::new();

        let fingerprint = GameFingerprint::of(state);
        if self.last_game.as_ref().is_some_and(|previous| fingerprint.starts_new_game(previous)) {
            log_debug("new game detected, resetting winner presentation");
            effects.extend(self.teardown());
            self.settled = None;
        }
        self.last_game = Some(fingerprint);

        if !self.is_idle() || self.settled.is_some() || !state.is_game_view() {
            return effects;
        }
        if let Some(win) = detect(state) {
            effects.extend(self.announce(win));
        }
        effects
    }

    /// Server answered the winner audio request for `epoch`
    pub fn on_audio_negotiated(&mut self, epoch: u64, accepted: bool) -> Vec<Effect> {
        match self.phase {
            Phase::Announced { epoch: current, .. } if current == epoch => {}
            _ => {
                log_debug(&format!("ignoring stale audio answer for epoch {epoch}"));
                return Vec::new();
            }
        }
        if accepted {
            return Vec::new();
        }
        log_warning("Server winner audio unavailable, looping local jingle");
        self.audio_fallback.start();
        vec![Effect::PlayJingle]
    }

    /// User tapped the overlay
    pub fn on_tap(&mut self, state: &AppState) -> Vec<Effect> {
        let Phase::Announced { win, .. } = &self.phase else {
            return Vec::new();
        };
        let win = win.clone();

        self.audio_fallback.cancel();
        self.pulse.cancel();

        let action = WinnerAction::for_state(state);
        let mut effects = vec![Effect::StopServerAudio, Effect::HideOverlay];
        if state.focus_idx != Some(win.card_idx) {
            effects.push(Effect::FocusCard(win.card_idx));
        }
        effects.push(Effect::ShowActionBar(action));

        log_info(&format!("Winner confirmed on card {}", win.card_idx + 1));
        self.flash.start_after(self.timings.flash_delay);
        self.phase = Phase::ConfirmedFlashing { win, cursor: 0, action };
        effects
    }

    /// User pressed the Next Game / Play Again button
    pub fn on_action(&mut self) -> Vec<Effect> {
        let Phase::ConfirmedFlashing { action, .. } = self.phase else {
            return Vec::new();
        };

        self.cancel_timers();
        self.phase = Phase::Idle;
        self.settled = self.last_game.as_ref().map(|game| game.layouts.clone());

        let mut effects = vec![Effect::RemoveActionBar, Effect::HideOverlay];
        match action {
            WinnerAction::NextGame => effects.push(Effect::AdvanceGame),
            WinnerAction::PlayAgain => {
                effects.push(Effect::ClearLineup);
                effects.push(Effect::RestartSession);
            }
        }
        effects
    }

    /// Advancing failed on every endpoint: evaluate the current snapshot again
    pub fn release_settled(&mut self, state: &AppState) -> Vec<Effect> {
        self.settled = None;
        self.on_snapshot(state)
    }

    /// Earliest pending timer
    pub fn next_deadline(&self) -> Option<(TimerKind, Instant)> {
        [
            (TimerKind::AudioFallback, self.audio_fallback.deadline()),
            (TimerKind::Pulse, self.pulse.deadline()),
            (TimerKind::Flash, self.flash.deadline()),
        ]
        .into_iter()
        .filter_map(|(kind, deadline)| deadline.map(|d| (kind, d)))
        .min_by_key(|(_, deadline)| *deadline)
    }

    /// Resolves when the earliest timer is due. Cancel-safe.
    pub async fn next_timer(&self) -> TimerKind {
        wait_deadline(self.next_deadline()).await
    }

    pub fn on_timer(&mut self, kind: TimerKind, state: &AppState) -> Vec<Effect> {
        match kind {
            TimerKind::AudioFallback => {
                if !self.audio_fallback.is_active() {
                    return Vec::new();
                }
                self.audio_fallback.fire();
                vec![Effect::PlayJingle]
            }
            TimerKind::Pulse => {
                if !self.pulse.is_active() {
                    return Vec::new();
                }
                self.pulse.fire();
                vec![Effect::PulseOverlay]
            }
            TimerKind::Flash => {
                if !self.flash.is_active() {
                    return Vec::new();
                }
                self.flash.fire();
                let Phase::ConfirmedFlashing { win, cursor, .. } = &mut self.phase else {
                    return Vec::new();
                };
                // keep the loop alive but draw nothing until the winning card is focused
                let focused = state.view == View::Focus && state.focus_idx == Some(win.card_idx);
                if !focused || win.cells.is_empty() {
                    return Vec::new();
                }
                let cell = win.cells[*cursor % win.cells.len()];
                *cursor = (*cursor + 1) % win.cells.len();
                vec![Effect::FlashCell { card_idx: win.card_idx, cell }]
            }
        }
    }
}
