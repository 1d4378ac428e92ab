// src/session.rs
// Session context: owns the snapshot, the winner presentation machine, the
// lineup cache, the API handle and the screen, and runs the event loop that
// ties push messages, user commands, request completions and timers together.

use std::future::Future;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::card::Call;
use crate::clients::api_client::BingoApi;
use crate::clients::common::ApiResult;
use crate::defs::{Cell, Number};
use crate::detector::WinningInfo;
use crate::lineup::LineupCache;
use crate::logging::{log_error, log_info, log_warning};
use crate::presentation::{Effect, Phase, TimerKind, Timings, WinnerAction, WinnerPresentation};
use crate::program::{GameDefinition, Parity};
use crate::state::{AppState, View};
use crate::sync::{PushMessage, StateSync};
use crate::timer::wait_deadline;

/// Rendering collaborator. Implementations draw; they never decide.
pub trait Screen {
    fn render(&mut self, state: &AppState, win: Option<&WinningInfo>, lineup: &LineupCache);
    fn show_heard(&mut self, text: &str);
    fn show_message(&mut self, text: &str);
    fn show_overlay(&mut self, win: &WinningInfo);
    fn pulse_overlay(&mut self);
    fn hide_overlay(&mut self);
    fn flash_cell(&mut self, card_idx: usize, cell: Cell);
    fn show_action_bar(&mut self, action: WinnerAction);
    fn remove_action_bar(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorCommand {
    List,
    Show(String),
    Delete(String),
    Save,
    Create { key: String, name: String },
    /// Replace the allowed (or disallowed) number list of a game
    Numbers { key: String, allowed: bool, numbers: Vec<Number> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// Tap the winner overlay, or press the action button once confirmed
    Activate,
    Focus(usize),
    Back,
    NewSheet,
    SheetSize(u32),
    Simulate(Option<Call>),
    Repeat,
    ToggleMode,
    Say(String),
    Gain(f64),
    Speaker(i32),
    /// Read gain and speaker level back from the server
    Levels,
    Start,
    SessionGames(u32),
    Programs,
    Pick(String),
    PremarkBall(u8),
    PremarkParity(Parity),
    Editor(EditorCommand),
    Refresh,
    Quit,
}

/// Results of spawned requests, fed back into the loop
#[derive(Debug)]
pub enum Completion {
    AudioNegotiated { epoch: u64, accepted: bool },
    AdvanceFailed,
    LineupRejected { slot: usize, key: String },
    LineupStored { complete: bool },
    Snapshot(Box<AppState>),
    Notice(String),
}

pub struct Session<S: Screen> {
    api: BingoApi,
    screen: S,
    sync: StateSync,
    presentation: WinnerPresentation,
    lineup: LineupCache,
    completions_tx: UnboundedSender<Completion>,
    completions_rx: UnboundedReceiver<Completion>,
}

impl<S: Screen> Session<S> {
    pub fn new(api: BingoApi, screen: S, timings: Timings) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            api,
            screen,
            sync: StateSync::new(),
            presentation: WinnerPresentation::new(timings),
            lineup: LineupCache::new(),
            completions_tx,
            completions_rx,
        }
    }

    pub fn screen(&self) -> &S {
        &self.screen
    }

    pub fn snapshot(&self) -> Option<&AppState> {
        self.sync.snapshot()
    }

    pub fn presentation(&self) -> &WinnerPresentation {
        &self.presentation
    }

    pub fn lineup(&self) -> &LineupCache {
        &self.lineup
    }

    /// Run until the user quits or either channel closes.
    /// Server messages are handled before request completions, user input and timers.
    pub async fn run(&mut self, mut push_rx: UnboundedReceiver<PushMessage>, mut input_rx: UnboundedReceiver<UserCommand>) {
        loop {
            let timer = self.presentation.next_deadline();
            tokio::select! {
                biased;
                message = push_rx.recv() => match message {
                    Some(message) => self.handle_push(message),
                    None => {
                        log_warning("Push channel closed");
                        break;
                    }
                },
                Some(done) = self.completions_rx.recv() => self.handle_completion(done),
                command = input_rx.recv() => match command {
                    Some(UserCommand::Quit) | None => break,
                    Some(command) => self.handle_command(command),
                },
                kind = wait_deadline(timer) => self.handle_timer(kind),
            }
        }
        self.teardown().await;
    }

    fn redraw(&mut self) {
        if let Some(state) = self.sync.snapshot() {
            self.screen.render(state, self.presentation.winning(), &self.lineup);
        }
    }

    /// Leave nothing playing on the server when the client exits
    async fn teardown(&mut self) {
        if self.presentation.is_idle() {
            return;
        }
        if let Err(e) = self.api.winner_stop_audio().await {
            log_error(&format!("stop winner audio failed: {e}"));
        }
    }

    pub fn handle_push(&mut self, message: PushMessage) {
        let outcome = self.sync.apply(message);
        if let Some(text) = outcome.heard {
            self.screen.show_heard(&text);
        }
        if outcome.changed {
            self.after_snapshot();
        }
    }

    fn after_snapshot(&mut self) {
        let Some(state) = self.sync.snapshot() else {
            return;
        };
        self.lineup.sync_from_state(state);
        let effects = self.presentation.on_snapshot(state);
        self.run_effects(effects);
        self.redraw();
    }

    fn handle_timer(&mut self, kind: TimerKind) {
        let idle = AppState::default();
        let state = self.sync.snapshot().unwrap_or(&idle);
        let effects = self.presentation.on_timer(kind, state);
        if !effects.is_empty() {
            self.run_effects(effects);
            self.redraw();
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::AudioNegotiated { epoch, accepted } => {
                let effects = self.presentation.on_audio_negotiated(epoch, accepted);
                self.run_effects(effects);
            }
            Completion::AdvanceFailed => {
                log_warning("Could not advance the session, restoring the winner display");
                let effects = match self.sync.snapshot() {
                    Some(state) => self.presentation.release_settled(state),
                    None => Vec::new(),
                };
                self.run_effects(effects);
                self.redraw();
            }
            Completion::LineupRejected { slot, key } => {
                self.lineup.revert(slot, &key);
                self.screen.show_message(&format!("Could not add {key} to the lineup"));
                self.redraw();
            }
            Completion::LineupStored { complete } => {
                if complete {
                    let tx = self.completions_tx.clone();
                    self.spawn_request("session start", move |api| async move {
                        if let Some(state) = api.start_session().await? {
                            let _ = tx.send(Completion::Snapshot(Box::new(state)));
                        }
                        ApiResult::Ok(())
                    });
                } else {
                    self.redraw();
                }
            }
            Completion::Snapshot(state) => {
                self.sync.replace(*state);
                self.after_snapshot();
            }
            Completion::Notice(text) => self.screen.show_message(&text),
        }
    }

    /// Fire-and-forget request; failures are logged and never fatal
    fn spawn_request<F, Fut, T>(&self, what: &'static str, request: F)
    where
        F: FnOnce(BingoApi) -> Fut,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let pending = request(self.api.clone());
        tokio::spawn(async move {
            if let Err(e) = pending.await {
                log_error(&format!("{what} failed: {e}"));
            }
        });
    }

    pub fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ShowOverlay(win) => self.screen.show_overlay(&win),
                Effect::PulseOverlay => self.screen.pulse_overlay(),
                Effect::HideOverlay => self.screen.hide_overlay(),
                Effect::StartServerAudio { epoch } => {
                    let tx = self.completions_tx.clone();
                    let api = self.api.clone();
                    tokio::spawn(async move {
                        let accepted = match api.winner_start().await {
                            Ok(accepted) => accepted,
                            Err(e) => {
                                log_warning(&format!("winner audio request failed: {e}"));
                                false
                            }
                        };
                        let _ = tx.send(Completion::AudioNegotiated { epoch, accepted });
                    });
                }
                Effect::StopServerAudio => {
                    self.spawn_request("stop winner audio", |api| async move { api.winner_stop_audio().await });
                }
                Effect::PlayJingle => {
                    self.spawn_request("jingle", |api| async move { api.play_jingle().await });
                }
                Effect::FocusCard(idx) => {
                    self.spawn_request("focus", move |api| async move { api.set_focus(Some(idx)).await });
                }
                Effect::FlashCell { card_idx, cell } => self.screen.flash_cell(card_idx, cell),
                Effect::ShowActionBar(action) => self.screen.show_action_bar(action),
                Effect::RemoveActionBar => self.screen.remove_action_bar(),
                Effect::AdvanceGame => {
                    let tx = self.completions_tx.clone();
                    self.spawn_request("advance game", move |api| async move {
                        match api.advance_game().await {
                            Ok(route) => {
                                log_info(&format!("Advanced to the next game via {route:?}"));
                                Ok(())
                            }
                            Err(e) => {
                                let _ = tx.send(Completion::AdvanceFailed);
                                Err(e)
                            }
                        }
                    });
                }
                Effect::ClearLineup => self.lineup.clear(),
                Effect::RestartSession => {
                    let tx = self.completions_tx.clone();
                    self.spawn_request("restart session", move |api| async move {
                        let result = api.start().await;
                        if result.is_err() {
                            let _ = tx.send(Completion::AdvanceFailed);
                        }
                        result
                    });
                }
            }
        }
    }

    pub fn handle_command(&mut self, command: UserCommand) {
        match command {
            UserCommand::Activate => {
                let Some(state) = self.sync.snapshot() else {
                    return;
                };
                let announced = matches!(self.presentation.phase(), Phase::Announced { .. });
                let effects = if announced {
                    self.presentation.on_tap(state)
                } else if self.presentation.is_idle() {
                    self.screen.show_message("No winner to confirm");
                    Vec::new()
                } else {
                    self.presentation.on_action()
                };
                self.run_effects(effects);
                self.redraw();
            }
            UserCommand::Focus(idx) => {
                let cards = self.sync.snapshot().map(|s| s.cards.len()).unwrap_or(0);
                if idx >= cards {
                    self.screen.show_message(&format!("There is no card {}", idx + 1));
                    return;
                }
                self.spawn_request("focus", move |api| async move { api.set_focus(Some(idx)).await });
            }
            UserCommand::Back => {
                self.spawn_request("overview", |api| async move { api.set_focus(None).await });
            }
            UserCommand::NewSheet => {
                self.spawn_request("new sheet", |api| async move { api.new_sheet().await });
            }
            UserCommand::SheetSize(n) => {
                self.spawn_request("sheet size", move |api| async move { api.set_sheet_n(n).await });
            }
            UserCommand::Simulate(call) => {
                let call = call.unwrap_or_else(Call::random);
                log_info(&format!("Simulating call {call}"));
                self.spawn_request("simulated call", move |api| async move { api.sim_call(call).await });
            }
            UserCommand::Repeat => {
                self.spawn_request("repeat", |api| async move { api.repeat().await });
            }
            UserCommand::ToggleMode => {
                let mode = self.sync.snapshot().map(|s| s.mode).unwrap_or_default().toggled();
                self.spawn_request("mode", move |api| async move { api.set_mode(mode).await });
            }
            UserCommand::Say(text) => {
                self.spawn_request("say", move |api| async move { api.say(&text).await });
            }
            UserCommand::Gain(gain) => {
                self.spawn_request("gain", move |api| async move { api.set_gain(gain).await });
            }
            UserCommand::Speaker(level) => {
                if !self.sync.snapshot().is_some_and(AppState::speaker_available) {
                    self.screen.show_message("Speaker level is not available on the server");
                }
                self.spawn_request("speaker", move |api| async move { api.set_speaker(level).await });
            }
            UserCommand::Levels => {
                let tx = self.completions_tx.clone();
                self.spawn_request("levels", move |api| async move {
                    let gain = api.get_gain().await?;
                    let speaker = match api.get_speaker().await? {
                        level if level < 0 => "n/a".to_string(),
                        level => level.to_string(),
                    };
                    let _ = tx.send(Completion::Notice(format!("Gain {gain:.1}, speaker {speaker}")));
                    ApiResult::Ok(())
                });
            }
            UserCommand::Start => {
                self.lineup.clear();
                self.spawn_request("start", |api| async move { api.start().await });
            }
            UserCommand::SessionGames(count) => {
                self.lineup.clear();
                self.spawn_request("session games", move |api| async move { api.set_session_games(count).await });
            }
            UserCommand::Programs => {
                let tx = self.completions_tx.clone();
                self.spawn_request("programs", move |api| async move {
                    let response = api.programs().await?;
                    let list = response.programs.iter()
                        .map(|p| format!("{} - {} ({})", p.key, p.name, p.kind.name()))
                        .collect::<Vec<_>>()
                        .join("\n");
                    let _ = tx.send(Completion::Notice(list));
                    ApiResult::Ok(())
                });
            }
            UserCommand::Pick(key) => self.pick_program(key),
            UserCommand::PremarkBall(ball) => {
                self.spawn_request("premark", move |api| async move { api.premark_special_number(ball).await });
            }
            UserCommand::PremarkParity(first) => {
                self.spawn_request("premark", move |api| async move { api.premark_odd_even(first).await });
            }
            UserCommand::Editor(command) => self.editor_command(command),
            UserCommand::Refresh => {
                let tx = self.completions_tx.clone();
                self.spawn_request("refresh", move |api| async move {
                    let state = api.get_state().await?;
                    let _ = tx.send(Completion::Snapshot(Box::new(state)));
                    ApiResult::Ok(())
                });
            }
            UserCommand::Quit => {}
        }
    }

    /// Optimistically append to the lineup and post it; reverted if the server refuses
    fn pick_program(&mut self, key: String) {
        let Some(state) = self.sync.snapshot() else {
            return;
        };
        if state.view != View::ProgramPick {
            self.screen.show_message("Programs can only be picked while setting up the session");
            return;
        }
        let total = state.total_games();
        if self.lineup.is_complete(total) {
            self.screen.show_message("The lineup is already complete");
            return;
        }

        let lineup = self.lineup.push(&key);
        self.redraw();

        let tx = self.completions_tx.clone();
        let api = self.api.clone();
        let slot = lineup.len() - 1;
        let key = lineup[slot].clone();
        tokio::spawn(async move {
            // the server drops unknown keys, so a shorter lineup means this pick was refused
            let completion = match api.set_lineup(&lineup).await {
                Ok(kept) if kept.len() >= lineup.len() => Completion::LineupStored {
                    complete: total > 0 && kept.len() >= total as usize,
                },
                Ok(_) => Completion::LineupRejected { slot, key },
                Err(e) => {
                    log_error(&format!("lineup update failed: {e}"));
                    Completion::LineupRejected { slot, key }
                }
            };
            let _ = tx.send(completion);
        });
    }

    fn editor_command(&mut self, command: EditorCommand) {
        let tx = self.completions_tx.clone();
        match command {
            EditorCommand::List => self.spawn_request("list games", move |api| async move {
                let games = api.list_games().await?;
                let text = games.iter()
                    .map(|g| format!("{}{} - {}", g.key, if g.is_custom { " *" } else { "" }, g.name))
                    .collect::<Vec<_>>()
                    .join("\n");
                let _ = tx.send(Completion::Notice(text));
                ApiResult::Ok(())
            }),
            EditorCommand::Show(key) => self.spawn_request("show game", move |api| async move {
                let game = api.get_game(&key).await?;
                let _ = tx.send(Completion::Notice(describe_game(&game)));
                ApiResult::Ok(())
            }),
            EditorCommand::Delete(key) => self.spawn_request("delete game", move |api| async move {
                api.delete_game(&key).await?;
                let _ = tx.send(Completion::Notice(format!("Deleted {key}")));
                ApiResult::Ok(())
            }),
            EditorCommand::Save => self.spawn_request("save games", move |api| async move {
                api.save_games().await?;
                let _ = tx.send(Completion::Notice("Games saved".to_string()));
                ApiResult::Ok(())
            }),
            EditorCommand::Create { key, name } => self.spawn_request("create game", move |api| async move {
                let game = GameDefinition { key, name, free_enabled: true, ..GameDefinition::default() };
                api.create_game(&game).await?;
                let _ = tx.send(Completion::Notice(describe_game(&game)));
                ApiResult::Ok(())
            }),
            EditorCommand::Numbers { key, allowed, numbers } => self.spawn_request("edit game", move |api| async move {
                let mut game = api.get_game(&key).await?;
                if allowed {
                    game.rules.allowed_numbers = numbers;
                } else {
                    game.rules.disallowed_numbers = numbers;
                }
                api.update_game(&game).await?;
                let _ = tx.send(Completion::Notice(describe_game(&game)));
                ApiResult::Ok(())
            }),
        }
    }
}

/// One-paragraph summary of an editor game
pub fn describe_game(game: &GameDefinition) -> String {
    let list = |numbers: &[Number]| {
        if numbers.is_empty() {
            "any".to_string()
        } else {
            numbers.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(",")
        }
    };
    format!(
        "{} - {}\n  patterns: {}\n  allowed numbers: {}\n  disallowed numbers: {}\n  free space: {}",
        game.key,
        game.name,
        game.rules.patterns.len(),
        list(&game.rules.allowed_numbers),
        if game.rules.disallowed_numbers.is_empty() { "none".to_string() } else { list(&game.rules.disallowed_numbers) },
        if game.free_enabled { "on" } else { "off" },
    )
}
