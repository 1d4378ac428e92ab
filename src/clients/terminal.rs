// src/clients/terminal.rs
// Terminal screen and line-based command input for the bingo client

use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{Clear, ClearType},
};
use std::io::{self, BufRead, Stdout, Write};
use tokio::sync::mpsc::UnboundedSender;

use crate::card::{Call, Card};
use crate::defs::{Cell, Colors, GRID};
use crate::detector::WinningInfo;
use crate::lineup::LineupCache;
use crate::logging::{log_error, log_error_stderr};
use crate::presentation::WinnerAction;
use crate::program::{parse_number_list, Parity};
use crate::session::{EditorCommand, Screen, UserCommand};
use crate::state::{AppState, Mode, View};

// Box interior: five cells of eight characters plus four separators
const BOX_WIDTH: usize = GRID * 9 - 1;

pub const HELP: &str = "\
Commands:
  <Enter>              confirm the winner / press the action button
  next | sim [B12]     simulate a call (random when omitted)
  repeat               repeat the last call
  mode                 toggle PLAY/DEBUG
  sheet [n]            deal a new sheet, or set the number of cards (1-6)
  focus <n> | back     focus card n / back to the overview
  say <text>           speak a line on the server
  gain <x>             microphone gain (0.5-6.0)
  speaker <n>          speaker volume (0-100)
  levels               show gain and speaker volume
  start                go to session setup
  games <n>            number of games in the session (1-20)
  programs             list the available programs
  pick <KEY>           add a program to the lineup
  premark <ball|odd|even>
  editor [list|show K|create K name|delete K|save|allow K 1-10,15|disallow K 13]
  refresh              fetch the full state
  quit";

// ============================================================================
// Command parsing
// ============================================================================

fn parse_count<T: std::str::FromStr>(arg: Option<&str>, usage: &str) -> Result<T, String> {
    arg.and_then(|a| a.parse().ok()).ok_or_else(|| format!("Usage: {usage}"))
}

/// Parse one input line. An empty line activates the winner overlay or the action button.
pub fn parse_command(line: &str) -> Result<UserCommand, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(UserCommand::Activate);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let arg = if rest.is_empty() { None } else { Some(rest) };

    match word.to_lowercase().as_str() {
        "next" | "sim" => match arg {
            None => Ok(UserCommand::Simulate(None)),
            Some(token) => Call::parse(&token.to_uppercase())
                .map(|call| UserCommand::Simulate(Some(call)))
                .ok_or_else(|| format!("Not a valid call: {token}")),
        },
        "repeat" => Ok(UserCommand::Repeat),
        "mode" => Ok(UserCommand::ToggleMode),
        "sheet" => match arg {
            None => Ok(UserCommand::NewSheet),
            Some(_) => parse_count(arg, "sheet [n]").map(UserCommand::SheetSize),
        },
        "focus" => {
            let n: usize = parse_count(arg, "focus <n>")?;
            if n == 0 {
                return Err("Cards are numbered from 1".to_string());
            }
            Ok(UserCommand::Focus(n - 1))
        }
        "back" => Ok(UserCommand::Back),
        "say" => arg.map(|text| UserCommand::Say(text.to_string())).ok_or_else(|| "Usage: say <text>".to_string()),
        "gain" => parse_count(arg, "gain <x>").map(UserCommand::Gain),
        "speaker" => parse_count(arg, "speaker <n>").map(UserCommand::Speaker),
        "levels" => Ok(UserCommand::Levels),
        "start" => Ok(UserCommand::Start),
        "games" => parse_count(arg, "games <n>").map(UserCommand::SessionGames),
        "programs" => Ok(UserCommand::Programs),
        "pick" => arg.map(|key| UserCommand::Pick(key.to_uppercase())).ok_or_else(|| "Usage: pick <KEY>".to_string()),
        "premark" => match arg.map(str::to_lowercase).as_deref() {
            Some("odd") => Ok(UserCommand::PremarkParity(Parity::Odd)),
            Some("even") => Ok(UserCommand::PremarkParity(Parity::Even)),
            _ => parse_count(arg, "premark <ball|odd|even>").map(UserCommand::PremarkBall),
        },
        "editor" => parse_editor(arg.unwrap_or("list")).map(UserCommand::Editor),
        "refresh" => Ok(UserCommand::Refresh),
        "quit" | "exit" | "q" => Ok(UserCommand::Quit),
        "help" | "?" => Err(HELP.to_string()),
        other => Err(format!("Unknown command '{other}', type help")),
    }
}

fn parse_editor(args: &str) -> Result<EditorCommand, String> {
    let mut parts = args.split_whitespace();
    let sub = parts.next().unwrap_or("list").to_lowercase();
    let key = parts.next().map(str::to_uppercase);
    let need_key = |key: Option<String>| key.ok_or_else(|| format!("Usage: editor {sub} <KEY>"));

    match sub.as_str() {
        "list" => Ok(EditorCommand::List),
        "show" => need_key(key).map(EditorCommand::Show),
        "delete" => need_key(key).map(EditorCommand::Delete),
        "save" => Ok(EditorCommand::Save),
        "create" => {
            let key = need_key(key)?;
            let name = parts.collect::<Vec<_>>().join(" ");
            let name = if name.is_empty() { key.clone() } else { name };
            Ok(EditorCommand::Create { key, name })
        }
        "allow" | "disallow" => {
            let key = need_key(key)?;
            let numbers = parse_number_list(&parts.collect::<Vec<_>>().join(","));
            Ok(EditorCommand::Numbers { key, allowed: sub == "allow", numbers })
        }
        _ => Err(format!("Unknown editor command '{sub}'")),
    }
}

/// Read stdin line by line on a dedicated thread and forward parsed commands.
/// Parse errors are printed, not sent. End of input quits.
pub fn spawn_input_reader(tx: UnboundedSender<UserCommand>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => match parse_command(&line) {
                    Ok(command) => {
                        if tx.send(command).is_err() {
                            return;
                        }
                    }
                    Err(message) => println!("{message}"),
                },
                Err(e) => {
                    log_error(&format!("Failed to read input: {e}"));
                    break;
                }
            }
        }
        let _ = tx.send(UserCommand::Quit);
    })
}

// ============================================================================
// Rendering
// ============================================================================

/// Draw one card as a box table. Marked cells are green, winning cells
/// yellow and the currently flashed cell inverted.
pub fn card_table(index: usize, card: &Card, win: Option<&WinningInfo>, flashed: Option<Cell>) -> String {
    let winning_cells: &[Cell] = match win {
        Some(win) if win.card_idx == index => &win.cells,
        _ => &[],
    };
    let title = if winning_cells.is_empty() {
        format!("Card {}", index + 1)
    } else {
        format!("Card {} - BINGO", index + 1)
    };
    let separator = |left: &str, mid: &str, right: &str| {
        format!("{left}{}{right}\n", vec!["────────"; GRID].join(mid))
    };

    let mut out = String::new();
    out.push_str(&format!("┌{}┐\n", "─".repeat(BOX_WIDTH)));
    out.push_str(&format!("│ {title:<width$} │\n", width = BOX_WIDTH - 2));
    out.push_str(&separator("├", "┬", "┤"));
    out.push('│');
    for letter in crate::defs::Letter::ALL {
        out.push_str(&format!("   {letter}    │"));
    }
    out.push('\n');
    out.push_str(&separator("├", "┼", "┤"));

    for row in 0..GRID {
        out.push('│');
        for col in 0..GRID {
            let cell = Cell(row as u8, col as u8);
            let text = match card.number_at(cell) {
                Some(number) => format!("   {number:2}   "),
                None => "  FREE  ".to_string(),
            };
            let color = if flashed == Some(cell) {
                Some(Colors::flash())
            } else if winning_cells.contains(&cell) {
                Some(Colors::yellow())
            } else if card.is_marked(cell) {
                Some(Colors::green())
            } else {
                None
            };
            match color {
                Some(color) => out.push_str(&format!("{color}{text}{}│", Colors::reset())),
                None => out.push_str(&format!("{text}│")),
            }
        }
        out.push('\n');
    }
    out.push_str(&separator("└", "┴", "┘"));
    out
}

fn status_line(state: &AppState) -> String {
    let program = state.program.as_ref().map(|p| p.name.as_str()).unwrap_or("-");
    let game = match state.session_total_games {
        Some(total) if total > 0 => format!("Game {}/{}", state.current_game_idx + 1, total),
        _ => "Game -".to_string(),
    };
    let speaker = if state.speaker_available() { state.speaker.to_string() } else { "n/a".to_string() };
    let last_call = state.cards.first().and_then(|card| card.calls().last()).map(String::as_str).unwrap_or("-");
    let mut line = format!(
        "{game} | {program} | {} | gain {:.1} | speaker {speaker} | last call {last_call}",
        state.mode.as_str(),
        state.gain,
    );
    if let Some(parser) = &state.parse_mode {
        line.push_str(&format!(" | parser {parser}"));
    }
    line
}

/// Everything the terminal shows besides the snapshot itself
#[derive(Debug, Clone, Default)]
struct Overlays {
    heard: Option<String>,
    message: Option<String>,
    overlay: Option<WinningInfo>,
    pulse_on: bool,
    flashed: Option<(usize, Cell)>,
    action: Option<WinnerAction>,
}

pub struct TerminalScreen<W: Write = Stdout> {
    out: W,
    state: Option<AppState>,
    win: Option<WinningInfo>,
    lineup_prompt: String,
    lineup: Vec<String>,
    overlays: Overlays,
}

impl TerminalScreen<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalScreen<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            state: None,
            win: None,
            lineup_prompt: String::new(),
            lineup: Vec::new(),
            overlays: Overlays::default(),
        }
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Text of the whole frame for the current state
    pub fn compose(&self) -> String {
        let mut frame = String::new();
        let Some(state) = &self.state else {
            frame.push_str("Waiting for the server...\n");
            self.compose_footer(&mut frame);
            return frame;
        };

        frame.push_str(&format!("{}{}{}\n", Colors::bold(), status_line(state), Colors::reset()));
        if state.mode == Mode::Debug {
            frame.push_str(&format!("{}DEBUG mode: heard speech and calls are not shown{}\n", Colors::red(), Colors::reset()));
        }
        if !state.status.is_empty() {
            frame.push_str(&format!("{}\n", state.status));
        }

        match state.view {
            View::Welcome => frame.push_str("\nWelcome to Bingo. Type 'start' to set up a session.\n"),
            View::SetupGames => frame.push_str("\nHow many games in this session? (games <n>)\n"),
            View::ProgramPick => {
                frame.push_str(&format!("\n{}  (pick <KEY>, programs to list)\n", self.lineup_prompt));
                for (i, key) in self.lineup.iter().enumerate() {
                    frame.push_str(&format!("  Game {}: {key}\n", i + 1));
                }
            }
            View::Overview => {
                for (i, card) in state.cards.iter().enumerate() {
                    frame.push_str(&self.card(i, card));
                }
            }
            View::Focus => {
                let idx = state.focus_idx.unwrap_or(0);
                if let Some(card) = state.cards.get(idx) {
                    frame.push_str(&self.card(idx, card));
                }
            }
        }
        self.compose_footer(&mut frame);
        frame
    }

    fn card(&self, index: usize, card: &Card) -> String {
        let flashed = self.overlays.flashed.and_then(|(i, cell)| (i == index).then_some(cell));
        card_table(index, card, self.win.as_ref(), flashed)
    }

    fn compose_footer(&self, frame: &mut String) {
        if let Some(win) = &self.overlays.overlay {
            let color = if self.overlays.pulse_on { Colors::yellow() } else { Colors::dim() };
            frame.push_str(&format!(
                "\n{color}★★★  BINGO! Card {}  ★★★{}  (press Enter)\n",
                win.card_idx + 1,
                Colors::reset()
            ));
        }
        if let Some(action) = self.overlays.action {
            frame.push_str(&format!("\n{}[Enter] {}{}\n", Colors::cyan(), action.label(), Colors::reset()));
        }
        if let Some(heard) = &self.overlays.heard {
            frame.push_str(&format!("{}Heard: {heard}{}\n", Colors::dim(), Colors::reset()));
        }
        if let Some(message) = &self.overlays.message {
            frame.push_str(&format!("{message}\n"));
        }
        frame.push_str("> ");
    }

    fn draw(&mut self) {
        let frame = self.compose();
        let result = execute!(self.out, Clear(ClearType::All), MoveTo(0, 0))
            .and_then(|_| self.out.write_all(frame.as_bytes()))
            .and_then(|_| self.out.flush());
        if let Err(e) = result {
            log_error_stderr(&format!("Failed to draw the screen: {e}"));
        }
    }
}

impl<W: Write> Screen for TerminalScreen<W> {
    fn render(&mut self, state: &AppState, win: Option<&WinningInfo>, lineup: &LineupCache) {
        self.state = Some(state.clone());
        self.win = win.cloned();
        self.lineup_prompt = lineup.prompt();
        self.lineup = lineup.keys().to_vec();
        self.draw();
    }

    fn show_heard(&mut self, text: &str) {
        self.overlays.heard = Some(text.to_string());
        self.draw();
    }

    fn show_message(&mut self, text: &str) {
        self.overlays.message = Some(text.to_string());
        self.draw();
    }

    fn show_overlay(&mut self, win: &WinningInfo) {
        self.overlays.overlay = Some(win.clone());
        self.overlays.pulse_on = true;
    }

    fn pulse_overlay(&mut self) {
        self.overlays.pulse_on = !self.overlays.pulse_on;
    }

    fn hide_overlay(&mut self) {
        self.overlays.overlay = None;
    }

    fn flash_cell(&mut self, card_idx: usize, cell: Cell) {
        self.overlays.flashed = Some((card_idx, cell));
    }

    fn show_action_bar(&mut self, action: WinnerAction) {
        self.overlays.action = Some(action);
    }

    fn remove_action_bar(&mut self) {
        self.overlays.action = None;
        self.overlays.flashed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::tests::{mark_cells, sample_card};

    fn row_two() -> Vec<Cell> {
        (0..5).map(|c| Cell(2, c)).collect()
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command(""), Ok(UserCommand::Activate));
        assert_eq!(parse_command("  "), Ok(UserCommand::Activate));
        assert_eq!(parse_command("next"), Ok(UserCommand::Simulate(None)));
        assert!(matches!(parse_command("sim b12"), Ok(UserCommand::Simulate(Some(call))) if call.number == 12));
        assert!(parse_command("sim X99").is_err());
        assert_eq!(parse_command("focus 2"), Ok(UserCommand::Focus(1)));
        assert!(parse_command("focus 0").is_err());
        assert_eq!(parse_command("sheet"), Ok(UserCommand::NewSheet));
        assert_eq!(parse_command("sheet 4"), Ok(UserCommand::SheetSize(4)));
        assert_eq!(parse_command("games 3"), Ok(UserCommand::SessionGames(3)));
        assert_eq!(parse_command("pick lucky_7"), Ok(UserCommand::Pick("LUCKY_7".to_string())));
        assert_eq!(parse_command("say hello there"), Ok(UserCommand::Say("hello there".to_string())));
        assert_eq!(parse_command("gain 2.5"), Ok(UserCommand::Gain(2.5)));
        assert_eq!(parse_command("premark odd"), Ok(UserCommand::PremarkParity(Parity::Odd)));
        assert_eq!(parse_command("premark 7"), Ok(UserCommand::PremarkBall(7)));
        assert_eq!(parse_command("QUIT"), Ok(UserCommand::Quit));
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn test_parse_editor() {
        assert_eq!(parse_command("editor"), Ok(UserCommand::Editor(EditorCommand::List)));
        assert_eq!(parse_command("editor show x1"), Ok(UserCommand::Editor(EditorCommand::Show("X1".to_string()))));
        assert_eq!(
            parse_command("editor allow X1 1-3 15"),
            Ok(UserCommand::Editor(EditorCommand::Numbers {
                key: "X1".to_string(),
                allowed: true,
                numbers: vec![1, 2, 3, 15],
            }))
        );
        assert!(parse_command("editor delete").is_err());
        assert_eq!(
            parse_command("editor create x2 Corners only"),
            Ok(UserCommand::Editor(EditorCommand::Create { key: "X2".to_string(), name: "Corners only".to_string() }))
        );
        assert_eq!(parse_command("levels"), Ok(UserCommand::Levels));
    }

    #[test]
    fn test_card_table_layout() {
        let card = sample_card();
        let table = card_table(0, &card, None, None);
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[1].starts_with("│ Card 1"));
        assert!(table.contains("  FREE  "));
        // every plain line has the same display width
        let widths: Vec<usize> = lines.iter().map(|l| l.chars().count()).collect();
        assert!(widths.iter().all(|w| *w == widths[0]));
    }

    #[test]
    fn test_card_table_highlights() {
        let mut card = sample_card();
        mark_cells(&mut card, &row_two());
        let win = WinningInfo { card_idx: 0, cells: row_two() };
        let table = card_table(0, &card, Some(&win), Some(Cell(2, 0)));
        assert!(table.contains("Card 1 - BINGO"));
        assert!(table.contains(Colors::flash()));
        assert!(table.contains(&format!("{}   18   ", Colors::yellow())));

        // the win belongs to another card
        let plain = card_table(1, &card, Some(&win), None);
        assert!(!plain.contains("BINGO"));
    }

    #[test]
    fn test_screen_frame() {
        let mut screen = TerminalScreen::new(Vec::new());
        assert!(screen.compose().contains("Waiting"));

        let state = AppState {
            view: View::Overview,
            speaker: -1,
            session_total_games: Some(3),
            cards: vec![sample_card(), sample_card()],
            ..AppState::default()
        };
        screen.render(&state, None, &LineupCache::new());
        let frame = screen.compose();
        assert!(frame.contains("Game 1/3"));
        assert!(frame.contains("speaker n/a"));
        assert!(frame.contains("Card 2"));
        assert!(!frame.contains("parser"));
        assert!(!screen.output().is_empty());

        let win = WinningInfo { card_idx: 1, cells: row_two() };
        screen.show_overlay(&win);
        assert!(screen.compose().contains("BINGO! Card 2"));
        screen.hide_overlay();
        screen.show_action_bar(WinnerAction::PlayAgain);
        assert!(screen.compose().contains("[Enter] Play Again"));
        screen.remove_action_bar();
        assert!(!screen.compose().contains("[Enter]"));
    }

    #[test]
    fn test_status_line_shows_parser_mode() {
        let state = AppState { parse_mode: Some("SETUP".to_string()), ..AppState::default() };
        assert!(status_line(&state).ends_with(" | parser SETUP"));
    }

    #[test]
    fn test_program_pick_frame() {
        let mut screen = TerminalScreen::new(Vec::new());
        let state = AppState { view: View::ProgramPick, session_total_games: Some(2), ..AppState::default() };
        let mut lineup = LineupCache::new();
        lineup.push("CLASSIC");
        screen.render(&state, None, &lineup);
        let frame = screen.compose();
        assert!(frame.contains("What type is Game 2?"));
        assert!(frame.contains("Game 1: CLASSIC"));
    }
}
