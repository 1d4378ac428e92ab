// tests/winner_flow.rs
// Drives the sync layer and the winner presentation with server-shaped push frames

use std::time::Duration;

use bingo_assist::clients::push::decode_frame;
use bingo_assist::defs::Cell;
use bingo_assist::detector::detect;
use bingo_assist::presentation::{Effect, Phase, TimerKind, Timings, WinnerAction, WinnerPresentation};
use bingo_assist::state::AppState;
use bingo_assist::sync::StateSync;

const CLASSIC: &str = r#"{"key":"CLASSIC","name":"Classic Bingo","desc":"Any line","kind":"classic","params":{"free_enabled":true},"preview_cells":[]}"#;

fn card_json(b_col: &str, marks: &str, calls: &str) -> String {
    format!(
        r#"{{"cols":{{"B":{b_col},"I":[16,18,20,25,30],"N":[31,33,0,40,45],"G":[46,48,50,52,60],"O":[61,65,70,72,75]}},"marks":{marks},"calls":{calls}}}"#
    )
}

/// FOCUS frames show the first card
fn state_frame(view: &str, cards: &[String], program: &str, game_idx: u32) -> String {
    let focus = if view == "FOCUS" { "0" } else { "null" };
    format!(
        r#"{{"type":"STATE","state":{{"view":"{view}","mode":"PLAY","status":"LISTENING","gain":3.0,"speaker":60,"cards":[{}],"program":{program},"focus_idx":{focus},"session_total_games":2,"session_lineup":["CLASSIC","CLASSIC"],"current_game_idx":{game_idx},"sheet_n":2,"last_heard":"","free_enabled":true}}}}"#,
        cards.join(",")
    )
}

/// Row 2 of the first card is B5, I20, FREE, G50, O70
fn winning_cards() -> Vec<String> {
    vec![
        card_json(
            "[1,3,5,7,9]",
            r#"{"B5":true,"I20":true,"FREE":true,"G50":true,"O70":true}"#,
            r#"["B5","I20","G50","O70"]"#,
        ),
        card_json("[2,4,6,8,10]", r#"{"FREE":true}"#, r#"["B5","I20","G50","O70"]"#),
    ]
}

fn apply(sync: &mut StateSync, presentation: &mut WinnerPresentation, frame: &str) -> Vec<Effect> {
    let message = decode_frame(frame).expect("frame should parse");
    if !sync.apply(message).changed {
        return Vec::new();
    }
    let state = sync.snapshot().expect("snapshot after a change");
    presentation.on_snapshot(state)
}

fn row_two() -> Vec<Cell> {
    (0..5).map(|c| Cell(2, c)).collect()
}

#[test]
fn test_state_frame_detects_row_win() {
    let mut sync = StateSync::new();
    sync.apply(decode_frame(&state_frame("OVERVIEW", &winning_cards(), CLASSIC, 0)).unwrap());
    let win = detect(sync.snapshot().unwrap()).unwrap();
    assert_eq!(win.card_idx, 0);
    assert_eq!(win.cells, row_two());
    assert_eq!(
        serde_json::to_value(&win).unwrap(),
        serde_json::json!({"card_idx": 0, "cells": [[2,0],[2,1],[2,2],[2,3],[2,4]]})
    );
}

#[test]
fn test_custom_disallowed_number_voids_every_card() {
    let custom = r#"{"key":"X1","name":"No thirteen","desc":"","kind":"custom",
        "patterns":[{"cells":[[2,0],[2,1],[2,2],[2,3],[2,4]],"excluded":[]}],
        "disallowed_numbers":[13],"allowed_numbers":[],"allowed_positions":[],"disallowed_positions":[]}"#;
    let cards = vec![card_json(
        "[1,3,5,7,13]",
        r#"{"B5":true,"I20":true,"FREE":true,"G50":true,"O70":true,"B13":true}"#,
        r#"["B5","I20","G50","O70","B13"]"#,
    )];
    let mut sync = StateSync::new();
    sync.apply(decode_frame(&state_frame("OVERVIEW", &cards, custom, 0)).unwrap());
    assert!(detect(sync.snapshot().unwrap()).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_win_confirm_and_next_game() {
    let mut sync = StateSync::new();
    let mut presentation = WinnerPresentation::new(Timings::default());

    // nothing to detect on the setup screen
    let effects = apply(&mut sync, &mut presentation, &state_frame("PROGRAM_PICK", &winning_cards(), CLASSIC, 0));
    assert!(effects.is_empty());

    let effects = apply(&mut sync, &mut presentation, &state_frame("OVERVIEW", &winning_cards(), CLASSIC, 0));
    let epoch = match presentation.phase() {
        Phase::Announced { epoch, .. } => *epoch,
        other => panic!("expected an announcement, got {other:?}"),
    };
    assert!(matches!(effects[0], Effect::ShowOverlay(ref win) if win.cells == row_two()));
    assert_eq!(effects[1], Effect::StartServerAudio { epoch });

    // the server cannot play the winner sound
    assert_eq!(presentation.on_audio_negotiated(epoch, false), vec![Effect::PlayJingle]);

    // a status push does not re-announce
    let effects = apply(&mut sync, &mut presentation, r#"{"type":"STATUS","status":"GOOD_BINGO"}"#);
    assert!(effects.is_empty());

    tokio::time::advance(Duration::from_millis(3500)).await;
    let kind = presentation.next_timer().await;
    assert_eq!(kind, TimerKind::Pulse);

    let state = sync.snapshot().unwrap().clone();
    let effects = presentation.on_tap(&state);
    assert!(effects.contains(&Effect::StopServerAudio));
    assert!(effects.contains(&Effect::FocusCard(0)));
    assert!(effects.contains(&Effect::ShowActionBar(WinnerAction::NextGame)));

    // the server focuses the card
    let focused = state_frame("FOCUS", &winning_cards(), CLASSIC, 0);
    assert!(apply(&mut sync, &mut presentation, &focused).is_empty());

    tokio::time::advance(Duration::from_millis(180)).await;
    assert_eq!(presentation.next_timer().await, TimerKind::Flash);
    let state = sync.snapshot().unwrap().clone();
    let effects = presentation.on_timer(TimerKind::Flash, &state);
    assert_eq!(effects, vec![Effect::FlashCell { card_idx: 0, cell: Cell(2, 0) }]);

    let effects = presentation.on_action();
    assert_eq!(effects, vec![Effect::RemoveActionBar, Effect::HideOverlay, Effect::AdvanceGame]);
    assert!(presentation.is_idle());
    assert!(!presentation.any_timer_active());

    // winner/stop rebroadcasts the old cards before the next sheet is dealt
    assert!(apply(&mut sync, &mut presentation, &focused).is_empty());
    assert!(presentation.is_idle());

    let fresh = vec![
        card_json("[1,3,5,7,9]", r#"{"FREE":true}"#, "[]"),
        card_json("[2,4,6,8,10]", r#"{"FREE":true}"#, "[]"),
    ];
    let effects = apply(&mut sync, &mut presentation, &state_frame("OVERVIEW", &fresh, CLASSIC, 1));
    assert!(effects.is_empty());
    assert!(!presentation.is_settled());
}

#[test]
fn test_last_game_offers_play_again() {
    let mut sync = StateSync::new();
    let mut presentation = WinnerPresentation::new(Timings::default());
    apply(&mut sync, &mut presentation, &state_frame("FOCUS", &winning_cards(), CLASSIC, 1));

    let state: AppState = sync.snapshot().unwrap().clone();
    let effects = presentation.on_tap(&state);
    assert!(!effects.iter().any(|e| matches!(e, Effect::FocusCard(_))));
    assert!(effects.contains(&Effect::ShowActionBar(WinnerAction::PlayAgain)));
    assert_eq!(
        presentation.on_action(),
        vec![Effect::RemoveActionBar, Effect::HideOverlay, Effect::ClearLineup, Effect::RestartSession]
    );
}
