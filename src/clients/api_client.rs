// src/clients/api_client.rs
// HTTP API client for the bingo assistant server

use std::time::Duration;

use super::common::{
    delete_json, get_json, post_json, put_json, ApiResult, CountRequest, EmptyBody, FocusRequest, GainBody,
    GameResponse, GamesListResponse, LineupRequest, LineupResponse, ModeRequest, OkResponse,
    PremarkBallRequest, PremarkParityRequest, ProgramsResponse, SayRequest, SheetRequest,
    SimCallRequest, SpeakerBody, StateResponse,
};
use crate::card::Call;
use crate::config::ClientConfig;
use crate::defs::{
    FIRSTNUMBER, LASTNUMBER, MAX_GAIN, MAX_SESSION_GAMES, MAX_SHEET_CARDS, MAX_SPEAKER, MIN_GAIN,
    MIN_SESSION_GAMES, MIN_SHEET_CARDS,
};
use crate::logging::log_warning;
use crate::program::{GameDefinition, Parity};
use crate::state::{AppState, Mode};

pub fn clamp_session_games(count: u32) -> u32 {
    count.clamp(MIN_SESSION_GAMES, MAX_SESSION_GAMES)
}

pub fn clamp_sheet_cards(n: u32) -> u32 {
    n.clamp(MIN_SHEET_CARDS, MAX_SHEET_CARDS)
}

pub fn clamp_gain(gain: f64) -> f64 {
    if gain.is_nan() {
        return MIN_GAIN;
    }
    gain.clamp(MIN_GAIN, MAX_GAIN)
}

pub fn clamp_speaker(speaker: i32) -> i32 {
    speaker.clamp(0, MAX_SPEAKER)
}

/// Which endpoint moved the session forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceRoute {
    WinnerStop,
    GameNext,
}

/// Cloneable handle to the server API; clones share the connection pool
#[derive(Debug, Clone)]
pub struct BingoApi {
    client: reqwest::Client,
    base_url: String,
}

const EMPTY: &EmptyBody = &EmptyBody {};

impl BingoApi {
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> ApiResult<Self> {
        Self::new(&config.server_url(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_ok(&self, path: &str, body: &impl serde::Serialize, what: &str) -> ApiResult<()> {
        let response: OkResponse = post_json(&self.client, &self.url(path), body).await?;
        response.into_result(what)
    }

    // ========================================================================
    // Session
    // ========================================================================

    pub async fn get_state(&self) -> ApiResult<AppState> {
        get_json(&self.client, &self.url("/api/state")).await
    }

    pub async fn start(&self) -> ApiResult<()> {
        self.post_ok("/api/start", EMPTY, "start").await
    }

    /// Returns the count actually sent (1-20)
    pub async fn set_session_games(&self, count: u32) -> ApiResult<u32> {
        let count = clamp_session_games(count);
        self.post_ok("/api/set_session_games", &CountRequest { count }, "set_session_games").await?;
        Ok(count)
    }

    pub async fn programs(&self) -> ApiResult<ProgramsResponse> {
        get_json(&self.client, &self.url("/api/programs")).await
    }

    /// Returns the lineup the server kept
    pub async fn set_lineup(&self, lineup: &[String]) -> ApiResult<Vec<String>> {
        let response: LineupResponse =
            post_json(&self.client, &self.url("/api/session/lineup"), &LineupRequest { lineup }).await?;
        if !response.ok {
            return Err(format!("lineup rejected: {}", response.error.unwrap_or_default()).into());
        }
        Ok(response.session_lineup)
    }

    pub async fn start_session(&self) -> ApiResult<Option<AppState>> {
        let response: StateResponse = post_json(&self.client, &self.url("/api/session/start"), EMPTY).await?;
        if !response.ok {
            return Err(format!("session start rejected: {}", response.error.unwrap_or_default()).into());
        }
        Ok(response.state)
    }

    // ========================================================================
    // Winner flow
    // ========================================================================

    /// Ask the server to loop the winner sound. `Ok(false)` means it declined.
    pub async fn winner_start(&self) -> ApiResult<bool> {
        let response: OkResponse = post_json(&self.client, &self.url("/api/winner/start"), EMPTY).await?;
        Ok(response.ok)
    }

    pub async fn winner_stop_audio(&self) -> ApiResult<()> {
        self.post_ok("/api/winner/stop_audio", EMPTY, "stop_audio").await
    }

    pub async fn play_jingle(&self) -> ApiResult<()> {
        self.post_ok("/api/audio/jingle", EMPTY, "jingle").await
    }

    /// Confirm the winner and move to the next game
    pub async fn winner_stop(&self) -> ApiResult<()> {
        let response: StateResponse = post_json(&self.client, &self.url("/api/winner/stop"), EMPTY).await?;
        if !response.ok {
            return Err(format!("winner stop rejected: {}", response.error.unwrap_or_default()).into());
        }
        Ok(())
    }

    pub async fn game_next(&self) -> ApiResult<()> {
        let response: StateResponse = post_json(&self.client, &self.url("/api/game/next"), EMPTY).await?;
        if !response.ok {
            return Err(format!("next game rejected: {}", response.error.unwrap_or_default()).into());
        }
        Ok(())
    }

    /// `winner/stop`, falling back to `game/next`
    pub async fn advance_game(&self) -> ApiResult<AdvanceRoute> {
        match self.winner_stop().await {
            Ok(()) => Ok(AdvanceRoute::WinnerStop),
            Err(e) => {
                log_warning(&format!("winner stop failed ({e}), trying game/next"));
                self.game_next().await?;
                Ok(AdvanceRoute::GameNext)
            }
        }
    }

    // ========================================================================
    // Sheet and calls
    // ========================================================================

    /// Focus a card, or go back to the overview with `None`
    pub async fn set_focus(&self, index: Option<usize>) -> ApiResult<()> {
        let index = index.map(|i| i as i64).unwrap_or(-1);
        self.post_ok("/api/focus", &FocusRequest { index }, "focus").await
    }

    pub async fn new_sheet(&self) -> ApiResult<()> {
        self.post_ok("/api/new_sheet", EMPTY, "new_sheet").await
    }

    pub async fn set_sheet_n(&self, n: u32) -> ApiResult<u32> {
        let n = clamp_sheet_cards(n);
        self.post_ok("/api/set_sheet_n", &SheetRequest { n }, "set_sheet_n").await?;
        Ok(n)
    }

    pub async fn set_mode(&self, mode: Mode) -> ApiResult<()> {
        self.post_ok("/api/mode", &ModeRequest { mode: mode.as_str() }, "mode").await
    }

    pub async fn sim_call(&self, call: Call) -> ApiResult<()> {
        let body = SimCallRequest { letter: call.letter.to_string(), number: call.number };
        self.post_ok("/api/sim_call", &body, "sim_call").await
    }

    pub async fn repeat(&self) -> ApiResult<()> {
        self.post_ok("/api/repeat", EMPTY, "repeat").await
    }

    pub async fn say(&self, text: &str) -> ApiResult<()> {
        self.post_ok("/api/say", &SayRequest { text }, "say").await
    }

    // ========================================================================
    // Audio levels
    // ========================================================================

    pub async fn get_gain(&self) -> ApiResult<f64> {
        let body: GainBody = get_json(&self.client, &self.url("/api/gain")).await?;
        Ok(body.gain)
    }

    pub async fn set_gain(&self, gain: f64) -> ApiResult<f64> {
        let gain = clamp_gain(gain);
        self.post_ok("/api/gain", &GainBody { gain }, "gain").await?;
        Ok(gain)
    }

    /// -1 when the server cannot read the speaker level
    pub async fn get_speaker(&self) -> ApiResult<i32> {
        let body: SpeakerBody = get_json(&self.client, &self.url("/api/volume/speaker")).await?;
        Ok(body.speaker)
    }

    pub async fn set_speaker(&self, speaker: i32) -> ApiResult<i32> {
        let speaker = clamp_speaker(speaker);
        self.post_ok("/api/volume/speaker", &SpeakerBody { speaker }, "speaker").await?;
        Ok(speaker)
    }

    // ========================================================================
    // Program pre-marks
    // ========================================================================

    pub async fn premark_special_number(&self, ball: u8) -> ApiResult<()> {
        if !(FIRSTNUMBER..=LASTNUMBER).contains(&ball) {
            return Err(format!("ball {ball} is out of range").into());
        }
        self.post_ok("/api/program/special-number/premark", &PremarkBallRequest { ball }, "premark").await
    }

    pub async fn premark_odd_even(&self, first: Parity) -> ApiResult<()> {
        self.post_ok("/api/program/odd-even/premark", &PremarkParityRequest { first }, "premark").await
    }

    // ========================================================================
    // Games editor
    // ========================================================================

    pub async fn list_games(&self) -> ApiResult<Vec<GameDefinition>> {
        let response: GamesListResponse = get_json(&self.client, &self.url("/api/games/editor")).await?;
        Ok(response.games)
    }

    pub async fn get_game(&self, key: &str) -> ApiResult<GameDefinition> {
        let response: GameResponse = get_json(&self.client, &self.url(&format!("/api/games/editor/{key}"))).await?;
        match (response.ok, response.game) {
            (true, Some(game)) => Ok(game),
            _ => Err(format!("game {key} not available: {}", response.error.unwrap_or_default()).into()),
        }
    }

    pub async fn create_game(&self, game: &GameDefinition) -> ApiResult<()> {
        self.post_ok("/api/games/editor", &game.to_payload(), "create game").await
    }

    pub async fn update_game(&self, game: &GameDefinition) -> ApiResult<()> {
        let url = self.url(&format!("/api/games/editor/{}", game.key));
        let response: OkResponse = put_json(&self.client, &url, &game.to_payload()).await?;
        response.into_result("update game")
    }

    pub async fn delete_game(&self, key: &str) -> ApiResult<()> {
        let response: OkResponse = delete_json(&self.client, &self.url(&format!("/api/games/editor/{key}"))).await?;
        response.into_result("delete game")
    }

    pub async fn save_games(&self) -> ApiResult<()> {
        self.post_ok("/api/games/editor/save", EMPTY, "save games").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::stub_server::StubServer;

    fn api(server: &StubServer) -> BingoApi {
        BingoApi::new(&server.url, Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_clamps() {
        assert_eq!(clamp_session_games(0), 1);
        assert_eq!(clamp_session_games(25), 20);
        assert_eq!(clamp_sheet_cards(9), 6);
        assert_eq!(clamp_gain(0.1), 0.5);
        assert_eq!(clamp_gain(7.0), 6.0);
        assert_eq!(clamp_gain(f64::NAN), 0.5);
        assert_eq!(clamp_speaker(-1), 0);
        assert_eq!(clamp_speaker(150), 100);
    }

    #[test]
    fn test_base_url() {
        let api = BingoApi::new("http://127.0.0.1:5000/", Duration::from_secs(5)).unwrap();
        assert_eq!(api.base_url(), "http://127.0.0.1:5000");
        assert_eq!(api.url("/api/state"), "http://127.0.0.1:5000/api/state");
    }

    #[tokio::test]
    async fn test_premark_rejects_out_of_range_ball() {
        let api = BingoApi::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let err = api.premark_special_number(0).await.unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[tokio::test]
    async fn test_advance_uses_winner_stop() {
        let server = StubServer::start(vec![("POST /api/winner/stop", 200, r#"{"ok":true,"state":null}"#)]).await;
        assert_eq!(api(&server).advance_game().await.unwrap(), AdvanceRoute::WinnerStop);
        assert_eq!(server.requests(), ["POST /api/winner/stop"]);
    }

    #[tokio::test]
    async fn test_advance_falls_back_to_game_next() {
        let server = StubServer::start(vec![
            ("POST /api/winner/stop", 500, r#"{"error":"no winner pending"}"#),
            ("POST /api/game/next", 200, r#"{"ok":true}"#),
        ])
        .await;
        assert_eq!(api(&server).advance_game().await.unwrap(), AdvanceRoute::GameNext);
        assert_eq!(server.requests(), ["POST /api/winner/stop", "POST /api/game/next"]);
    }

    #[tokio::test]
    async fn test_advance_fails_when_both_routes_fail() {
        let server = StubServer::start(vec![
            ("POST /api/winner/stop", 200, r#"{"ok":false,"error":"not in a game"}"#),
            ("POST /api/game/next", 500, r#"{"error":"session over"}"#),
        ])
        .await;
        let err = api(&server).advance_game().await.unwrap_err();
        assert!(err.to_string().contains("session over"));
    }

    #[tokio::test]
    async fn test_winner_start_answers() {
        let declined = StubServer::start(vec![("POST /api/winner/start", 200, r#"{"ok":false,"error":"no sound"}"#)]).await;
        assert!(!api(&declined).winner_start().await.unwrap());

        let accepted = StubServer::start(vec![("POST /api/winner/start", 200, r#"{"ok":true}"#)]).await;
        assert!(api(&accepted).winner_start().await.unwrap());

        let broken = StubServer::start(vec![("POST /api/winner/start", 500, "")]).await;
        assert!(api(&broken).winner_start().await.is_err());
    }
}
