// src/clients/common.rs
// Request/response structures and HTTP helpers shared by the client modules

use serde::{Deserialize, Serialize};
use std::error::Error;

use crate::program::{GameDefinition, Parity, Program};
use crate::state::AppState;

/// Result type of every outbound call
pub type ApiResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ============================================================================
// Common Request/Response Structures
// ============================================================================

fn default_true() -> bool {
    true
}

/// `{ok, error}` acknowledgement; a missing `ok` counts as success
#[derive(Debug, Clone, Deserialize)]
pub struct OkResponse {
    #[serde(default = "default_true")]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl OkResponse {
    pub fn into_result(self, what: &str) -> ApiResult<()> {
        if self.ok {
            Ok(())
        } else {
            Err(format!("{what} rejected: {}", self.error.unwrap_or_else(|| "unknown error".to_string())).into())
        }
    }
}

/// Generic API error response structure
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Acknowledgement that may carry a fresh snapshot
#[derive(Debug, Deserialize)]
pub struct StateResponse {
    #[serde(default = "default_true")]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub state: Option<AppState>,
}

/// Serializes as `{}` for endpoints that take no parameters
#[derive(Debug, Serialize)]
pub struct EmptyBody {}

#[derive(Debug, Serialize)]
pub struct CountRequest {
    pub count: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionInfo {
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default)]
    pub lineup: Vec<String>,
    #[serde(default)]
    pub index: u32,
}

/// `GET /api/programs`
#[derive(Debug, Clone, Deserialize)]
pub struct ProgramsResponse {
    #[serde(default)]
    pub programs: Vec<Program>,
    #[serde(default)]
    pub active: Option<Program>,
    #[serde(default)]
    pub session: SessionInfo,
    #[serde(default = "default_true")]
    pub free_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct LineupRequest<'a> {
    pub lineup: &'a [String],
}

#[derive(Debug, Deserialize)]
pub struct LineupResponse {
    #[serde(default = "default_true")]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub session_lineup: Vec<String>,
    #[serde(default)]
    pub total: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct FocusRequest {
    pub index: i64,
}

#[derive(Debug, Serialize)]
pub struct SheetRequest {
    pub n: u32,
}

#[derive(Debug, Serialize)]
pub struct ModeRequest<'a> {
    pub mode: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SimCallRequest {
    pub letter: String,
    pub number: u8,
}

#[derive(Debug, Serialize)]
pub struct SayRequest<'a> {
    pub text: &'a str,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GainBody {
    pub gain: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SpeakerBody {
    pub speaker: i32,
}

#[derive(Debug, Serialize)]
pub struct PremarkBallRequest {
    pub ball: u8,
}

#[derive(Debug, Serialize)]
pub struct PremarkParityRequest {
    pub first: Parity,
}

#[derive(Debug, Deserialize)]
pub struct GamesListResponse {
    #[serde(default)]
    pub games: Vec<GameDefinition>,
}

#[derive(Debug, Deserialize)]
pub struct GameResponse {
    #[serde(default = "default_true")]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub game: Option<GameDefinition>,
}

// ============================================================================
// HTTP Client Utilities
// ============================================================================

/// Turn a non-2xx response into an error carrying the status and the server's message
async fn check_status(response: reqwest::Response) -> ApiResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorResponse>(&text)
        .map(|e| e.error)
        .unwrap_or(text);
    if detail.is_empty() {
        Err(format!("HTTP request failed with status: {status}").into())
    } else {
        Err(format!("HTTP request failed with status: {status} - {detail}").into())
    }
}

/// HTTP GET returning JSON
pub async fn get_json<T>(client: &reqwest::Client, url: &str) -> ApiResult<T>
where
    T: for<'de> Deserialize<'de>,
{
    let response = check_status(client.get(url).send().await?).await?;
    Ok(response.json().await?)
}

/// HTTP POST with a JSON body, returning JSON
pub async fn post_json<T, U>(client: &reqwest::Client, url: &str, body: &T) -> ApiResult<U>
where
    T: Serialize + ?Sized,
    U: for<'de> Deserialize<'de>,
{
    let response = check_status(client.post(url).json(body).send().await?).await?;
    Ok(response.json().await?)
}

/// HTTP PUT with a JSON body, returning JSON
pub async fn put_json<T, U>(client: &reqwest::Client, url: &str, body: &T) -> ApiResult<U>
where
    T: Serialize + ?Sized,
    U: for<'de> Deserialize<'de>,
{
    let response = check_status(client.put(url).json(body).send().await?).await?;
    Ok(response.json().await?)
}

/// HTTP DELETE returning JSON
pub async fn delete_json<U>(client: &reqwest::Client, url: &str) -> ApiResult<U>
where
    U: for<'de> Deserialize<'de>,
{
    let response = check_status(client.delete(url).send().await?).await?;
    Ok(response.json().await?)
}
