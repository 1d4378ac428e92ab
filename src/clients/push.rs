// src/clients/push.rs
// WebSocket push channel: reads server messages and forwards them to the session loop

use futures_util::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::common::ApiResult;
use crate::logging::{log_error, log_info, log_warning};
use crate::sync::PushMessage;

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Why a connection ended
#[derive(Debug, PartialEq, Eq)]
enum Disconnect {
    /// Server closed or the stream failed; worth reconnecting
    Lost,
    /// Nobody is listening for messages anymore
    ReceiverGone,
}

/// Parse one text frame. Malformed frames are logged and dropped.
pub fn decode_frame(text: &str) -> Option<PushMessage> {
    match PushMessage::parse(text) {
        Ok(message) => Some(message),
        Err(e) => {
            log_warning(&format!("Dropping unparseable push message: {e}"));
            None
        }
    }
}

async fn run_connection(ws_url: &str, tx: &UnboundedSender<PushMessage>) -> ApiResult<Disconnect> {
    let (ws_stream, _) = connect_async(ws_url).await?;
    log_info(&format!("Connected to push channel {ws_url}"));

    let (_write, mut read) = ws_stream.split();
    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if let Some(message) = decode_frame(text.as_str()) {
                    if tx.send(message).is_err() {
                        return Ok(Disconnect::ReceiverGone);
                    }
                }
            }
            Ok(Message::Close(_)) => {
                log_info("Server closed the push channel");
                return Ok(Disconnect::Lost);
            }
            Err(e) => {
                log_error(&format!("Push channel error: {e}"));
                return Ok(Disconnect::Lost);
            }
            _ => {}
        }
    }
    Ok(Disconnect::Lost)
}

/// Keep the push channel open, reconnecting up to `retry_attempts` times in a row.
/// A successful connection resets the attempt count; the server resends STATE on connect.
pub async fn run_push_channel(ws_url: String, retry_attempts: u32, tx: UnboundedSender<PushMessage>) -> ApiResult<()> {
    let mut failures = 0;
    loop {
        match run_connection(&ws_url, &tx).await {
            Ok(Disconnect::ReceiverGone) => return Ok(()),
            Ok(Disconnect::Lost) => failures = 0,
            Err(e) => {
                failures += 1;
                log_warning(&format!("Push channel connect failed ({failures}/{}): {e}", retry_attempts + 1));
                if failures > retry_attempts {
                    return Err(format!("could not connect to {ws_url}: {e}").into());
                }
            }
        }
        if tx.is_closed() {
            return Ok(());
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}
