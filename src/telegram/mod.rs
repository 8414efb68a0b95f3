use crate::config::TelegramConfig;
use crate::errors::{RelayError, RelayResult};
use crate::media::{MediaSlot, ValidatedMedia};
use anyhow::Context;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Budget for one upload attempt; sized for the 50 MiB audio ceiling.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Minimal client for the two media-send methods of the Bot API.
///
/// One attempt per call, no retries; the pipeline decides what a failure
/// means for the request.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    token: String,
    api_base: String,
}

/// Wire shape of a Bot API reply.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    ok: bool,
    result: Option<ApiMessage>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message_id: i64,
}

/// One successfully relayed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayReceipt {
    pub slot: MediaSlot,
    pub message_id: Option<i64>,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            token: config.token.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Send one validated file. The outbound part always carries the slot's
    /// canonical filename and the sniffed content type; `caption` is the
    /// configured fixed caption, omitted when empty.
    pub async fn send_media(
        &self,
        chat_id: &str,
        caption: &str,
        media: &ValidatedMedia,
    ) -> RelayResult<RelayReceipt> {
        let slot = media.upload.slot;
        let bytes = tokio::fs::read(&media.upload.path)
            .await
            .with_context(|| format!("failed to read spooled {} for relay", slot))?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(slot.canonical_filename())
            .mime_str(media.content_type)
            .map_err(|e| {
                RelayError::Internal(anyhow::anyhow!("invalid outbound content type: {}", e))
            })?;
        let mut form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .part(slot.field_name(), part);
        if !caption.is_empty() {
            form = form.text("caption", caption.to_string());
        }

        let url = format!("{}/bot{}/{}", self.api_base, self.token, slot.api_method());
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| unreachable_error(slot, e))?;

        // The Bot API reports failures as JSON with ok=false, usually on a
        // non-2xx status, so the body is parsed regardless of the status.
        let status = response.status();
        let body: ApiResponse =
            response
                .json()
                .await
                .map_err(|_| RelayError::UpstreamRejected {
                    slot,
                    description: format!("unparseable response (HTTP {})", status.as_u16()),
                })?;

        if !body.ok {
            return Err(RelayError::UpstreamRejected {
                slot,
                description: body
                    .description
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            });
        }

        let message_id = body.result.map(|m| m.message_id);
        debug!("{} accepted upstream, message_id {:?}", slot, message_id);
        Ok(RelayReceipt { slot, message_id })
    }
}

/// Map a transport error with its URL stripped: the URL embeds the bot token
/// and must never reach a log line or response body.
fn unreachable_error(slot: MediaSlot, err: reqwest::Error) -> RelayError {
    let reason = if err.is_timeout() {
        "timed out".to_string()
    } else {
        err.without_url().to_string()
    };
    RelayError::UpstreamUnreachable { slot, reason }
}

#[cfg(test)]
mod tests;
