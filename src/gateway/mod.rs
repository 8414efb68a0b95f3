mod decode;

/// HTTP gateway for the relay.
///
/// Owns the single `POST /api/sendMedia` endpoint and drives the request
/// pipeline: origin/method gate, multipart decode into a per-request spool,
/// content validation, sequential relay to the bot API, and spool cleanup on
/// every path out.
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State};
use axum::http::header::{ORIGIN, REFERER};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::{RelayError, RelayResult};
use crate::media::{self, ValidatedMedia};
use crate::spool::RequestSpool;
use crate::telegram::{RelayReceipt, TelegramClient};

use self::decode::MediaSubmission;

/// Room for scalar fields and multipart framing on top of the two media
/// ceilings.
const BODY_OVERHEAD_BYTES: usize = 1_048_576;

/// Max inbound body size. Oversized slots must still reach the validator so
/// they fail with the specific ceiling error, so this caps the sum, not the
/// parts.
const MAX_BODY_BYTES: usize =
    media::PHOTO_MAX_BYTES + media::AUDIO_MAX_BYTES + BODY_OVERHEAD_BYTES;

/// Shared state between the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    telegram: TelegramClient,
    spool_root: PathBuf,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let spool_root = config.spool_root();
        std::fs::create_dir_all(&spool_root)
            .with_context(|| format!("failed to create spool root {}", spool_root.display()))?;
        let telegram = TelegramClient::new(&config.telegram);
        Ok(Self {
            config: Arc::new(config),
            telegram,
            spool_root,
        })
    }
}

/// Build the gateway router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/sendMedia", any(send_media_handler))
        .route("/api/health", get(health_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Bind the configured address and spawn the serving task. Returns the join
/// handle and the bound address (useful when the configured port is 0).
pub async fn start(config: Config) -> Result<(tokio::task::JoinHandle<()>, SocketAddr)> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let state = AppState::new(config)?;
    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    let local_addr = listener.local_addr()?;
    info!("mediarelay gateway listening on {}", local_addr);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("gateway server error: {}", e);
        }
    });
    Ok((handle, local_addr))
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
    }))
}

/// The relay endpoint. Registered with `any()` so that the method gate (and
/// its JSON 405 body) stays inside the pipeline instead of axum's default
/// empty rejection.
async fn send_media_handler(State(state): State<AppState>, req: Request) -> Response {
    let request_id = Uuid::new_v4();

    if req.method() != Method::POST {
        return RelayError::MethodNotAllowed.into_response();
    }
    if let Err(e) = check_origin(req.headers(), &state.config.policy.allowed_origin) {
        warn!("[{}] {}", request_id, e);
        return e.into_response();
    }
    // Credential precondition sits between the gate and the decoder: no
    // parsing happens without a token to relay with.
    if state.config.telegram.token.is_empty() {
        return RelayError::CredentialMissing.into_response();
    }

    let multipart = match Multipart::from_request(req, &()).await {
        Ok(multipart) => multipart,
        Err(rejection) => {
            return RelayError::ParseForm(rejection.body_text()).into_response();
        }
    };

    let spool = match RequestSpool::create(&state.spool_root) {
        Ok(spool) => spool,
        Err(e) => return RelayError::Internal(e).into_response(),
    };

    let outcome = relay_submission(&state, multipart, &spool).await;
    spool.close();

    match outcome {
        Ok(receipts) => {
            for receipt in &receipts {
                info!(
                    "[{}] relayed {} (message_id {:?})",
                    request_id, receipt.slot, receipt.message_id
                );
            }
            (StatusCode::OK, Json(serde_json::json!({"ok": true}))).into_response()
        }
        Err(e) => {
            warn!("[{}] {}", request_id, e);
            e.into_response()
        }
    }
}

/// Decode, validate, relay. The spool outlives this call; the handler closes
/// it after the outcome is decided, and `Drop` covers unwinds.
async fn relay_submission(
    state: &AppState,
    multipart: Multipart,
    spool: &RequestSpool,
) -> RelayResult<Vec<RelayReceipt>> {
    let policy = &state.config.policy;
    let submission = decode::decode_submission(multipart, spool, policy).await?;
    if submission.is_empty() {
        return Err(RelayError::NoMediaProvided);
    }
    let MediaSubmission {
        chat_id,
        photo,
        audio,
    } = submission;

    // Validate every slot before the first byte goes upstream, so a bad
    // second file cannot strand an already-sent first one.
    let mut batch: Vec<ValidatedMedia> = Vec::new();
    for upload in [photo, audio].into_iter().flatten() {
        batch.push(media::validate_upload(upload).await?);
    }

    let mut receipts = Vec::new();
    for item in &batch {
        let receipt = state
            .telegram
            .send_media(&chat_id, &policy.caption, item)
            .await?;
        receipts.push(receipt);
    }
    Ok(receipts)
}

/// Origin gate. Absence of both headers is tolerated (non-browser client); a
/// present `Origin` must equal the allowed origin and a present `Referer`
/// must be prefixed by it. An empty allowed origin rejects every
/// header-bearing request.
fn check_origin(headers: &HeaderMap, allowed_origin: &str) -> RelayResult<()> {
    if let Some(origin) = headers.get(ORIGIN) {
        if origin.to_str().ok() != Some(allowed_origin) {
            return Err(RelayError::InvalidOrigin);
        }
    }
    if let Some(referer) = headers.get(REFERER) {
        let allowed = referer
            .to_str()
            .ok()
            .is_some_and(|r| !allowed_origin.is_empty() && r.starts_with(allowed_origin));
        if !allowed {
            return Err(RelayError::InvalidOrigin);
        }
    }
    Ok(())
}
