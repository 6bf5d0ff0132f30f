use std::{sync::Arc, time::Duration};

use {
    axum::{
        Json, Router,
        body::Bytes,
        extract::{Path, Query, State},
        http::StatusCode,
        response::IntoResponse,
        routing::{get, post},
    },
    lcbot_config::BotConfig,
    lcbot_platform::{LifecycleAction, LifecycleEvent, Push},
    lcbot_routing::BotManager,
    serde::Deserialize,
    tokio::net::TcpListener,
    tokio_util::sync::CancellationToken,
    tower_http::trace::TraceLayer,
    tracing::{debug, info, warn},
};

use crate::{
    error::ApiError,
    shutdown::{Watchdog, cancel_on_signal},
};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<BotManager>,
}

/// Build the gateway router. Shared by [`serve`] and the integration tests.
pub fn build_app(manager: Arc<BotManager>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/oauth/callback", get(oauth_callback_handler))
        .route("/webhooks/install", post(install_handler))
        .route("/webhooks/{action}", post(push_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { manager })
}

/// Bind `{server.bind}:{server.port}` and serve until Ctrl-C or SIGTERM.
pub async fn start_gateway(config: &BotConfig, manager: Arc<BotManager>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %listener.local_addr()?, "gateway listening");

    let cancel = CancellationToken::new();
    cancel_on_signal(cancel.clone());
    serve(listener, manager, config.bot.shutdown_timeout(), cancel).await
}

/// Serve on `listener` until `cancel` fires.
///
/// On cancellation every installed license is uninstalled before the server
/// stops accepting connections. If that takes longer than `shutdown_timeout`
/// the process exits.
pub async fn serve(
    listener: TcpListener,
    manager: Arc<BotManager>,
    shutdown_timeout: Duration,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let app = build_app(Arc::clone(&manager));
    let watchdog = Watchdog::new();

    let shutdown = {
        let watchdog = watchdog.clone();
        async move {
            cancel.cancelled().await;
            info!(
                licenses = manager.licenses().len(),
                "shutting down, uninstalling licenses"
            );
            watchdog.arm(shutdown_timeout);
            manager.destroy().await;
        }
    };

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;
    watchdog.disarm();
    result?;
    info!("gateway stopped");
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "licenses": state.manager.licenses().len(),
    }))
}

async fn install_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let event: LifecycleEvent = serde_json::from_slice(&body).map_err(ApiError::bad_request)?;
    let license_id = event.license_id;

    match event.event {
        LifecycleAction::ApplicationInstalled => state.manager.install_app(license_id).await?,
        LifecycleAction::ApplicationUninstalled => {
            state.manager.uninstall_app(license_id).await?;
        },
        LifecycleAction::Other => {
            debug!(%license_id, "ignoring lifecycle event");
        },
    }
    Ok(StatusCode::OK)
}

async fn push_handler(
    State(state): State<AppState>,
    Path(action): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let push = Push::from_slice(&body)?;

    if !state.manager.accepts_webhook_secret(push.secret_key.as_deref()) {
        warn!(
            license_id = %push.license_id,
            action = %action,
            has_secret = push.secret_key.is_some(),
            "push rejected: secret mismatch"
        );
        return Err(ApiError::Unauthorized);
    }
    if push.event.action() != action {
        debug!(
            path = %action,
            body = push.event.action(),
            "push action differs from webhook path"
        );
    }

    state.manager.router().dispatch(&push).await?;
    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
}

async fn oauth_callback_handler(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<&'static str, ApiError> {
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing authorization code"))?;
    state.manager.authorize(&code).await?;
    Ok("Authorized. You can close this window.")
}
