use std::sync::Arc;
use std::time::Duration;

use parcel_dispatch::api;
use parcel_dispatch::config::{Config, LogFormat};
use parcel_dispatch::error::AppError;
use parcel_dispatch::geo::{depot_geocoder, Geocoder, NominatimGeocoder};
use parcel_dispatch::notify::{FanoutEmitter, LogEmitter, NotificationEmitter, WebhookEmitter};
use parcel_dispatch::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false);
    match config.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Compact => subscriber.compact().init(),
    }

    let geocoder = build_geocoder(&config)?;
    let notifier = build_notifier(&config)?;

    let app_state = AppState::with_collaborators(
        &config.admin_token,
        geocoder,
        notifier,
        config.timeouts(),
        config.event_buffer_size,
    );
    let app = api::rest::router(Arc::new(app_state));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

fn build_geocoder(config: &Config) -> Result<Arc<dyn Geocoder>, AppError> {
    if config.geocoder_url.trim().is_empty() {
        tracing::info!("network geocoding disabled; resolving depot postal codes only");
        return Ok(Arc::new(depot_geocoder()));
    }

    let geocoder = NominatimGeocoder::new(
        config.geocoder_url.clone(),
        config.geocoder_user_agent.clone(),
        Duration::from_millis(config.geocode_timeout_ms),
    )
    .map_err(|err| AppError::Internal(format!("failed to build geocoder client: {err}")))?;

    Ok(Arc::new(geocoder))
}

fn build_notifier(config: &Config) -> Result<Arc<dyn NotificationEmitter>, AppError> {
    let Some(url) = config.notify_webhook_url.clone() else {
        return Ok(Arc::new(LogEmitter));
    };

    let webhook = WebhookEmitter::new(url, Duration::from_millis(config.notify_timeout_ms))
        .map_err(|err| AppError::Internal(format!("failed to build webhook client: {err}")))?;

    tracing::info!("webhook notifications enabled");
    let emitters: Vec<Arc<dyn NotificationEmitter>> =
        vec![Arc::new(LogEmitter), Arc::new(webhook)];
    Ok(Arc::new(FanoutEmitter::new(emitters)))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
