use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, post};
use axum::Json;
use axum::Router;

use crate::api::rest::auth::Caller;
use crate::engine::input::CreatePickupInput;
use crate::error::AppError;
use crate::models::pickup::PickupLocation;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/pickup-locations",
            post(create_pickup_location).get(list_pickup_locations),
        )
        .route("/pickup-locations/:id", delete(delete_pickup_location))
}

async fn list_pickup_locations(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
) -> Result<Json<Vec<PickupLocation>>, AppError> {
    let locations = state.engine.list_pickup_locations(&principal).await?;
    Ok(Json(locations))
}

async fn create_pickup_location(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Json(payload): Json<CreatePickupInput>,
) -> Result<(StatusCode, Json<PickupLocation>), AppError> {
    let location = state
        .engine
        .create_pickup_location(&principal, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(location)))
}

async fn delete_pickup_location(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.engine.delete_pickup_location(&principal, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
