use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Json;
use axum::Router;
use serde::Serialize;
use uuid::Uuid;

use crate::api::rest::auth::Caller;
use crate::engine::input::{CreateVehicleInput, LocationInput};
use crate::error::AppError;
use crate::models::vehicle::{GeoPoint, Vehicle, VehicleUpdate};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/vehicles", post(create_vehicle).get(list_vehicles))
        .route("/vehicles/locations", get(vehicle_locations))
        .route("/vehicles/me/location", put(report_own_location))
        .route(
            "/vehicles/:id",
            get(get_vehicle).patch(update_vehicle).delete(delete_vehicle),
        )
        .route(
            "/vehicles/:id/location",
            get(vehicle_location).put(report_location),
        )
}

#[derive(Serialize)]
struct RegisteredVehicle {
    vehicle: Vehicle,
    access_token: String,
}

#[derive(Serialize)]
struct RemovedVehicle {
    released_packages: usize,
}

async fn create_vehicle(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Json(payload): Json<CreateVehicleInput>,
) -> Result<(StatusCode, Json<RegisteredVehicle>), AppError> {
    let vehicle = state.engine.create_vehicle(&principal, payload).await?;
    let access_token = state.identity.issue_vehicle_token(vehicle.id);

    Ok((
        StatusCode::CREATED,
        Json(RegisteredVehicle {
            vehicle,
            access_token,
        }),
    ))
}

async fn list_vehicles(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
) -> Result<Json<Vec<Vehicle>>, AppError> {
    let vehicles = state.engine.list_vehicles(&principal).await?;
    Ok(Json(vehicles))
}

async fn get_vehicle(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Vehicle>, AppError> {
    let vehicle = state.engine.get_vehicle(&principal, id).await?;
    Ok(Json(vehicle))
}

async fn update_vehicle(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<VehicleUpdate>,
) -> Result<Json<Vehicle>, AppError> {
    let vehicle = state.engine.update_vehicle(&principal, id, payload).await?;
    Ok(Json(vehicle))
}

async fn delete_vehicle(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<RemovedVehicle>, AppError> {
    let released_packages = state.engine.delete_vehicle(&principal, id).await?;
    state.identity.revoke_vehicle(id);
    Ok(Json(RemovedVehicle { released_packages }))
}

async fn vehicle_locations(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
) -> Result<Json<HashMap<Uuid, Option<GeoPoint>>>, AppError> {
    let locations = state.engine.vehicle_locations(&principal).await?;
    Ok(Json(locations))
}

async fn vehicle_location(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Option<GeoPoint>>, AppError> {
    let location = state.engine.vehicle_location(&principal, id).await?;
    Ok(Json(location))
}

async fn report_location(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<LocationInput>,
) -> Result<StatusCode, AppError> {
    state
        .engine
        .report_vehicle_location(&principal, id, payload)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn report_own_location(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Json(payload): Json<LocationInput>,
) -> Result<StatusCode, AppError> {
    let vehicle_id = principal.vehicle_id().ok_or_else(|| {
        AppError::Forbidden("only vehicles can report their own location".to_string())
    })?;

    state
        .engine
        .report_vehicle_location(&principal, vehicle_id, payload)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
