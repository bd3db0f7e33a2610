use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use uuid::Uuid;

use crate::api::rest::auth::Caller;
use crate::engine::input::{AssignInput, CreatePackageInput, RespondInput, UpdatePackageInput};
use crate::error::AppError;
use crate::models::package::{Package, PackageFilter};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/packages", post(create_package).get(list_packages))
        .route(
            "/packages/:id",
            get(get_package).patch(update_package).delete(delete_package),
        )
        .route("/packages/:id/assign", post(assign_package))
        .route("/packages/:id/respond", post(respond_to_assignment))
}

async fn create_package(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Json(payload): Json<CreatePackageInput>,
) -> Result<(StatusCode, Json<Package>), AppError> {
    let package = state.engine.create_package(&principal, payload).await?;
    Ok((StatusCode::CREATED, Json(package)))
}

async fn list_packages(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Query(filter): Query<PackageFilter>,
) -> Result<Json<Vec<Package>>, AppError> {
    let packages = state.engine.list_packages(&principal, filter).await?;
    Ok(Json(packages))
}

async fn get_package(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Package>, AppError> {
    let package = state.engine.get_package(&principal, id).await?;
    Ok(Json(package))
}

async fn update_package(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePackageInput>,
) -> Result<Json<Package>, AppError> {
    let package = state.engine.update_package(&principal, id, payload).await?;
    Ok(Json(package))
}

async fn delete_package(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.engine.delete_package(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn assign_package(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignInput>,
) -> Result<Json<Package>, AppError> {
    let package = state.engine.assign_package(&principal, id, payload).await?;
    Ok(Json(package))
}

async fn respond_to_assignment(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<RespondInput>,
) -> Result<Json<Package>, AppError> {
    let package = state
        .engine
        .respond_to_assignment(&principal, id, payload)
        .await?;
    Ok(Json(package))
}
