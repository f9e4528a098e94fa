use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    auth::AdminUser, database::AUDITORS, error::AppError, state::AppState,
};

use super::catalog::Catalog;

const CATALOG: Catalog = Catalog {
    collection: AUDITORS,
    model: "Auditor",
    label: "Auditor",
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auditors", get(list).post(create))
        .route("/api/auditors/{id}", put(update).delete(remove))
}

#[derive(Deserialize)]
struct AuditorName {
    name: String,
}

async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    Ok(Json(CATALOG.list(&state.db).await?))
}

async fn create(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<AuditorName>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let auditor = CATALOG.create(&state.db, &admin, payload.name).await?;

    Ok((StatusCode::CREATED, Json(auditor)))
}

async fn update(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<AuditorName>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(
        CATALOG.update(&state.db, &admin, &id, payload.name).await?,
    ))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    CATALOG.delete(&state.db, &admin, &id).await?;

    Ok(Json(json!({ "message": "Auditor deleted" })))
}
