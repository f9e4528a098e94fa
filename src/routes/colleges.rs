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
    auth::AdminUser, database::COLLEGES, error::AppError, state::AppState,
};

use super::catalog::Catalog;

const CATALOG: Catalog = Catalog {
    collection: COLLEGES,
    model: "College",
    label: "College",
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/colleges", get(list).post(create))
        .route("/api/colleges/{id}", put(update).delete(remove))
}

#[derive(Deserialize)]
struct CollegeName {
    name: String,
}

async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    Ok(Json(CATALOG.list(&state.db).await?))
}

async fn create(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CollegeName>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let college = CATALOG.create(&state.db, &admin, payload.name).await?;

    Ok((StatusCode::CREATED, Json(college)))
}

async fn update(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<CollegeName>,
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

    Ok(Json(json!({ "message": "College deleted" })))
}
