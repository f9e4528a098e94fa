use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use bson::doc;
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    database::DEPARTMENTS,
    error::AppError,
    models::Department,
    state::AppState,
    utils::{parse_id, to_api_json},
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/departments", get(list).post(create))
        .route("/api/departments/{id}", put(update).delete(remove))
}

async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let departments: Vec<Department> = state
        .db
        .collection(DEPARTMENTS)
        .find(doc! {})
        .sort(doc! { "name": 1 })
        .await?
        .try_collect()
        .await?;

    Ok(Json(to_api_json(&departments)?))
}

#[derive(Deserialize)]
struct DepartmentName {
    name: String,
}

async fn create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DepartmentName>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let mut department = Department {
        id: None,
        name: payload.name,
    };

    let inserted = state
        .db
        .collection::<Department>(DEPARTMENTS)
        .insert_one(&department)
        .await?;
    department.id = inserted.inserted_id.as_object_id();

    Ok((StatusCode::CREATED, Json(to_api_json(&department)?)))
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<DepartmentName>,
) -> Result<Json<Value>, AppError> {
    let updated = state
        .db
        .collection::<Department>(DEPARTMENTS)
        .find_one_and_update(
            doc! { "_id": parse_id(&id)? },
            doc! { "$set": { "name": payload.name } },
        )
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or(AppError::NotFound("Department"))?;

    Ok(Json(to_api_json(&updated)?))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state
        .db
        .collection::<Department>(DEPARTMENTS)
        .find_one_and_delete(doc! { "_id": parse_id(&id)? })
        .await?
        .ok_or(AppError::NotFound("Department"))?;

    Ok(Json(json!({ "message": "Department deleted" })))
}
