//! Committee-name dictionary, served at `/api/committees-master` plus a
//! public autocomplete endpoint. Entries also appear implicitly when an
//! evaluation references a new committee name (see `evaluations`).
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use bson::doc;
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    auth::AdminUser,
    database::COMMITTEES,
    error::AppError,
    models::NamedEntry,
    state::AppState,
    utils::to_api_json,
};

use super::catalog::Catalog;

const CATALOG: Catalog = Catalog {
    collection: COMMITTEES,
    model: "Committee",
    label: "Committee",
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/committees-master", get(list).post(create))
        .route("/api/committees-master/{id}", put(update).delete(remove))
        .route("/api/committee-names", get(autocomplete))
}

#[derive(Deserialize)]
struct CommitteeName {
    name: String,
}

async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    Ok(Json(CATALOG.list(&state.db).await?))
}

async fn create(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CommitteeName>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let committee = CATALOG.create(&state.db, &admin, payload.name).await?;

    Ok((StatusCode::CREATED, Json(committee)))
}

async fn update(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<CommitteeName>,
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

    Ok(Json(json!({ "message": "Committee deleted" })))
}

#[derive(Deserialize)]
struct Autocomplete {
    q: Option<String>,
}

fn name_filter(query: Option<&str>) -> bson::Document {
    match query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => doc! { "name": { "$regex": regex::escape(q), "$options": "i" } },
        None => doc! {},
    }
}

async fn autocomplete(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Autocomplete>,
) -> Result<Json<Value>, AppError> {
    let items: Vec<NamedEntry> = state
        .db
        .collection(COMMITTEES)
        .find(name_filter(params.q.as_deref()))
        .projection(doc! { "name": 1 })
        .sort(doc! { "name": 1 })
        .limit(50)
        .await?
        .try_collect()
        .await?;

    Ok(Json(to_api_json(&items)?))
}

#[cfg(test)]
mod tests {
    use super::name_filter;

    #[test]
    fn test_empty_query_matches_all() {
        assert!(name_filter(None).is_empty());
        assert!(name_filter(Some("   ")).is_empty());
    }

    #[test]
    fn test_query_is_escaped() {
        let filter = name_filter(Some("quality (QA)"));
        let name = filter.get_document("name").unwrap();

        assert_eq!(name.get_str("$regex"), Ok(r"quality \(QA\)"));
        assert_eq!(name.get_str("$options"), Ok("i"));
    }
}
