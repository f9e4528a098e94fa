//! JSON backups of the video subsystem.
//!
//! A backup is a raw snapshot of the videos, links, passwords and departments
//! collections stored as one document. Restore is whole-collection
//! replacement: `delete_many({})` then `insert_many` of the stored array.
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bson::{doc, DateTime, Document};
use futures::TryStreamExt;
use mongodb::Database;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    database::{BACKUPS, DEPARTMENTS, LINKS, PASSWORDS, VIDEOS},
    error::AppError,
    models::Backup,
    state::AppState,
    utils::{parse_id, to_api_json},
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/backups", get(list))
        .route("/api/backups/create", post(create))
        .route("/api/backups/import", post(import))
        .route("/api/backups/{id}", axum::routing::delete(remove))
        .route("/api/backups/download/{id}", get(download))
        .route("/api/backups/restore/{id}", post(restore))
}

async fn dump(db: &Database, collection: &str) -> Result<Vec<Document>, AppError> {
    Ok(db
        .collection::<Document>(collection)
        .find(doc! {})
        .await?
        .try_collect()
        .await?)
}

async fn create(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let backup = Backup {
        id: None,
        date: DateTime::now(),
        videos: dump(&state.db, VIDEOS).await?,
        links: dump(&state.db, LINKS).await?,
        passwords: dump(&state.db, PASSWORDS).await?,
        departments: dump(&state.db, DEPARTMENTS).await?,
        colleges: Vec::new(),
    };

    state
        .db
        .collection::<Backup>(BACKUPS)
        .insert_one(&backup)
        .await?;

    Ok(Json(json!({
        "message": "Backup created (videos + links + passwords + departments)"
    })))
}

async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let backups: Vec<Backup> = state
        .db
        .collection(BACKUPS)
        .find(doc! {})
        .sort(doc! { "date": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(Json(to_api_json(&backups)?))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state
        .db
        .collection::<Backup>(BACKUPS)
        .find_one_and_delete(doc! { "_id": parse_id(&id)? })
        .await?
        .ok_or(AppError::NotFound("Backup"))?;

    Ok(Json(json!({ "message": "Backup deleted" })))
}

async fn download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let backup = state
        .db
        .collection::<Backup>(BACKUPS)
        .find_one(doc! { "_id": parse_id(&id)? })
        .await?
        .ok_or(AppError::NotFound("Backup"))?;

    let body = serde_json::to_string_pretty(&to_api_json(&backup)?)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(backup.date)),
        ],
        body,
    )
        .into_response())
}

// The millisecond stamp keeps the filename free of characters some
// filesystems reject (an RFC 3339 stamp carries colons).
fn content_disposition(date: DateTime) -> String {
    format!(
        "attachment; filename=\"backup-{}.json\"",
        date.timestamp_millis()
    )
}

async fn replace_collection(
    db: &Database,
    collection: &str,
    docs: &[Document],
) -> Result<(), AppError> {
    let handle = db.collection::<Document>(collection);

    handle.delete_many(doc! {}).await?;
    if !docs.is_empty() {
        handle.insert_many(docs).await?;
    }

    Ok(())
}

async fn restore(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let backup = state
        .db
        .collection::<Backup>(BACKUPS)
        .find_one(doc! { "_id": parse_id(&id)? })
        .await?
        .ok_or(AppError::NotFound("Backup"))?;

    replace_collection(&state.db, VIDEOS, &backup.videos).await?;
    replace_collection(&state.db, LINKS, &backup.links).await?;
    replace_collection(&state.db, PASSWORDS, &backup.passwords).await?;
    replace_collection(&state.db, DEPARTMENTS, &backup.departments).await?;

    Ok(Json(json!({
        "message": "Restore complete (videos + links + passwords + departments)"
    })))
}

#[derive(Deserialize)]
struct BackupImport {
    #[serde(default)]
    videos: Vec<Document>,
    #[serde(default)]
    links: Vec<Document>,
    #[serde(default)]
    passwords: Vec<Document>,
    #[serde(default)]
    departments: Vec<Document>,
    #[serde(default)]
    colleges: Vec<Document>,
}

/// JSON-body replacement for the old multipart backup upload.
async fn import(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BackupImport>,
) -> Result<Json<Value>, AppError> {
    let backup = Backup {
        id: None,
        date: DateTime::now(),
        videos: payload.videos,
        links: payload.links,
        passwords: payload.passwords,
        departments: payload.departments,
        colleges: payload.colleges,
    };

    state
        .db
        .collection::<Backup>(BACKUPS)
        .insert_one(&backup)
        .await?;

    Ok(Json(json!({ "message": "Backup imported" })))
}

#[cfg(test)]
mod tests {
    use bson::DateTime;

    use super::content_disposition;

    #[test]
    fn test_attachment_filename_quoted_and_colon_free() {
        let header = content_disposition(DateTime::from_millis(1_700_000_000_000));

        assert_eq!(
            header,
            "attachment; filename=\"backup-1700000000000.json\""
        );
        assert!(!header.contains(':'));
    }
}
