//! Section passwords for the video dashboard.
//!
//! A section is a named area of the UI ("dashboard", "links", ...) unlocked by
//! a shared password. Matching sets a boolean session flag; the passwords
//! themselves are stored and compared as plaintext, inherited behavior.
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bson::{doc, DateTime};
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_sessions::Session;

use crate::{
    auth::section_key,
    database::PASSWORDS,
    error::AppError,
    models::SectionPassword,
    state::AppState,
    utils::{parse_id, to_api_json},
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/verify-password", post(verify_password))
        .route("/api/check-session/{section}", get(check_session))
        .route("/api/logout/{section}", post(logout_section))
        .route("/api/check-section-password", post(check_section_password))
        .route("/api/passwords", get(list).post(create))
        .route("/api/passwords/{id}", axum::routing::put(update).delete(remove))
}

#[derive(Deserialize)]
struct SectionCheck {
    section: String,
    password: String,
}

async fn verify_password(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<SectionCheck>,
) -> Result<Response, AppError> {
    let record = state
        .db
        .collection::<SectionPassword>(PASSWORDS)
        .find_one(doc! { "section": &payload.section })
        .await?;

    match record {
        Some(record) if record.password == payload.password => {
            session.insert(&section_key(&payload.section), true).await?;

            Ok(Json(json!({ "success": true })).into_response())
        }
        _ => Ok((
            StatusCode::FORBIDDEN,
            Json(json!({ "success": false, "message": "Wrong section password" })),
        )
            .into_response()),
    }
}

async fn check_session(
    Path(section): Path<String>,
    session: Session,
) -> Result<Json<Value>, AppError> {
    let authenticated = session
        .get::<bool>(&section_key(&section))
        .await?
        .unwrap_or(false);

    Ok(Json(json!({ "authenticated": authenticated })))
}

async fn logout_section(
    Path(section): Path<String>,
    session: Session,
) -> Result<Json<Value>, AppError> {
    session.insert(&section_key(&section), false).await?;

    Ok(Json(json!({ "success": true })))
}

async fn check_section_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SectionCheck>,
) -> Result<StatusCode, AppError> {
    let record = state
        .db
        .collection::<SectionPassword>(PASSWORDS)
        .find_one(doc! { "section": &payload.section })
        .await?
        .ok_or(AppError::NotFound("Section"))?;

    if record.password == payload.password {
        Ok(StatusCode::OK)
    } else {
        Ok(StatusCode::FORBIDDEN)
    }
}

async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let passwords: Vec<SectionPassword> = state
        .db
        .collection(PASSWORDS)
        .find(doc! {})
        .await?
        .try_collect()
        .await?;

    Ok(Json(to_api_json(&passwords)?))
}

#[derive(Deserialize)]
struct CreatePassword {
    section: String,
    password: String,
}

async fn create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreatePassword>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let mut record = SectionPassword {
        id: None,
        section: payload.section,
        password: payload.password,
        created_at: DateTime::now(),
    };

    let inserted = state
        .db
        .collection::<SectionPassword>(PASSWORDS)
        .insert_one(&record)
        .await?;
    record.id = inserted.inserted_id.as_object_id();

    Ok((StatusCode::CREATED, Json(to_api_json(&record)?)))
}

#[derive(Deserialize)]
struct UpdatePassword {
    section: Option<String>,
    password: Option<String>,
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdatePassword>,
) -> Result<Json<Value>, AppError> {
    let mut set = doc! {};
    if let Some(section) = payload.section {
        set.insert("section", section);
    }
    if let Some(password) = payload.password {
        set.insert("password", password);
    }

    let filter = doc! { "_id": parse_id(&id)? };
    let collection = state.db.collection::<SectionPassword>(PASSWORDS);

    if set.is_empty() {
        let current = collection
            .find_one(filter)
            .await?
            .ok_or(AppError::NotFound("Section password"))?;
        return Ok(Json(to_api_json(&current)?));
    }

    let updated = collection
        .find_one_and_update(filter, doc! { "$set": set })
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or(AppError::NotFound("Section password"))?;

    Ok(Json(to_api_json(&updated)?))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state
        .db
        .collection::<SectionPassword>(PASSWORDS)
        .find_one_and_delete(doc! { "_id": parse_id(&id)? })
        .await?
        .ok_or(AppError::NotFound("Section password"))?;

    Ok(Json(json!({ "message": "Section password deleted" })))
}
