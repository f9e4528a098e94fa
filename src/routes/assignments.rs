//! Per-user committee assignments.
//!
//! An assignment grants one subuser-member ownership of one (college,
//! committee) pair. Two unique indexes back this up: a user cannot hold the
//! same pair twice, and a pair cannot have two owners.
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use bson::{doc, DateTime, Document};
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    audit::{self, before_after, AuditAction},
    auth::{AdminUser, CurrentUser},
    database::{ASSIGNMENTS, USERS},
    error::AppError,
    models::{Assignment, User},
    state::AppState,
    utils::{parse_id, to_api_json},
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/assignments", get(list).post(create))
        .route("/api/assignments/mine", get(mine))
        .route("/api/assignments/{id}", put(update).delete(remove))
}

#[derive(Deserialize)]
struct CreateAssignment {
    #[serde(rename = "userId")]
    user_id: String,
    college: String,
    committee_name: String,
    note: Option<String>,
}

fn assignment_snapshot(assignment: &Assignment) -> Document {
    doc! {
        "userId": assignment.user_id.to_hex(),
        "college": &assignment.college,
        "committee_name": &assignment.committee_name,
        "note": assignment.note.as_deref().unwrap_or(""),
    }
}

async fn create(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreateAssignment>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let user_id = parse_id(&payload.user_id)?;

    state
        .db
        .collection::<User>(USERS)
        .find_one(doc! { "_id": user_id })
        .await?
        .ok_or(AppError::NotFound("User"))?;

    let now = DateTime::now();
    let mut assignment = Assignment {
        id: None,
        user_id,
        college: payload.college.trim().to_string(),
        committee_name: payload.committee_name.trim().to_string(),
        note: payload.note,
        created_at: now,
        updated_at: now,
    };

    let inserted = state
        .db
        .collection::<Assignment>(ASSIGNMENTS)
        .insert_one(&assignment)
        .await?;
    assignment.id = inserted.inserted_id.as_object_id();

    audit::record(
        &state.db,
        Some(&admin),
        "CommitteeAssignment",
        AuditAction::Create,
        assignment.id,
        Some(assignment_snapshot(&assignment)),
    )
    .await;

    Ok((StatusCode::CREATED, Json(to_api_json(&assignment)?)))
}

#[derive(Deserialize)]
struct ListFilter {
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

async fn list(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Query(params): Query<ListFilter>,
) -> Result<Json<Value>, AppError> {
    let filter = match params.user_id.as_deref() {
        Some(id) => doc! { "userId": parse_id(id)? },
        None => doc! {},
    };

    let assignments: Vec<Assignment> = state
        .db
        .collection(ASSIGNMENTS)
        .find(filter)
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(Json(to_api_json(&assignments)?))
}

async fn mine(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>, AppError> {
    let assignments: Vec<Assignment> = state
        .db
        .collection(ASSIGNMENTS)
        .find(doc! { "userId": parse_id(&user.id)? })
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(Json(to_api_json(&assignments)?))
}

#[derive(Deserialize)]
struct UpdateAssignment {
    note: Option<String>,
}

async fn update(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateAssignment>,
) -> Result<Json<Value>, AppError> {
    let assignment_id = parse_id(&id)?;
    let collection = state.db.collection::<Assignment>(ASSIGNMENTS);

    let before = collection
        .find_one(doc! { "_id": assignment_id })
        .await?
        .ok_or(AppError::NotFound("Assignment"))?;

    let updated = collection
        .find_one_and_update(
            doc! { "_id": assignment_id },
            doc! { "$set": {
                "note": payload.note.as_deref().unwrap_or(""),
                "updatedAt": DateTime::now(),
            } },
        )
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or(AppError::NotFound("Assignment"))?;

    audit::record(
        &state.db,
        Some(&admin),
        "CommitteeAssignment",
        AuditAction::Update,
        Some(assignment_id),
        Some(before_after(
            assignment_snapshot(&before),
            assignment_snapshot(&updated),
        )),
    )
    .await;

    Ok(Json(to_api_json(&updated)?))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let assignment_id = parse_id(&id)?;

    let before = state
        .db
        .collection::<Assignment>(ASSIGNMENTS)
        .find_one_and_delete(doc! { "_id": assignment_id })
        .await?
        .ok_or(AppError::NotFound("Assignment"))?;

    audit::record(
        &state.db,
        Some(&admin),
        "CommitteeAssignment",
        AuditAction::Delete,
        Some(assignment_id),
        Some(assignment_snapshot(&before)),
    )
    .await;

    Ok(Json(json!({ "message": "Assignment deleted" })))
}
