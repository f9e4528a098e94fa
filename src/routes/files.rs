//! File-link records: one document per (college, committee, academic year,
//! term), pointing at an externally hosted file. The compound unique index
//! makes the quadruple the identity of a record.
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
    auth::{ensure_pair_allowed, AdminUser, CurrentUser},
    database::FILE_RECORDS,
    error::AppError,
    models::FileRecord,
    state::AppState,
    utils::{parse_id, to_api_json, valid_academic_year},
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/files", get(list).post(create))
        .route("/api/files/{id}", put(update).delete(remove))
}

#[derive(Deserialize)]
struct ListFilter {
    college: Option<String>,
    committee_name: Option<String>,
    #[serde(rename = "academicYear")]
    academic_year: Option<String>,
    term: Option<String>,
}

fn list_filter(params: &ListFilter) -> Document {
    let mut filter = doc! {};
    if let Some(college) = &params.college {
        filter.insert("college", college);
    }
    if let Some(committee_name) = &params.committee_name {
        filter.insert("committee_name", committee_name);
    }
    if let Some(academic_year) = &params.academic_year {
        filter.insert("academicYear", academic_year);
    }
    if let Some(term) = &params.term {
        filter.insert("term", term);
    }

    filter
}

async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListFilter>,
) -> Result<Json<Value>, AppError> {
    let records: Vec<FileRecord> = state
        .db
        .collection(FILE_RECORDS)
        .find(list_filter(&params))
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(Json(to_api_json(&records)?))
}

#[derive(Deserialize)]
struct CreateFileRecord {
    college: String,
    committee_name: String,
    #[serde(rename = "academicYear")]
    academic_year: String,
    term: String,
    #[serde(rename = "fileUrl")]
    file_url: String,
    note: Option<String>,
}

fn record_snapshot(record: &FileRecord) -> Document {
    doc! {
        "college": &record.college,
        "committee_name": &record.committee_name,
        "academicYear": &record.academic_year,
        "term": &record.term,
        "fileUrl": &record.file_url,
    }
}

async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateFileRecord>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if payload.academic_year.is_empty() || !valid_academic_year(&payload.academic_year) {
        return Err(AppError::BadRequest(
            "Academic year must look like 2024-2025 or 2024/2025".into(),
        ));
    }

    ensure_pair_allowed(&state.db, &user, &payload.college, &payload.committee_name).await?;

    let now = DateTime::now();
    let mut record = FileRecord {
        id: None,
        college: payload.college,
        committee_name: payload.committee_name,
        academic_year: payload.academic_year,
        term: payload.term,
        file_url: payload.file_url,
        note: payload.note,
        uploaded_by: Some(user.username.clone()),
        created_at: now,
        updated_at: now,
    };

    let inserted = state
        .db
        .collection::<FileRecord>(FILE_RECORDS)
        .insert_one(&record)
        .await?;
    record.id = inserted.inserted_id.as_object_id();

    audit::record(
        &state.db,
        Some(&user),
        "FileRecord",
        AuditAction::Create,
        record.id,
        Some(record_snapshot(&record)),
    )
    .await;

    Ok((StatusCode::CREATED, Json(to_api_json(&record)?)))
}

#[derive(Deserialize)]
struct UpdateFileRecord {
    college: Option<String>,
    committee_name: Option<String>,
    #[serde(rename = "academicYear")]
    academic_year: Option<String>,
    term: Option<String>,
    #[serde(rename = "fileUrl")]
    file_url: Option<String>,
    note: Option<String>,
}

fn record_set_doc(payload: &UpdateFileRecord) -> Result<Document, AppError> {
    let mut set = doc! {};

    if let Some(college) = &payload.college {
        set.insert("college", college);
    }
    if let Some(committee_name) = &payload.committee_name {
        set.insert("committee_name", committee_name);
    }
    if let Some(academic_year) = &payload.academic_year {
        if academic_year.is_empty() || !valid_academic_year(academic_year) {
            return Err(AppError::BadRequest(
                "Academic year must look like 2024-2025 or 2024/2025".into(),
            ));
        }
        set.insert("academicYear", academic_year);
    }
    if let Some(term) = &payload.term {
        set.insert("term", term);
    }
    if let Some(file_url) = &payload.file_url {
        set.insert("fileUrl", file_url);
    }
    if let Some(note) = &payload.note {
        set.insert("note", note);
    }

    Ok(set)
}

async fn update(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateFileRecord>,
) -> Result<Json<Value>, AppError> {
    let record_id = parse_id(&id)?;
    let collection = state.db.collection::<FileRecord>(FILE_RECORDS);

    let before = collection
        .find_one(doc! { "_id": record_id })
        .await?
        .ok_or(AppError::NotFound("File record"))?;

    ensure_pair_allowed(&state.db, &user, &before.college, &before.committee_name).await?;
    if payload.college.is_some() || payload.committee_name.is_some() {
        let college = payload.college.as_deref().unwrap_or(&before.college);
        let committee = payload
            .committee_name
            .as_deref()
            .unwrap_or(&before.committee_name);
        ensure_pair_allowed(&state.db, &user, college, committee).await?;
    }

    let mut set = record_set_doc(&payload)?;
    set.insert("updatedAt", DateTime::now());

    let updated = collection
        .find_one_and_update(doc! { "_id": record_id }, doc! { "$set": set })
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or(AppError::NotFound("File record"))?;

    audit::record(
        &state.db,
        Some(&user),
        "FileRecord",
        AuditAction::Update,
        Some(record_id),
        Some(before_after(
            record_snapshot(&before),
            record_snapshot(&updated),
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
    let record_id = parse_id(&id)?;

    let before = state
        .db
        .collection::<FileRecord>(FILE_RECORDS)
        .find_one_and_delete(doc! { "_id": record_id })
        .await?
        .ok_or(AppError::NotFound("File record"))?;

    audit::record(
        &state.db,
        Some(&admin),
        "FileRecord",
        AuditAction::Delete,
        Some(record_id),
        Some(record_snapshot(&before)),
    )
    .await;

    Ok(Json(json!({ "message": "File record deleted" })))
}

#[cfg(test)]
mod tests {
    use super::{list_filter, record_set_doc, ListFilter, UpdateFileRecord};

    #[test]
    fn test_list_filter_quadruple() {
        let filter = list_filter(&ListFilter {
            college: Some("Nursing".into()),
            committee_name: None,
            academic_year: Some("2024-2025".into()),
            term: Some("first".into()),
        });

        assert_eq!(filter.get_str("college"), Ok("Nursing"));
        assert_eq!(filter.get_str("academicYear"), Ok("2024-2025"));
        assert_eq!(filter.get_str("term"), Ok("first"));
        assert!(!filter.contains_key("committee_name"));
    }

    #[test]
    fn test_set_doc_rejects_blank_year() {
        let payload = UpdateFileRecord {
            college: None,
            committee_name: None,
            academic_year: Some(String::new()),
            term: None,
            file_url: None,
            note: None,
        };

        assert!(record_set_doc(&payload).is_err());
    }
}
