//! Committee evaluation documents, served at `/api/committees`.
//!
//! Reads are public; writes need a logged-in user, deletes an admin.
//! Subuser-members only touch (college, committee) pairs assigned to them.
//! Creating an evaluation also upserts the committee name into the dictionary
//! and autofills an empty term/academic year from the settings singleton.
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use bson::{doc, to_document, DateTime, Document};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    audit::{self, before_after, AuditAction},
    auth::{ensure_pair_allowed, AdminUser, CurrentUser},
    database::{COMMITTEES, EVALUATIONS, SETTINGS},
    error::AppError,
    models::{Evaluation, Settings},
    state::AppState,
    utils::{day_start, parse_id, to_api_json, valid_academic_year},
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/committees", get(list).post(create))
        .route("/api/committees/{id}", put(update).delete(remove))
}

#[derive(Deserialize, Serialize)]
struct CreateEvaluation {
    college: String,
    committee_name: String,

    #[serde(default)]
    formation_decision: i32,
    #[serde(default)]
    work_plan: i32,
    #[serde(default)]
    performance_indicators: i32,
    #[serde(default)]
    meetings: i32,
    #[serde(default)]
    consistency: i32,
    #[serde(default)]
    coverage_books: i32,
    #[serde(default)]
    report1: i32,
    #[serde(default)]
    report2: i32,
    #[serde(default)]
    report3: i32,
    #[serde(default)]
    statistical_analysis: i32,
    #[serde(default)]
    availability_score: i32,

    notes: Option<String>,
    /// `YYYY-MM-DD`.
    audit_date: Option<String>,
    auditor_name: String,

    term: Option<String>,
    #[serde(rename = "academicYear")]
    academic_year: Option<String>,
}

/// Explicit non-empty value wins, otherwise the settings default applies.
fn autofill(explicit: Option<String>, fallback: Option<&String>) -> String {
    explicit
        .filter(|v| !v.is_empty())
        .or_else(|| fallback.cloned())
        .unwrap_or_default()
}

fn check_academic_year(value: &str) -> Result<(), AppError> {
    if valid_academic_year(value) {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "Academic year must look like 2024-2025 or 2024/2025".into(),
        ))
    }
}

fn parse_audit_date(value: Option<&str>) -> Result<Option<DateTime>, AppError> {
    match value {
        None => Ok(None),
        Some(raw) => day_start(raw)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid audit date: {raw}"))),
    }
}

async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateEvaluation>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    ensure_pair_allowed(&state.db, &user, &payload.college, &payload.committee_name).await?;

    let settings = state
        .db
        .collection::<Settings>(SETTINGS)
        .find_one(doc! {})
        .await?;

    let term = autofill(
        payload.term.clone(),
        settings.as_ref().and_then(|s| s.current_term.as_ref()),
    );
    let academic_year = autofill(
        payload.academic_year.clone(),
        settings
            .as_ref()
            .and_then(|s| s.current_academic_year.as_ref()),
    );
    check_academic_year(&academic_year)?;

    // Keep the dictionary in sync so autocomplete knows every referenced name.
    state
        .db
        .collection::<Document>(COMMITTEES)
        .update_one(
            doc! { "name": &payload.committee_name },
            doc! { "$setOnInsert": { "name": &payload.committee_name } },
        )
        .upsert(true)
        .await?;

    let now = DateTime::now();
    let mut evaluation = Evaluation {
        id: None,
        college: payload.college.clone(),
        committee_name: payload.committee_name.clone(),
        formation_decision: payload.formation_decision,
        work_plan: payload.work_plan,
        performance_indicators: payload.performance_indicators,
        meetings: payload.meetings,
        consistency: payload.consistency,
        coverage_books: payload.coverage_books,
        report1: payload.report1,
        report2: payload.report2,
        report3: payload.report3,
        statistical_analysis: payload.statistical_analysis,
        availability_score: payload.availability_score,
        notes: payload.notes.clone(),
        audit_date: parse_audit_date(payload.audit_date.as_deref())?,
        auditor_name: payload.auditor_name.clone(),
        term,
        academic_year,
        created_at: now,
        updated_at: now,
    };

    let inserted = state
        .db
        .collection::<Evaluation>(EVALUATIONS)
        .insert_one(&evaluation)
        .await?;
    evaluation.id = inserted.inserted_id.as_object_id();

    audit::record(
        &state.db,
        Some(&user),
        "Evaluation",
        AuditAction::Create,
        evaluation.id,
        to_document(&payload).ok(),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Evaluation saved",
            "evaluation": to_api_json(&evaluation)?,
        })),
    ))
}

#[derive(Deserialize)]
struct ListFilter {
    college: Option<String>,
    auditor_name: Option<String>,
}

fn list_filter(params: &ListFilter) -> Document {
    let mut filter = doc! {};
    if let Some(college) = &params.college {
        filter.insert("college", college);
    }
    if let Some(auditor_name) = &params.auditor_name {
        filter.insert("auditor_name", auditor_name);
    }

    filter
}

async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListFilter>,
) -> Result<Json<Value>, AppError> {
    let evaluations: Vec<Evaluation> = state
        .db
        .collection(EVALUATIONS)
        .find(list_filter(&params))
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(Json(to_api_json(&evaluations)?))
}

#[derive(Deserialize, Serialize)]
struct UpdateEvaluation {
    college: Option<String>,
    committee_name: Option<String>,

    formation_decision: Option<i32>,
    work_plan: Option<i32>,
    performance_indicators: Option<i32>,
    meetings: Option<i32>,
    consistency: Option<i32>,
    coverage_books: Option<i32>,
    report1: Option<i32>,
    report2: Option<i32>,
    report3: Option<i32>,
    statistical_analysis: Option<i32>,
    availability_score: Option<i32>,

    notes: Option<String>,
    audit_date: Option<String>,
    auditor_name: Option<String>,

    term: Option<String>,
    #[serde(rename = "academicYear")]
    academic_year: Option<String>,
}

fn evaluation_set_doc(payload: &UpdateEvaluation) -> Result<Document, AppError> {
    let mut set = doc! {};

    if let Some(college) = &payload.college {
        set.insert("college", college);
    }
    if let Some(committee_name) = &payload.committee_name {
        set.insert("committee_name", committee_name);
    }

    let scores = [
        ("formation_decision", payload.formation_decision),
        ("work_plan", payload.work_plan),
        ("performance_indicators", payload.performance_indicators),
        ("meetings", payload.meetings),
        ("consistency", payload.consistency),
        ("coverage_books", payload.coverage_books),
        ("report1", payload.report1),
        ("report2", payload.report2),
        ("report3", payload.report3),
        ("statistical_analysis", payload.statistical_analysis),
        ("availability_score", payload.availability_score),
    ];
    for (field, value) in scores {
        if let Some(value) = value {
            set.insert(field, value);
        }
    }

    if let Some(notes) = &payload.notes {
        set.insert("notes", notes);
    }
    if let Some(date) = parse_audit_date(payload.audit_date.as_deref())? {
        set.insert("audit_date", date);
    }
    if let Some(auditor_name) = &payload.auditor_name {
        set.insert("auditor_name", auditor_name);
    }
    if let Some(term) = &payload.term {
        set.insert("term", term);
    }
    if let Some(academic_year) = &payload.academic_year {
        check_academic_year(academic_year)?;
        set.insert("academicYear", academic_year);
    }

    Ok(set)
}

async fn update(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateEvaluation>,
) -> Result<Json<Value>, AppError> {
    let evaluation_id = parse_id(&id)?;
    let collection = state.db.collection::<Evaluation>(EVALUATIONS);

    let before = collection
        .find_one(doc! { "_id": evaluation_id })
        .await?
        .ok_or(AppError::NotFound("Evaluation"))?;

    ensure_pair_allowed(&state.db, &user, &before.college, &before.committee_name).await?;
    if payload.college.is_some() || payload.committee_name.is_some() {
        let college = payload.college.as_deref().unwrap_or(&before.college);
        let committee = payload
            .committee_name
            .as_deref()
            .unwrap_or(&before.committee_name);
        ensure_pair_allowed(&state.db, &user, college, committee).await?;
    }

    let mut set = evaluation_set_doc(&payload)?;
    set.insert("updatedAt", DateTime::now());

    let updated = collection
        .find_one_and_update(doc! { "_id": evaluation_id }, doc! { "$set": set })
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or(AppError::NotFound("Evaluation"))?;

    audit::record(
        &state.db,
        Some(&user),
        "Evaluation",
        AuditAction::Update,
        Some(evaluation_id),
        Some(before_after(
            to_document(&before).unwrap_or_default(),
            to_document(&updated).unwrap_or_default(),
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
    let evaluation_id = parse_id(&id)?;

    let before = state
        .db
        .collection::<Evaluation>(EVALUATIONS)
        .find_one_and_delete(doc! { "_id": evaluation_id })
        .await?
        .ok_or(AppError::NotFound("Evaluation"))?;

    audit::record(
        &state.db,
        Some(&admin),
        "Evaluation",
        AuditAction::Delete,
        Some(evaluation_id),
        to_document(&before).ok(),
    )
    .await;

    Ok(Json(json!({ "message": "Evaluation deleted" })))
}

#[cfg(test)]
mod tests {
    use super::{autofill, evaluation_set_doc, list_filter, ListFilter, UpdateEvaluation};

    fn empty_update() -> UpdateEvaluation {
        serde_json::from_str("{}").unwrap()
    }

    #[test]
    fn test_autofill_prefers_explicit() {
        let fallback = "2024-2025".to_string();

        assert_eq!(autofill(Some("2025-2026".into()), Some(&fallback)), "2025-2026");
        assert_eq!(autofill(Some(String::new()), Some(&fallback)), "2024-2025");
        assert_eq!(autofill(None, Some(&fallback)), "2024-2025");
        assert_eq!(autofill(None, None), "");
    }

    #[test]
    fn test_list_filter() {
        let filter = list_filter(&ListFilter {
            college: Some("Engineering".into()),
            auditor_name: None,
        });

        assert_eq!(filter.get_str("college"), Ok("Engineering"));
        assert!(!filter.contains_key("auditor_name"));
    }

    #[test]
    fn test_set_doc_scores_and_year() {
        let mut payload = empty_update();
        payload.meetings = Some(4);
        payload.academic_year = Some("2024/2025".into());

        let set = evaluation_set_doc(&payload).unwrap();

        assert_eq!(set.get_i32("meetings"), Ok(4));
        assert_eq!(set.get_str("academicYear"), Ok("2024/2025"));
        assert!(!set.contains_key("work_plan"));
    }

    #[test]
    fn test_set_doc_rejects_bad_year() {
        let mut payload = empty_update();
        payload.academic_year = Some("24-25".into());

        assert!(evaluation_set_doc(&payload).is_err());
    }

    #[test]
    fn test_set_doc_rejects_bad_date() {
        let mut payload = empty_update();
        payload.audit_date = Some("May 1st".into());

        assert!(evaluation_set_doc(&payload).is_err());
    }
}
