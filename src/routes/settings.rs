//! Dashboard display settings, a lazily created singleton document.
use std::sync::Arc;

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use bson::{doc, to_document, DateTime};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    audit::{self, before_after, AuditAction},
    auth::AdminUser,
    database::SETTINGS,
    error::AppError,
    models::Settings,
    state::AppState,
    utils::{to_api_json, valid_academic_year},
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/settings", get(read).put(update))
}

async fn read(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let collection = state.db.collection::<Settings>(SETTINGS);

    let settings = match collection.find_one(doc! {}).await? {
        Some(settings) => settings,
        None => {
            let mut settings = Settings {
                id: None,
                visible_columns: Vec::new(),
                selected_visits: Vec::new(),
                current_term: None,
                current_academic_year: None,
                updated_at: DateTime::now(),
            };
            let inserted = collection.insert_one(&settings).await?;
            settings.id = inserted.inserted_id.as_object_id();

            settings
        }
    };

    Ok(Json(to_api_json(&settings)?))
}

#[derive(Deserialize)]
struct UpdateSettings {
    #[serde(rename = "visibleColumns", default)]
    visible_columns: Vec<String>,
    #[serde(rename = "selectedVisits", default)]
    selected_visits: Vec<String>,
    #[serde(rename = "currentTerm")]
    current_term: Option<String>,
    #[serde(rename = "currentAcademicYear")]
    current_academic_year: Option<String>,
}

async fn update(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<UpdateSettings>,
) -> Result<Json<Value>, AppError> {
    if let Some(year) = &payload.current_academic_year {
        if !valid_academic_year(year) {
            return Err(AppError::BadRequest(
                "Academic year must look like 2024-2025 or 2024/2025".into(),
            ));
        }
    }

    let collection = state.db.collection::<Settings>(SETTINGS);
    let before = collection.find_one(doc! {}).await?;

    let mut settings = Settings {
        id: before.as_ref().and_then(|s| s.id),
        visible_columns: payload.visible_columns,
        selected_visits: payload.selected_visits,
        current_term: payload.current_term,
        current_academic_year: payload.current_academic_year,
        updated_at: DateTime::now(),
    };

    match &settings.id {
        // Whole-document replace: a `$set` of the serialized struct would
        // leave previously stored currentTerm/currentAcademicYear behind,
        // since cleared fields are omitted from the document entirely.
        Some(id) => {
            collection.replace_one(doc! { "_id": id }, &settings).await?;
        }
        None => {
            let inserted = collection.insert_one(&settings).await?;
            settings.id = inserted.inserted_id.as_object_id();
        }
    }

    audit::record(
        &state.db,
        Some(&admin),
        "Settings",
        AuditAction::Update,
        settings.id,
        Some(before_after(
            before
                .as_ref()
                .and_then(|s| to_document(s).ok())
                .unwrap_or_default(),
            to_document(&settings).unwrap_or_default(),
        )),
    )
    .await;

    Ok(Json(to_api_json(&settings)?))
}

#[cfg(test)]
mod tests {
    use bson::{to_document, DateTime};

    use crate::models::Settings;

    // Cleared term/year fields never appear in the serialized document, so
    // the update must replace the stored singleton rather than `$set` it.
    #[test]
    fn test_cleared_fields_absent_from_doc() {
        let settings = Settings {
            id: None,
            visible_columns: vec!["college".into()],
            selected_visits: Vec::new(),
            current_term: None,
            current_academic_year: None,
            updated_at: DateTime::now(),
        };

        let doc = to_document(&settings).unwrap();
        assert!(!doc.contains_key("currentTerm"));
        assert!(!doc.contains_key("currentAcademicYear"));
    }
}
