use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use bson::{doc, DateTime, Document};
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    database::VIDEOS,
    error::AppError,
    models::Video,
    state::AppState,
    utils::{parse_id, to_api_json},
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/videos", get(list).post(create))
        .route("/api/videos/{id}", put(update).delete(remove))
}

async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let videos: Vec<Video> = state
        .db
        .collection(VIDEOS)
        .find(doc! {})
        .sort(doc! { "dateAdded": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(Json(to_api_json(&videos)?))
}

#[derive(Deserialize)]
struct CreateVideo {
    title: String,
    url: String,
    department: String,
    description: Option<String>,
}

async fn create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateVideo>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let mut video = Video {
        id: None,
        title: payload.title,
        url: payload.url,
        department: payload.department,
        description: payload.description,
        date_added: DateTime::now(),
    };

    let inserted = state
        .db
        .collection::<Video>(VIDEOS)
        .insert_one(&video)
        .await?;
    video.id = inserted.inserted_id.as_object_id();

    Ok((StatusCode::CREATED, Json(to_api_json(&video)?)))
}

#[derive(Deserialize)]
struct UpdateVideo {
    title: Option<String>,
    url: Option<String>,
    department: Option<String>,
    description: Option<String>,
}

fn video_set_doc(payload: UpdateVideo) -> Document {
    let mut set = doc! {};
    if let Some(title) = payload.title {
        set.insert("title", title);
    }
    if let Some(url) = payload.url {
        set.insert("url", url);
    }
    if let Some(department) = payload.department {
        set.insert("department", department);
    }
    if let Some(description) = payload.description {
        set.insert("description", description);
    }

    set
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateVideo>,
) -> Result<Json<Value>, AppError> {
    let filter = doc! { "_id": parse_id(&id)? };
    let collection = state.db.collection::<Video>(VIDEOS);

    let set = video_set_doc(payload);
    if set.is_empty() {
        // MongoDB rejects an empty $set.
        let current = collection
            .find_one(filter)
            .await?
            .ok_or(AppError::NotFound("Video"))?;
        return Ok(Json(to_api_json(&current)?));
    }

    let updated = collection
        .find_one_and_update(filter, doc! { "$set": set })
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or(AppError::NotFound("Video"))?;

    Ok(Json(to_api_json(&updated)?))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state
        .db
        .collection::<Video>(VIDEOS)
        .find_one_and_delete(doc! { "_id": parse_id(&id)? })
        .await?
        .ok_or(AppError::NotFound("Video"))?;

    Ok(Json(json!({ "message": "Video deleted" })))
}

#[cfg(test)]
mod tests {
    use super::{video_set_doc, UpdateVideo};

    #[test]
    fn test_set_doc_skips_missing_fields() {
        let set = video_set_doc(UpdateVideo {
            title: Some("t".into()),
            url: None,
            department: None,
            description: Some("d".into()),
        });

        assert_eq!(set.get_str("title"), Ok("t"));
        assert_eq!(set.get_str("description"), Ok("d"));
        assert!(!set.contains_key("url"));
        assert!(!set.contains_key("department"));
    }

    #[test]
    fn test_set_doc_empty_payload() {
        let set = video_set_doc(UpdateVideo {
            title: None,
            url: None,
            department: None,
            description: None,
        });

        assert!(set.is_empty());
    }
}
