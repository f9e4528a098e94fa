//! Shareable links, kept in an explicit display order.
//!
//! `order` values stay a contiguous permutation of 0..n: creation appends at
//! the end, deletion renumbers the survivors, and move swaps with a neighbor.
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post, put},
    Json, Router,
};
use bson::{doc, oid::ObjectId, DateTime, Document};
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    database::LINKS,
    error::AppError,
    models::Link,
    state::AppState,
    utils::{parse_id, to_api_json},
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/links", get(list).post(create))
        .route("/api/links/{id}", put(update).delete(remove))
        .route("/api/links/{id}/move", post(move_link))
        .route("/api/redirect/{id}", get(redirect))
}

async fn sorted_links(state: &AppState) -> Result<Vec<Link>, AppError> {
    Ok(state
        .db
        .collection(LINKS)
        .find(doc! {})
        .sort(doc! { "order": 1 })
        .await?
        .try_collect()
        .await?)
}

async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let links = sorted_links(&state).await?;

    Ok(Json(to_api_json(&links)?))
}

#[derive(Deserialize)]
struct CreateLink {
    name: Option<String>,
    description: Option<String>,
    link: String,
    #[serde(rename = "linkText")]
    link_text: String,
    #[serde(rename = "requiresPassword", default)]
    requires_password: bool,
}

async fn create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateLink>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let collection = state.db.collection::<Link>(LINKS);
    let count = collection.count_documents(doc! {}).await?;

    let mut link = Link {
        id: None,
        name: payload.name,
        description: payload.description,
        link: payload.link,
        link_text: payload.link_text,
        requires_password: payload.requires_password,
        date_added: DateTime::now(),
        order: count as i64,
    };

    let inserted = collection.insert_one(&link).await?;
    link.id = inserted.inserted_id.as_object_id();

    Ok((StatusCode::CREATED, Json(to_api_json(&link)?)))
}

#[derive(Deserialize)]
struct UpdateLink {
    name: Option<String>,
    description: Option<String>,
    link: Option<String>,
    #[serde(rename = "linkText")]
    link_text: Option<String>,
    #[serde(rename = "requiresPassword")]
    requires_password: Option<bool>,
}

fn link_set_doc(payload: UpdateLink) -> Document {
    let mut set = doc! {};
    if let Some(name) = payload.name {
        set.insert("name", name);
    }
    if let Some(description) = payload.description {
        set.insert("description", description);
    }
    if let Some(link) = payload.link {
        set.insert("link", link);
    }
    if let Some(link_text) = payload.link_text {
        set.insert("linkText", link_text);
    }
    if let Some(requires_password) = payload.requires_password {
        set.insert("requiresPassword", requires_password);
    }

    set
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateLink>,
) -> Result<Json<Value>, AppError> {
    let filter = doc! { "_id": parse_id(&id)? };
    let collection = state.db.collection::<Link>(LINKS);

    let set = link_set_doc(payload);
    if set.is_empty() {
        let current = collection
            .find_one(filter)
            .await?
            .ok_or(AppError::NotFound("Link"))?;
        return Ok(Json(to_api_json(&current)?));
    }

    let updated = collection
        .find_one_and_update(filter, doc! { "$set": set })
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or(AppError::NotFound("Link"))?;

    Ok(Json(to_api_json(&updated)?))
}

/// Pairs whose stored order disagrees with their rank after a deletion.
fn renumber<T: Copy>(ordered: &[(T, i64)]) -> Vec<(T, i64)> {
    ordered
        .iter()
        .enumerate()
        .filter(|(rank, (_, order))| *order != *rank as i64)
        .map(|(rank, (id, _))| (*id, rank as i64))
        .collect()
}

async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let collection = state.db.collection::<Link>(LINKS);

    collection
        .find_one_and_delete(doc! { "_id": parse_id(&id)? })
        .await?
        .ok_or(AppError::NotFound("Link"))?;

    let survivors: Vec<(ObjectId, i64)> = sorted_links(&state)
        .await?
        .into_iter()
        .filter_map(|link| link.id.map(|id| (id, link.order)))
        .collect();

    for (link_id, order) in renumber(&survivors) {
        collection
            .update_one(doc! { "_id": link_id }, doc! { "$set": { "order": order } })
            .await?;
    }

    Ok(Json(json!({ "message": "Link deleted" })))
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum Direction {
    Up,
    Down,
}

#[derive(Deserialize)]
struct MoveLink {
    direction: Direction,
}

/// Index of the neighbor to swap with, `None` at the edges.
fn swap_target(len: usize, index: usize, direction: &Direction) -> Option<usize> {
    match direction {
        Direction::Up if index > 0 => Some(index - 1),
        Direction::Down if index + 1 < len => Some(index + 1),
        _ => None,
    }
}

async fn move_link(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<MoveLink>,
) -> Result<Json<Value>, AppError> {
    let link_id = parse_id(&id)?;
    let links = sorted_links(&state).await?;

    let index = links
        .iter()
        .position(|link| link.id == Some(link_id))
        .ok_or(AppError::NotFound("Link"))?;

    if let Some(target) = swap_target(links.len(), index, &payload.direction) {
        let collection = state.db.collection::<Link>(LINKS);
        let neighbor = &links[target];

        collection
            .update_one(
                doc! { "_id": link_id },
                doc! { "$set": { "order": neighbor.order } },
            )
            .await?;
        collection
            .update_one(
                doc! { "_id": neighbor.id },
                doc! { "$set": { "order": links[index].order } },
            )
            .await?;
    }

    Ok(Json(json!({ "message": "Link moved" })))
}

async fn redirect(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    let link = state
        .db
        .collection::<Link>(LINKS)
        .find_one(doc! { "_id": parse_id(&id)? })
        .await?
        .ok_or(AppError::NotFound("Link"))?;

    Ok(Redirect::temporary(&link.link))
}

#[cfg(test)]
mod tests {
    use super::{renumber, swap_target, Direction};

    #[test]
    fn test_renumber_closes_gap() {
        // Orders 0,2,3 after deleting the middle link.
        let changed = renumber(&[('a', 0), ('b', 2), ('c', 3)]);

        assert_eq!(changed, vec![('b', 1), ('c', 2)]);
    }

    #[test]
    fn test_renumber_contiguous_is_noop() {
        assert!(renumber(&[('a', 0), ('b', 1), ('c', 2)]).is_empty());
        assert!(renumber::<char>(&[]).is_empty());
    }

    #[test]
    fn test_swap_target_edges() {
        assert_eq!(swap_target(3, 0, &Direction::Up), None);
        assert_eq!(swap_target(3, 2, &Direction::Down), None);
        assert_eq!(swap_target(3, 1, &Direction::Up), Some(0));
        assert_eq!(swap_target(3, 1, &Direction::Down), Some(2));
    }
}
