//! Admin view over the audit trail: filter, paginate, wipe.
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use bson::{doc, Document};
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    auth::AdminUser,
    database::AUDIT_LOGS,
    error::AppError,
    state::AppState,
    utils::{day_end, day_start, to_api_json},
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/audit-logs", get(list).delete(clear))
}

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

#[derive(Deserialize, Default)]
struct LogQuery {
    model: Option<String>,
    action: Option<String>,
    /// Matched case-insensitively against the acting user's name/email/username.
    q: Option<String>,
    /// `YYYY-MM-DD`, inclusive.
    from: Option<String>,
    to: Option<String>,
    page: Option<i64>,
    limit: Option<i64>,
}

fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

fn build_filter(params: &LogQuery) -> Document {
    let mut filter = doc! {};

    if let Some(model) = &params.model {
        filter.insert("model", model);
    }
    if let Some(action) = &params.action {
        filter.insert("action", action);
    }

    let mut created = doc! {};
    if let Some(from) = params.from.as_deref().and_then(day_start) {
        created.insert("$gte", from);
    }
    if let Some(to) = params.to.as_deref().and_then(day_end) {
        created.insert("$lte", to);
    }
    if !created.is_empty() {
        filter.insert("createdAt", created);
    }

    if let Some(q) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let rx = doc! { "$regex": regex::escape(q), "$options": "i" };
        filter.insert(
            "$or",
            vec![
                doc! { "user.name": rx.clone() },
                doc! { "user.email": rx.clone() },
                doc! { "user.username": rx },
            ],
        );
    }

    filter
}

async fn list(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Query(params): Query<LogQuery>,
) -> Result<Json<Value>, AppError> {
    let page = clamp_page(params.page);
    let limit = clamp_limit(params.limit);
    let skip = (page - 1) * limit;
    let filter = build_filter(&params);

    let collection = state.db.collection::<Document>(AUDIT_LOGS);

    let items: Vec<Document> = collection
        .find(filter.clone())
        .sort(doc! { "createdAt": -1 })
        .skip(skip as u64)
        .limit(limit)
        .await?
        .try_collect()
        .await?;
    let total = collection.count_documents(filter).await?;

    let has_more = (skip as u64) + (items.len() as u64) < total;

    Ok(Json(json!({
        "items": to_api_json(&items)?,
        "hasMore": has_more,
        "total": total,
    })))
}

async fn clear(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> Result<Json<Value>, AppError> {
    state
        .db
        .collection::<Document>(AUDIT_LOGS)
        .delete_many(doc! {})
        .await?;

    Ok(Json(json!({ "message": "All audit logs deleted" })))
}

#[cfg(test)]
mod tests {
    use super::{build_filter, clamp_limit, clamp_page, LogQuery};

    #[test]
    fn test_clamps() {
        assert_eq!(clamp_page(None), 1);
        assert_eq!(clamp_page(Some(-3)), 1);
        assert_eq!(clamp_page(Some(7)), 7);

        assert_eq!(clamp_limit(None), 20);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(500)), 100);
    }

    #[test]
    fn test_filter_model_action() {
        let filter = build_filter(&LogQuery {
            model: Some("User".into()),
            action: Some("delete".into()),
            ..Default::default()
        });

        assert_eq!(filter.get_str("model"), Ok("User"));
        assert_eq!(filter.get_str("action"), Ok("delete"));
        assert!(!filter.contains_key("createdAt"));
        assert!(!filter.contains_key("$or"));
    }

    #[test]
    fn test_filter_date_range() {
        let filter = build_filter(&LogQuery {
            from: Some("2025-01-01".into()),
            to: Some("2025-01-31".into()),
            ..Default::default()
        });

        let created = filter.get_document("createdAt").unwrap();
        assert!(created.contains_key("$gte"));
        assert!(created.contains_key("$lte"));
    }

    #[test]
    fn test_filter_search_escaped() {
        let filter = build_filter(&LogQuery {
            q: Some("a.b@x".into()),
            ..Default::default()
        });

        let or = filter.get_array("$or").unwrap();
        assert_eq!(or.len(), 3);

        let first = or[0].as_document().unwrap();
        let rx = first.get_document("user.name").unwrap();
        assert_eq!(rx.get_str("$regex"), Ok(r"a\.b@x"));
    }

    #[test]
    fn test_filter_ignores_bad_dates() {
        let filter = build_filter(&LogQuery {
            from: Some("January".into()),
            ..Default::default()
        });

        assert!(!filter.contains_key("createdAt"));
    }
}
