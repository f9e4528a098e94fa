//! Append-only audit log for committee-system mutations.
//!
//! Purely observability: a failed write is logged and swallowed so it never
//! fails the request that triggered it.
use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::Database;
use tracing::warn;

use crate::{auth::SessionUser, database::AUDIT_LOGS};

#[derive(Debug, Clone, Copy)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
        }
    }
}

pub async fn record(
    db: &Database,
    user: Option<&SessionUser>,
    model: &'static str,
    action: AuditAction,
    doc_id: Option<ObjectId>,
    payload: Option<Document>,
) {
    let mut entry = doc! {
        "model": model,
        "action": action.as_str(),
        "createdAt": DateTime::now(),
    };

    if let Some(id) = doc_id {
        entry.insert("docId", id.to_hex());
    }
    if let Some(user) = user {
        entry.insert(
            "user",
            doc! {
                "id": &user.id,
                "name": &user.name,
                "email": &user.email,
                "username": &user.username,
                "role": user.role.as_str(),
            },
        );
    }
    if let Some(payload) = payload {
        entry.insert("payload", payload);
    }

    if let Err(err) = db
        .collection::<Document>(AUDIT_LOGS)
        .insert_one(entry)
        .await
    {
        warn!("Audit log write failed: {err}");
    }
}

/// `{before, after}` payload for update entries.
pub fn before_after(before: Document, after: Document) -> Document {
    doc! { "before": before, "after": after }
}

#[cfg(test)]
mod tests {
    use super::{before_after, AuditAction};
    use bson::doc;

    #[test]
    fn test_action_names() {
        assert_eq!(AuditAction::Create.as_str(), "create");
        assert_eq!(AuditAction::Update.as_str(), "update");
        assert_eq!(AuditAction::Delete.as_str(), "delete");
    }

    #[test]
    fn test_before_after_shape() {
        let payload = before_after(doc! { "name": "a" }, doc! { "name": "b" });

        assert_eq!(payload.get_document("before").unwrap().get_str("name"), Ok("a"));
        assert_eq!(payload.get_document("after").unwrap().get_str("name"), Ok("b"));
    }
}
