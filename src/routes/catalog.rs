//! Shared CRUD over the name dictionaries (colleges, committees, auditors).
//!
//! All three are `{name}` documents with a unique index on `name`, public
//! reads, admin-only writes and audit entries. The route modules stay thin
//! wrappers that pin the collection and the audit model name.
use bson::{doc, DateTime, Document};
use futures::TryStreamExt;
use mongodb::Database;
use serde_json::Value;

use crate::{
    audit::{self, before_after, AuditAction},
    auth::SessionUser,
    error::AppError,
    models::NamedEntry,
    utils::{parse_id, to_api_json},
};

pub struct Catalog {
    pub collection: &'static str,
    /// Audit log `model` field.
    pub model: &'static str,
    pub label: &'static str,
}

impl Catalog {
    pub async fn list(&self, db: &Database) -> Result<Value, AppError> {
        let entries: Vec<NamedEntry> = db
            .collection(self.collection)
            .find(doc! {})
            .sort(doc! { "name": 1 })
            .await?
            .try_collect()
            .await?;

        to_api_json(&entries)
    }

    pub async fn create(
        &self,
        db: &Database,
        user: &SessionUser,
        name: String,
    ) -> Result<Value, AppError> {
        let mut entry = NamedEntry {
            id: None,
            name,
            created_at: Some(DateTime::now()),
        };

        let inserted = db
            .collection::<NamedEntry>(self.collection)
            .insert_one(&entry)
            .await?;
        entry.id = inserted.inserted_id.as_object_id();

        audit::record(
            db,
            Some(user),
            self.model,
            AuditAction::Create,
            entry.id,
            Some(doc! { "name": &entry.name }),
        )
        .await;

        to_api_json(&entry)
    }

    pub async fn update(
        &self,
        db: &Database,
        user: &SessionUser,
        id: &str,
        name: String,
    ) -> Result<Value, AppError> {
        let entry_id = parse_id(id)?;
        let collection = db.collection::<NamedEntry>(self.collection);

        let before = collection
            .find_one(doc! { "_id": entry_id })
            .await?
            .ok_or(AppError::NotFound(self.label))?;

        let updated = collection
            .find_one_and_update(
                doc! { "_id": entry_id },
                doc! { "$set": { "name": &name } },
            )
            .return_document(mongodb::options::ReturnDocument::After)
            .await?
            .ok_or(AppError::NotFound(self.label))?;

        audit::record(
            db,
            Some(user),
            self.model,
            AuditAction::Update,
            Some(entry_id),
            Some(before_after(snapshot(&before), snapshot(&updated))),
        )
        .await;

        to_api_json(&updated)
    }

    pub async fn delete(
        &self,
        db: &Database,
        user: &SessionUser,
        id: &str,
    ) -> Result<(), AppError> {
        let entry_id = parse_id(id)?;

        let before = db
            .collection::<NamedEntry>(self.collection)
            .find_one_and_delete(doc! { "_id": entry_id })
            .await?
            .ok_or(AppError::NotFound(self.label))?;

        audit::record(
            db,
            Some(user),
            self.model,
            AuditAction::Delete,
            Some(entry_id),
            Some(snapshot(&before)),
        )
        .await;

        Ok(())
    }
}

fn snapshot(entry: &NamedEntry) -> Document {
    doc! { "name": &entry.name }
}
