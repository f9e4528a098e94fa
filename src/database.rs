//! # MongoDB
//!
//! One database, plain document collections. All structural guarantees are
//! unique indexes created at startup:
//!
//! - `users`: username, email
//! - `passwords`: section
//! - `departments`, `colleges`, `committees`, `auditors`: name
//! - `assignments`: (userId, college, committee_name) and (college, committee_name)
//! - `file_records`: (college, committee_name, academicYear, term)
use bson::doc;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Client, Database, IndexModel,
};

pub const VIDEOS: &str = "videos";
pub const LINKS: &str = "links";
pub const PASSWORDS: &str = "passwords";
pub const DEPARTMENTS: &str = "departments";
pub const BACKUPS: &str = "backups";
pub const COLLEGES: &str = "colleges";
pub const COMMITTEES: &str = "committees";
pub const AUDITORS: &str = "auditors";
pub const EVALUATIONS: &str = "evaluations";
pub const SETTINGS: &str = "settings";
pub const USERS: &str = "users";
pub const AUDIT_LOGS: &str = "audit_logs";
pub const ASSIGNMENTS: &str = "assignments";
pub const FILE_RECORDS: &str = "file_records";

pub async fn init_mongo(uri: &str, db_name: &str) -> Database {
    let client = Client::with_uri_str(uri)
        .await
        .expect("Failed to connect to MongoDB");

    client.database(db_name)
}

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    unique_index(db, USERS, doc! { "username": 1 }).await?;
    unique_index(db, USERS, doc! { "email": 1 }).await?;
    unique_index(db, PASSWORDS, doc! { "section": 1 }).await?;
    unique_index(db, DEPARTMENTS, doc! { "name": 1 }).await?;
    unique_index(db, COLLEGES, doc! { "name": 1 }).await?;
    unique_index(db, COMMITTEES, doc! { "name": 1 }).await?;
    unique_index(db, AUDITORS, doc! { "name": 1 }).await?;

    // One owner per (college, committee) pair, and no duplicate grants.
    unique_index(
        db,
        ASSIGNMENTS,
        doc! { "userId": 1, "college": 1, "committee_name": 1 },
    )
    .await?;
    unique_index(db, ASSIGNMENTS, doc! { "college": 1, "committee_name": 1 }).await?;

    unique_index(
        db,
        FILE_RECORDS,
        doc! { "college": 1, "committee_name": 1, "academicYear": 1, "term": 1 },
    )
    .await?;

    Ok(())
}

async fn unique_index(
    db: &Database,
    collection: &str,
    keys: bson::Document,
) -> Result<(), mongodb::error::Error> {
    let index = IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build();

    db.collection::<bson::Document>(collection)
        .create_index(index)
        .await?;

    Ok(())
}

/// MongoDB reports unique-index violations as error code 11000.
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match &*err.kind {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == 11000,
        ErrorKind::Command(e) => e.code == 11000,
        _ => false,
    }
}
