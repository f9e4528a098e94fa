//! One-shot bootstrap of the first admin account.
//!
//! Guarded twice: it only runs with `RUN_SEED=1`, and it refuses to touch an
//! existing username/email. Identity comes from `ADMIN_NAME`,
//! `ADMIN_USERNAME`, `ADMIN_EMAIL` and `ADMIN_PASSWORD`.
use std::env;

use bson::{doc, DateTime};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use qa_portal::{
    config::Config,
    database::{init_mongo, USERS},
    models::{Role, User},
};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if env::var("RUN_SEED").as_deref() != Ok("1") {
        info!("RUN_SEED != 1, skipping admin seed");
        return;
    }

    let config = Config::load();
    let db = init_mongo(&config.mongo_uri, &config.mongo_db).await;

    let name = require("ADMIN_NAME");
    let username = require("ADMIN_USERNAME").trim().to_lowercase();
    let email = require("ADMIN_EMAIL").trim().to_lowercase();
    let password = require("ADMIN_PASSWORD");

    let collection = db.collection::<User>(USERS);

    let exists = collection
        .find_one(doc! { "$or": [ { "username": &username }, { "email": &email } ] })
        .await
        .expect("Failed to query users");
    if exists.is_some() {
        info!("Admin user already exists, nothing to do");
        return;
    }

    let admin = User {
        id: None,
        name,
        username: username.clone(),
        email,
        password: bcrypt::hash(&password, 10).expect("Failed to hash password"),
        role: Role::Admin,
        is_active: true,
        last_login: None,
        created_at: DateTime::now(),
    };

    match collection.insert_one(&admin).await {
        Ok(inserted) => info!(
            "Admin created: {username} ({})",
            inserted
                .inserted_id
                .as_object_id()
                .map(|id| id.to_hex())
                .unwrap_or_default()
        ),
        Err(err) => error!("Failed to create admin: {err}"),
    }
}

fn require(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} must be set"))
}
