//! Committee-system accounts and login.
//!
//! Passwords are bcrypt hashes; responses never include them. Every mutation
//! writes an audit entry, updates with a before/after pair and deletes with a
//! snapshot of the removed account.
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use bson::{doc, DateTime, Document};
use futures::TryStreamExt;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_sessions::Session;

use crate::{
    audit::{self, before_after, AuditAction},
    auth::{AdminUser, MaybeUser, SessionUser, USER_KEY},
    database::USERS,
    error::AppError,
    models::{PublicUser, Role, User},
    state::AppState,
    utils::{parse_id, to_api_json},
};

const BCRYPT_COST: u32 = 10;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/committees/init-admin", post(init_admin))
        .route("/auth/committees/login", post(login))
        .route("/auth/committees/register", post(register))
        .route("/auth/committees/logout", post(logout))
        .route("/auth/committees/me", get(me))
        .route("/api/users", get(list))
        .route("/api/users/{id}", put(update).delete(remove))
        .route("/api/users/{id}/password", put(change_password))
}

fn normalize_username(username: &str) -> Result<String, AppError> {
    let username = username.trim().to_lowercase();
    let re = Regex::new(r"^[a-z0-9_.]{3,30}$").unwrap();

    if re.is_match(&username) {
        Ok(username)
    } else {
        Err(AppError::BadRequest(
            "Username must be 3-30 characters of a-z, 0-9, '_' or '.'".into(),
        ))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn session_user(user: &User) -> SessionUser {
    SessionUser {
        id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
        name: user.name.clone(),
        email: user.email.clone(),
        username: user.username.clone(),
        role: user.role,
    }
}

#[derive(Deserialize)]
struct RegisterUser {
    name: String,
    username: String,
    email: String,
    password: String,
    role: Option<Role>,
}

async fn insert_user(
    state: &AppState,
    payload: RegisterUser,
    role: Role,
) -> Result<User, AppError> {
    let mut user = User {
        id: None,
        name: payload.name.trim().to_string(),
        username: normalize_username(&payload.username)?,
        email: normalize_email(&payload.email),
        password: bcrypt::hash(&payload.password, BCRYPT_COST)?,
        role,
        is_active: true,
        last_login: None,
        created_at: DateTime::now(),
    };

    let inserted = state.db.collection::<User>(USERS).insert_one(&user).await?;
    user.id = inserted.inserted_id.as_object_id();

    Ok(user)
}

/// Bootstraps the very first admin; refused once any account exists.
async fn init_admin(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterUser>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let count = state
        .db
        .collection::<User>(USERS)
        .count_documents(doc! {})
        .await?;
    if count > 0 {
        return Err(AppError::Forbidden("Already initialized"));
    }

    let user = insert_user(&state, payload, Role::Admin).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "First admin created",
            "user": to_api_json(&PublicUser::from(&user))?,
        })),
    ))
}

#[derive(Deserialize)]
struct Login {
    username: Option<String>,
    email: Option<String>,
    password: String,
}

/// Blank identifiers count as absent: an empty username falls through to
/// email login, and neither is a 400.
fn login_query(username: Option<&str>, email: Option<&str>) -> Result<Document, AppError> {
    let username = username.map(str::trim).filter(|u| !u.is_empty());
    let email = email.map(str::trim).filter(|e| !e.is_empty());

    match (username, email) {
        (Some(username), _) => Ok(doc! { "username": username.to_lowercase(), "isActive": true }),
        (None, Some(email)) => Ok(doc! { "email": normalize_email(email), "isActive": true }),
        (None, None) => Err(AppError::BadRequest(
            "Username or email and password are required".into(),
        )),
    }
}

async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<Login>,
) -> Result<Json<Value>, AppError> {
    let query = login_query(payload.username.as_deref(), payload.email.as_deref())?;

    let collection = state.db.collection::<User>(USERS);
    let user = collection
        .find_one(query)
        .await?
        .ok_or(AppError::Unauthorized("Invalid credentials"))?;

    if !bcrypt::verify(&payload.password, &user.password)? {
        return Err(AppError::Unauthorized("Invalid credentials"));
    }

    collection
        .update_one(
            doc! { "_id": user.id },
            doc! { "$set": { "lastLogin": DateTime::now() } },
        )
        .await?;

    let session_user = session_user(&user);
    session.insert(USER_KEY, &session_user).await?;

    Ok(Json(json!({
        "message": "Logged in",
        "user": to_api_json(&session_user)?,
    })))
}

async fn register(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<RegisterUser>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    // Only an explicit admin/subuser-member request escapes the default role.
    let role = match payload.role {
        Some(Role::Admin) => Role::Admin,
        Some(Role::SubuserMember) => Role::SubuserMember,
        _ => Role::User,
    };

    let user = insert_user(&state, payload, role).await?;

    audit::record(
        &state.db,
        Some(&admin),
        "User",
        AuditAction::Create,
        user.id,
        Some(doc! {
            "name": &user.name,
            "username": &user.username,
            "email": &user.email,
            "role": user.role.as_str(),
        }),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User created",
            "user": to_api_json(&PublicUser::from(&user))?,
        })),
    ))
}

async fn logout(session: Session) -> Result<Json<Value>, AppError> {
    session.remove::<SessionUser>(USER_KEY).await?;

    Ok(Json(json!({ "message": "Logged out" })))
}

async fn me(MaybeUser(user): MaybeUser) -> Result<Json<Value>, AppError> {
    Ok(Json(json!({
        "authenticated": user.is_some(),
        "user": user.map(|u| to_api_json(&u)).transpose()?,
    })))
}

async fn list(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> Result<Json<Value>, AppError> {
    let users: Vec<User> = state
        .db
        .collection(USERS)
        .find(doc! {})
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;

    let users: Vec<PublicUser> = users.iter().map(PublicUser::from).collect();

    Ok(Json(to_api_json(&users)?))
}

#[derive(Deserialize)]
struct UpdateUser {
    name: Option<String>,
    username: Option<String>,
    role: Option<Role>,
    #[serde(rename = "isActive")]
    is_active: Option<bool>,
}

fn user_snapshot(user: &User) -> Document {
    doc! {
        "name": &user.name,
        "username": &user.username,
        "role": user.role.as_str(),
        "isActive": user.is_active,
    }
}

async fn update(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUser>,
) -> Result<Json<Value>, AppError> {
    let user_id = parse_id(&id)?;
    let collection = state.db.collection::<User>(USERS);

    let before = collection
        .find_one(doc! { "_id": user_id })
        .await?
        .ok_or(AppError::NotFound("User"))?;

    let mut set = doc! {};
    if let Some(name) = payload.name {
        set.insert("name", name.trim());
    }
    if let Some(username) = payload.username {
        set.insert("username", normalize_username(&username)?);
    }
    if let Some(role) = payload.role {
        set.insert("role", role.as_str());
    }
    if let Some(is_active) = payload.is_active {
        set.insert("isActive", is_active);
    }

    if set.is_empty() {
        return Ok(Json(json!({
            "message": "User updated",
            "user": to_api_json(&PublicUser::from(&before))?,
        })));
    }

    let updated = collection
        .find_one_and_update(doc! { "_id": user_id }, doc! { "$set": set })
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    audit::record(
        &state.db,
        Some(&admin),
        "User",
        AuditAction::Update,
        Some(user_id),
        Some(before_after(user_snapshot(&before), user_snapshot(&updated))),
    )
    .await;

    Ok(Json(json!({
        "message": "User updated",
        "user": to_api_json(&PublicUser::from(&updated))?,
    })))
}

#[derive(Deserialize)]
struct ChangePassword {
    #[serde(rename = "newPassword")]
    new_password: String,
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<ChangePassword>,
) -> Result<Json<Value>, AppError> {
    if payload.new_password.is_empty() {
        return Err(AppError::BadRequest("New password is required".into()));
    }

    let user_id = parse_id(&id)?;
    let collection = state.db.collection::<User>(USERS);

    let hash = bcrypt::hash(&payload.new_password, BCRYPT_COST)?;
    let updated = collection
        .update_one(
            doc! { "_id": user_id },
            doc! { "$set": { "password": hash } },
        )
        .await?;
    if updated.matched_count == 0 {
        return Err(AppError::NotFound("User"));
    }

    audit::record(
        &state.db,
        Some(&admin),
        "User",
        AuditAction::Update,
        Some(user_id),
        Some(doc! { "passwordChanged": true }),
    )
    .await;

    Ok(Json(json!({ "message": "Password changed" })))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let user_id = parse_id(&id)?;

    let before = state
        .db
        .collection::<User>(USERS)
        .find_one_and_delete(doc! { "_id": user_id })
        .await?
        .ok_or(AppError::NotFound("User"))?;

    audit::record(
        &state.db,
        Some(&admin),
        "User",
        AuditAction::Delete,
        Some(user_id),
        Some(doc! {
            "name": &before.name,
            "username": &before.username,
            "email": &before.email,
            "role": before.role.as_str(),
        }),
    )
    .await;

    Ok(Json(json!({ "message": "User deleted" })))
}

#[cfg(test)]
mod tests {
    use super::{login_query, normalize_email, normalize_username};

    #[test]
    fn test_username_normalized() {
        assert_eq!(normalize_username("  Staff.01  ").unwrap(), "staff.01");
        assert_eq!(normalize_username("a_b.c9").unwrap(), "a_b.c9");
    }

    #[test]
    fn test_username_rejected() {
        assert!(normalize_username("ab").is_err());
        assert!(normalize_username("has space").is_err());
        assert!(normalize_username("semi;colon").is_err());
        assert!(normalize_username(&"x".repeat(31)).is_err());
    }

    #[test]
    fn test_email_normalized() {
        assert_eq!(normalize_email(" Dean@Example.ORG "), "dean@example.org");
    }

    #[test]
    fn test_login_query_prefers_username() {
        let query = login_query(Some(" Staff.01 "), Some("dean@example.org")).unwrap();
        assert_eq!(query.get_str("username"), Ok("staff.01"));
        assert!(!query.contains_key("email"));
    }

    #[test]
    fn test_login_query_blank_username_uses_email() {
        let query = login_query(Some(""), Some(" Dean@Example.ORG ")).unwrap();
        assert_eq!(query.get_str("email"), Ok("dean@example.org"));
        assert!(!query.contains_key("username"));
    }

    #[test]
    fn test_login_query_requires_identifier() {
        assert!(login_query(None, None).is_err());
        assert!(login_query(Some("  "), Some("")).is_err());
    }
}
