//! Session-based auth shared by both subsystems.
//!
//! The video dashboard stores one boolean flag per unlocked section; the
//! committee system stores the logged-in user. Handlers opt into a guard by
//! taking one of the extractors below as an argument.
use axum::{extract::FromRequestParts, http::request::Parts};
use bson::{doc, oid::ObjectId};
use mongodb::Database;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::{
    database::ASSIGNMENTS,
    error::AppError,
    models::{Assignment, Role},
};

pub const USER_KEY: &str = "user";

pub fn section_key(section: &str) -> String {
    format!("section:{section}")
}

/// Fingerprint of the logged-in committee user kept in the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub username: String,
    pub role: Role,
}

/// Rejects with 401 unless a committee user is logged in.
pub struct CurrentUser(pub SessionUser);

/// Rejects with 401/403 unless the logged-in user is an admin.
pub struct AdminUser(pub SessionUser);

/// Never rejects; carries the user when one is logged in.
pub struct MaybeUser(pub Option<SessionUser>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let MaybeUser(user) = MaybeUser::from_request_parts(parts, state).await?;

        user.map(CurrentUser).ok_or_else(AppError::login_required)
    }
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if user.role != Role::Admin {
            return Err(AppError::insufficient_role());
        }

        Ok(AdminUser(user))
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts, state).await?;
        let user = session.get::<SessionUser>(USER_KEY).await?;

        Ok(MaybeUser(user))
    }
}

async fn session_from_parts<S: Send + Sync>(
    parts: &mut Parts,
    state: &S,
) -> Result<Session, AppError> {
    Session::from_request_parts(parts, state)
        .await
        .map_err(|(_, message)| AppError::BadRequest(message.to_string()))
}

/// Subuser-members only operate on (college, committee) pairs assigned to
/// them; admins and regular users are unrestricted.
pub async fn ensure_pair_allowed(
    db: &Database,
    user: &SessionUser,
    college: &str,
    committee_name: &str,
) -> Result<(), AppError> {
    if user.role != Role::SubuserMember {
        return Ok(());
    }

    let user_id =
        ObjectId::parse_str(&user.id).map_err(|_| AppError::insufficient_role())?;

    let assignment = db
        .collection::<Assignment>(ASSIGNMENTS)
        .find_one(doc! {
            "userId": user_id,
            "college": college,
            "committee_name": committee_name,
        })
        .await?;

    match assignment {
        Some(_) => Ok(()),
        None => Err(AppError::Forbidden(
            "Forbidden: committee not assigned to this user",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::section_key;

    #[test]
    fn test_section_key_shape() {
        assert_eq!(section_key("dashboard"), "section:dashboard");
        assert_eq!(section_key("links"), "section:links");
    }
}
