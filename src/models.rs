//! Document models, one struct per collection.
//!
//! Field names on the wire match the stored documents (mixed camelCase and
//! snake_case, inherited from the frontend contract). `_id` is generated by
//! MongoDB, so it is skipped on insert when `None`.
use bson::{oid::ObjectId, DateTime, Document};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Admin,
    User,
    SubuserMember,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::SubuserMember => "subuser-member",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Video {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub url: String,
    pub department: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "dateAdded")]
    pub date_added: DateTime,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub link: String,
    #[serde(rename = "linkText")]
    pub link_text: String,
    #[serde(rename = "requiresPassword", default)]
    pub requires_password: bool,
    #[serde(rename = "dateAdded")]
    pub date_added: DateTime,
    #[serde(default)]
    pub order: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SectionPassword {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub section: String,
    pub password: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Department {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
}

/// Whole-collection snapshot of the video subsystem. The arrays hold raw
/// documents so restore can bulk-insert them untouched.
#[derive(Debug, Serialize, Deserialize)]
pub struct Backup {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub date: DateTime,
    #[serde(default)]
    pub videos: Vec<Document>,
    #[serde(default)]
    pub links: Vec<Document>,
    #[serde(default)]
    pub passwords: Vec<Document>,
    #[serde(default)]
    pub departments: Vec<Document>,
    #[serde(default)]
    pub colleges: Vec<Document>,
}

/// Shared shape of the name dictionaries (colleges, committees, auditors).
#[derive(Debug, Serialize, Deserialize)]
pub struct NamedEntry {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub college: String,
    pub committee_name: String,

    #[serde(default)]
    pub formation_decision: i32,
    #[serde(default)]
    pub work_plan: i32,
    #[serde(default)]
    pub performance_indicators: i32,
    #[serde(default)]
    pub meetings: i32,
    #[serde(default)]
    pub consistency: i32,
    #[serde(default)]
    pub coverage_books: i32,
    #[serde(default)]
    pub report1: i32,
    #[serde(default)]
    pub report2: i32,
    #[serde(default)]
    pub report3: i32,
    #[serde(default)]
    pub statistical_analysis: i32,
    #[serde(default)]
    pub availability_score: i32,

    /// HTML fragment rendered by the dashboard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_date: Option<DateTime>,
    pub auditor_name: String,

    #[serde(default)]
    pub term: String,
    #[serde(rename = "academicYear", default)]
    pub academic_year: String,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime,
}

/// Singleton controlling which evaluation columns/visits the public dashboard
/// shows, plus the term/year autofilled into new evaluations.
#[derive(Debug, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "visibleColumns", default)]
    pub visible_columns: Vec<String>,
    #[serde(rename = "selectedVisits", default)]
    pub selected_visits: Vec<String>,
    #[serde(rename = "currentTerm", skip_serializing_if = "Option::is_none")]
    pub current_term: Option<String>,
    #[serde(rename = "currentAcademicYear", skip_serializing_if = "Option::is_none")]
    pub current_academic_year: Option<String>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub username: String,
    pub email: String,
    /// bcrypt hash, never serialized into responses (see `PublicUser`).
    pub password: String,
    pub role: Role,
    #[serde(rename = "isActive", default = "default_true")]
    pub is_active: bool,
    #[serde(rename = "lastLogin", skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime,
}

/// Response-safe projection of [`User`].
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: user.name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "userId")]
    pub user_id: ObjectId,
    pub college: String,
    pub committee_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub college: String,
    pub committee_name: String,
    #[serde(rename = "academicYear")]
    pub academic_year: String,
    pub term: String,
    #[serde(rename = "fileUrl")]
    pub file_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(rename = "uploadedBy", skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::Role;

    #[test]
    fn test_role_wire_names() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::SubuserMember).unwrap(),
            "\"subuser-member\""
        );
    }

    #[test]
    fn test_role_round_trip() {
        let role: Role = serde_json::from_str("\"subuser-member\"").unwrap();
        assert_eq!(role, Role::SubuserMember);
        assert_eq!(role.as_str(), "subuser-member");
    }

    #[test]
    fn test_user_defaults_active() {
        let user: super::User = serde_json::from_value(serde_json::json!({
            "name": "n",
            "username": "u",
            "email": "e@x",
            "password": "h",
            "role": "user",
            "createdAt": bson::DateTime::now(),
        }))
        .unwrap();

        assert!(user.is_active);
    }
}
