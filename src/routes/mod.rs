use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

pub mod assignments;
pub mod audit_logs;
pub mod auditors;
pub mod backups;
pub mod catalog;
pub mod colleges;
pub mod committees;
pub mod departments;
pub mod evaluations;
pub mod files;
pub mod links;
pub mod sections;
pub mod settings;
pub mod users;
pub mod videos;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(sections::router())
        .merge(departments::router())
        .merge(videos::router())
        .merge(links::router())
        .merge(backups::router())
        .merge(users::router())
        .merge(evaluations::router())
        .merge(colleges::router())
        .merge(committees::router())
        .merge(auditors::router())
        .merge(settings::router())
        .merge(audit_logs::router())
        .merge(assignments::router())
        .merge(files::router())
}
