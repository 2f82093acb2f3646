pub mod dto;
pub mod handlers;
mod repo;

pub use repo::CourseCatalog;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::course_routes()
}
