use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{Course, CourseQuery, CreateCourseRequest};
use crate::{error::AppError, state::AppState};

pub fn course_routes() -> Router<AppState> {
    Router::new()
        .route("/course", get(list_courses).post(create_course))
        .route("/course/:id", get(get_course))
}

#[instrument(skip(state))]
pub async fn list_courses(
    State(state): State<AppState>,
    Query(q): Query<CourseQuery>,
) -> Json<Vec<Course>> {
    Json(state.courses.list(q.name.as_deref()).await)
}

#[instrument(skip(state))]
pub async fn get_course(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<Course>, AppError> {
    let Path(id) = id?;
    state
        .courses
        .get(id)
        .await
        .map(Json)
        .ok_or(AppError::NotFound("course"))
}

#[instrument(skip(state, payload))]
pub async fn create_course(
    State(state): State<AppState>,
    payload: Result<Json<CreateCourseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    let Json(payload) = payload?;
    let course = state.courses.create(payload).await?;
    info!(course_id = course.id, title = %course.title, "course created");
    Ok((StatusCode::CREATED, Json(course)))
}
