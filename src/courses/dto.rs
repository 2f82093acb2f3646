use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub duration: String,
    pub price: u64,
    pub video_url: String,
    pub thumbnail_url: String,
    pub language: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub duration: String,
    #[serde(default)]
    pub price: u64,
    pub video_url: String,
    pub thumbnail_url: String,
    pub language: String,
}

impl CreateCourseRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let required = [
            ("title", &self.title),
            ("description", &self.description),
            ("instructor", &self.instructor),
            ("duration", &self.duration),
            ("language", &self.language),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{field} must not be empty")));
            }
        }
        let urls = [("videoUrl", &self.video_url), ("thumbnailUrl", &self.thumbnail_url)];
        for (field, value) in urls {
            if Url::parse(value).is_err() {
                return Err(AppError::Validation(format!("{field} must be a valid URL")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CourseQuery {
    pub name: Option<String>,
}
