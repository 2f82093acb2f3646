use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::dto::{Course, CreateCourseRequest};
use crate::error::AppError;

/// In-memory course list. Contents do not survive a restart.
#[derive(Clone, Default)]
pub struct CourseCatalog {
    courses: Arc<RwLock<Vec<Course>>>,
}

impl CourseCatalog {
    pub fn seeded() -> Self {
        let now = OffsetDateTime::now_utc();
        let sample = Course {
            id: 1,
            title: "React Basics".into(),
            description: "Learn React".into(),
            instructor: "Shanu".into(),
            duration: "6 weeks".into(),
            price: 4999,
            video_url: String::new(),
            thumbnail_url: String::new(),
            language: "English".into(),
            created_at: now,
            updated_at: now,
        };
        Self {
            courses: Arc::new(RwLock::new(vec![sample])),
        }
    }

    /// All courses, or those whose title contains `name` (case-insensitive).
    pub async fn list(&self, name: Option<&str>) -> Vec<Course> {
        let courses = self.courses.read().await;
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => {
                let needle = name.to_lowercase();
                courses
                    .iter()
                    .filter(|c| c.title.to_lowercase().contains(&needle))
                    .cloned()
                    .collect()
            }
            None => courses.clone(),
        }
    }

    pub async fn get(&self, id: u64) -> Option<Course> {
        self.courses.read().await.iter().find(|c| c.id == id).cloned()
    }

    pub async fn create(&self, req: CreateCourseRequest) -> Result<Course, AppError> {
        req.validate()?;
        let mut courses = self.courses.write().await;
        let id = courses.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        let now = OffsetDateTime::now_utc();
        let course = Course {
            id,
            title: req.title.trim().to_string(),
            description: req.description,
            instructor: req.instructor,
            duration: req.duration,
            price: req.price,
            video_url: req.video_url,
            thumbnail_url: req.thumbnail_url,
            language: req.language,
            created_at: now,
            updated_at: now,
        };
        courses.push(course.clone());
        Ok(course)
    }
}
