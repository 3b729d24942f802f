//! Boundary to the owning course service.

use async_trait::async_trait;
use course_core::catalog::{CatalogQuery, CoursePage};
use course_core::model::{
    Course, CourseDraft, CourseId, Enrollment, LearnerId, LessonKey, Principal, Progress,
};

use crate::error::ApiError;

mod http;
mod local;

pub use http::HttpCourseApi;
pub use local::LocalCourseApi;

/// Operations the client needs from the service that stores courses and
/// enrollments and computes progress.
///
/// The HTTP implementation identifies the learner by its bearer token and
/// ignores `learner` arguments; the local backend uses them directly.
#[async_trait]
pub trait CourseApi: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` when the course does not exist.
    async fn get_course(&self, id: &CourseId) -> Result<Course, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` when the listing cannot be fetched.
    async fn list_courses(&self, query: &CatalogQuery) -> Result<CoursePage, ApiError>;

    /// Every enrollment of `learner`, each with its course embedded.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` when the listing cannot be fetched.
    async fn list_enrollments(&self, learner: &LearnerId) -> Result<Vec<Enrollment>, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError::AlreadyEnrolled` or `ApiError::PaymentRequired` when
    /// the service refuses the enrollment.
    async fn enroll(&self, learner: &LearnerId, course: &CourseId)
    -> Result<Enrollment, ApiError>;

    /// Records `key` as complete and returns the recomputed progress.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidLesson` when `key` does not address a lesson
    /// of the stored course.
    async fn complete_lesson(
        &self,
        learner: &LearnerId,
        course: &CourseId,
        key: LessonKey,
    ) -> Result<Progress, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for non-admin principals and
    /// `ApiError::Domain` for drafts that do not validate.
    async fn create_course(
        &self,
        principal: &Principal,
        draft: &CourseDraft,
    ) -> Result<Course, ApiError>;

    /// # Errors
    ///
    /// Same as `create_course`, plus `ApiError::NotFound`.
    async fn update_course(
        &self,
        principal: &Principal,
        id: &CourseId,
        draft: &CourseDraft,
    ) -> Result<Course, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` or `ApiError::NotFound`.
    async fn delete_course(&self, principal: &Principal, id: &CourseId) -> Result<(), ApiError>;
}
