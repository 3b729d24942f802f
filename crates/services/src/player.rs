use std::sync::Arc;

use course_core::EnrollmentProgressTracker;
use course_core::model::{CourseId, LearnerId, LessonKey, Progress};
use tracing::{info, warn};

use crate::api::CourseApi;
use crate::error::PlayerError;

/// Loads course player state and forwards completions to the owning service.
#[derive(Clone)]
pub struct CoursePlayerService {
    api: Arc<dyn CourseApi>,
}

impl CoursePlayerService {
    #[must_use]
    pub fn new(api: Arc<dyn CourseApi>) -> Self {
        Self { api }
    }

    /// Fetches the course and the learner's enrollments concurrently and
    /// builds a tracker once both have arrived.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::Api` if either fetch fails, including
    /// `ApiError::NotFound` for an unknown course.
    pub async fn open(
        &self,
        learner: &LearnerId,
        course_id: &CourseId,
    ) -> Result<EnrollmentProgressTracker, PlayerError> {
        let (course, enrollments) = tokio::join!(
            self.api.get_course(course_id),
            self.api.list_enrollments(learner)
        );
        let course = course?;
        let enrollment = enrollments?
            .into_iter()
            .find(|e| &e.course().id == course_id);
        Ok(EnrollmentProgressTracker::new(course, enrollment))
    }

    /// Sends a completion for `key` and, once accepted, records it with the
    /// progress the service returned.
    ///
    /// Keys already complete are still sent. On failure the tracker is left
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::NotEnrolled` without contacting the service when
    /// the tracker has no enrollment, or `PlayerError::Api` with the
    /// service's message.
    pub async fn mark_complete(
        &self,
        tracker: &mut EnrollmentProgressTracker,
        key: LessonKey,
    ) -> Result<Progress, PlayerError> {
        let learner = tracker
            .enrollment()
            .map(|e| e.learner_id().clone())
            .ok_or(PlayerError::NotEnrolled)?;
        let course_id = tracker.course().id.clone();

        match self.api.complete_lesson(&learner, &course_id, key).await {
            Ok(progress) => {
                tracker.record_completion(key, progress);
                info!(course = %course_id, lesson = %key, %progress, "lesson marked complete");
                Ok(progress)
            }
            Err(e) => {
                warn!(course = %course_id, lesson = %key, error = %e, "mark complete rejected");
                Err(e.into())
            }
        }
    }

    /// `mark_complete` for the currently selected lesson.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::NoLessonSelected` or `PlayerError::UnknownLesson`
    /// when no key can be derived, otherwise as `mark_complete`.
    pub async fn mark_selected_complete(
        &self,
        tracker: &mut EnrollmentProgressTracker,
    ) -> Result<Progress, PlayerError> {
        let lesson = tracker
            .selected_lesson()
            .ok_or(PlayerError::NoLessonSelected)?;
        let key = tracker
            .compute_lesson_key(lesson)
            .ok_or(PlayerError::UnknownLesson)?;
        self.mark_complete(tracker, key).await
    }
}
