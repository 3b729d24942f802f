use std::sync::Arc;

use course_core::model::{CourseId, Enrollment, LearnerId, Progress};

use crate::api::CourseApi;
use crate::error::ApiError;

/// One enrolled course on the learner dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardEntry {
    pub course_id: CourseId,
    pub title: String,
    pub instructor: String,
    pub thumbnail: String,
    pub progress: Progress,
    pub completed_lessons: usize,
    pub total_lessons: usize,
}

impl DashboardEntry {
    fn from_enrollment(enrollment: &Enrollment) -> Self {
        let course = enrollment.course();
        let completed_lessons = enrollment
            .completed_lessons()
            .iter()
            .filter(|key| course.lesson_at(**key).is_some())
            .count();
        Self {
            course_id: course.id.clone(),
            title: course.title.clone(),
            instructor: course.instructor.clone(),
            thumbnail: course.thumbnail.clone(),
            progress: enrollment.progress(),
            completed_lessons,
            total_lessons: course.total_lessons(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dashboard {
    pub entries: Vec<DashboardEntry>,
}

impl Dashboard {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mean of the service-reported progress values, rounded half up.
    #[must_use]
    pub fn average_progress(&self) -> Progress {
        if self.entries.is_empty() {
            return Progress::ZERO;
        }
        let n = u32::try_from(self.entries.len()).unwrap_or(u32::MAX);
        let sum: u32 = self
            .entries
            .iter()
            .map(|e| u32::from(e.progress.percent()))
            .sum();
        Progress::new((sum + n / 2) / n).unwrap_or(Progress::COMPLETE)
    }

    #[must_use]
    pub fn completed_courses(&self) -> usize {
        self.entries.iter().filter(|e| e.progress.is_complete()).count()
    }
}

/// Read-only aggregate over a learner's enrollments.
#[derive(Clone)]
pub struct DashboardService {
    api: Arc<dyn CourseApi>,
}

impl DashboardService {
    #[must_use]
    pub fn new(api: Arc<dyn CourseApi>) -> Self {
        Self { api }
    }

    /// # Errors
    ///
    /// Returns `ApiError` if the enrollments cannot be fetched.
    pub async fn load(&self, learner: &LearnerId) -> Result<Dashboard, ApiError> {
        let enrollments = self.api.list_enrollments(learner).await?;
        Ok(Dashboard {
            entries: enrollments.iter().map(DashboardEntry::from_enrollment).collect(),
        })
    }
}
