use std::sync::Arc;

use course_core::model::{Course, CourseId, Enrollment, Principal};
use tracing::{info, warn};

use crate::api::CourseApi;
use crate::error::{ApiError, DetailError, ErrorKind};

/// What the detail view knows about the viewer's enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentStatus {
    /// Status not fetched, or the fetch failed.
    Unknown,
    Anonymous,
    Enrolled,
    NotEnrolled,
}

/// The call to action on the course detail page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryAction {
    GoToCourse,
    Enroll,
    SignIn,
}

#[derive(Debug, Clone)]
pub struct CourseDetail {
    pub course: Course,
    pub status: EnrollmentStatus,
}

impl CourseDetail {
    #[must_use]
    pub fn is_enrolled(&self) -> bool {
        self.status == EnrollmentStatus::Enrolled
    }

    /// `None` while enrollment status is unknown; never assumes the viewer
    /// is not enrolled.
    #[must_use]
    pub fn primary_action(&self) -> Option<PrimaryAction> {
        match self.status {
            EnrollmentStatus::Enrolled => Some(PrimaryAction::GoToCourse),
            EnrollmentStatus::NotEnrolled => Some(PrimaryAction::Enroll),
            EnrollmentStatus::Anonymous => Some(PrimaryAction::SignIn),
            EnrollmentStatus::Unknown => None,
        }
    }
}

/// Course detail page: course data plus the enrolled gate.
#[derive(Clone)]
pub struct CourseDetailService {
    api: Arc<dyn CourseApi>,
}

impl CourseDetailService {
    #[must_use]
    pub fn new(api: Arc<dyn CourseApi>) -> Self {
        Self { api }
    }

    /// Loads the course and, for signed-in viewers, whether they are
    /// enrolled. A failed enrollment lookup leaves the status unknown.
    ///
    /// # Errors
    ///
    /// Returns `DetailError::Api` if the course cannot be fetched.
    pub async fn load(
        &self,
        principal: Option<&Principal>,
        course_id: &CourseId,
    ) -> Result<CourseDetail, DetailError> {
        let Some(principal) = principal else {
            let course = self.api.get_course(course_id).await?;
            return Ok(CourseDetail {
                course,
                status: EnrollmentStatus::Anonymous,
            });
        };

        let (course, enrollments) = tokio::join!(
            self.api.get_course(course_id),
            self.api.list_enrollments(&principal.learner_id)
        );
        let course = course?;
        let status = match enrollments {
            Ok(list) if list.iter().any(|e| &e.course().id == course_id) => {
                EnrollmentStatus::Enrolled
            }
            Ok(_) => EnrollmentStatus::NotEnrolled,
            Err(e) => {
                warn!(course = %course_id, error = %e, "enrollment status unavailable");
                EnrollmentStatus::Unknown
            }
        };
        Ok(CourseDetail { course, status })
    }

    /// Enrolls the viewer in `detail.course` and flips the gate on success.
    ///
    /// A refusal because the viewer is already enrolled also flips the gate;
    /// a transient failure resets it to unknown.
    ///
    /// # Errors
    ///
    /// Returns `DetailError::SignInRequired` for anonymous viewers and
    /// `DetailError::Api` carrying the service's refusal otherwise.
    pub async fn enroll(
        &self,
        principal: Option<&Principal>,
        detail: &mut CourseDetail,
    ) -> Result<Enrollment, DetailError> {
        let principal = principal.ok_or(DetailError::SignInRequired)?;
        let enrollment = match self
            .api
            .enroll(&principal.learner_id, &detail.course.id)
            .await
        {
            Ok(enrollment) => enrollment,
            Err(e) => {
                // The service may have recorded the enrollment even though the
                // call failed; never leave an Enroll button that would bounce.
                match e {
                    ApiError::AlreadyEnrolled(_) => detail.status = EnrollmentStatus::Enrolled,
                    _ if e.kind() == ErrorKind::TransientFailure => {
                        detail.status = EnrollmentStatus::Unknown;
                    }
                    _ => {}
                }
                return Err(e.into());
            }
        };
        detail.status = EnrollmentStatus::Enrolled;
        info!(course = %detail.course.id, learner = %principal.learner_id, "enrolled from detail page");
        Ok(enrollment)
    }
}
