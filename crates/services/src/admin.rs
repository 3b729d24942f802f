use std::sync::Arc;

use course_core::catalog::CatalogQuery;
use course_core::model::{Course, CourseDraft, CourseId, Principal};
use tracing::info;

use crate::api::CourseApi;
use crate::error::{AdminError, ApiError};

/// Courses fetched for the admin dashboard.
pub const OVERVIEW_LIMIT: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct AdminOverview {
    pub courses: Vec<Course>,
    pub total_courses: usize,
    pub total_enrollments: u64,
}

impl AdminOverview {
    #[must_use]
    pub fn from_courses(courses: Vec<Course>) -> Self {
        let total_enrollments = courses.iter().map(|c| c.total_enrollments).sum();
        Self {
            total_courses: courses.len(),
            total_enrollments,
            courses,
        }
    }
}

/// Course authoring. Every call requires an admin principal.
#[derive(Clone)]
pub struct AdminService {
    api: Arc<dyn CourseApi>,
}

impl AdminService {
    #[must_use]
    pub fn new(api: Arc<dyn CourseApi>) -> Self {
        Self { api }
    }

    fn require_admin(principal: &Principal) -> Result<(), AdminError> {
        if principal.is_admin() {
            Ok(())
        } else {
            Err(AdminError::Forbidden)
        }
    }

    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` for non-admins, `AdminError::Api`
    /// otherwise.
    pub async fn overview(&self, principal: &Principal) -> Result<AdminOverview, AdminError> {
        Self::require_admin(principal)?;
        let query = CatalogQuery {
            limit: OVERVIEW_LIMIT,
            ..CatalogQuery::default()
        };
        let page = self.api.list_courses(&query).await?;
        Ok(AdminOverview::from_courses(page.courses))
    }

    /// Prefilled form for editing an existing course.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` for non-admins, `AdminError::Api`
    /// otherwise.
    pub async fn edit_draft(
        &self,
        principal: &Principal,
        id: &CourseId,
    ) -> Result<CourseDraft, AdminError> {
        Self::require_admin(principal)?;
        let course = self.api.get_course(id).await?;
        Ok(CourseDraft::from_course(&course))
    }

    /// Validates `draft` locally, then creates the course.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` for non-admins, `AdminError::Api`
    /// for invalid drafts or service failures.
    pub async fn create_course(
        &self,
        principal: &Principal,
        draft: &CourseDraft,
    ) -> Result<Course, AdminError> {
        Self::require_admin(principal)?;
        draft.validate().map_err(ApiError::from)?;
        let course = self.api.create_course(principal, draft).await?;
        info!(course = %course.id, "course published");
        Ok(course)
    }

    /// # Errors
    ///
    /// As `create_course`, plus `ApiError::NotFound` for unknown ids.
    pub async fn update_course(
        &self,
        principal: &Principal,
        id: &CourseId,
        draft: &CourseDraft,
    ) -> Result<Course, AdminError> {
        Self::require_admin(principal)?;
        draft.validate().map_err(ApiError::from)?;
        Ok(self.api.update_course(principal, id, draft).await?)
    }

    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` for non-admins, `AdminError::Api`
    /// otherwise.
    pub async fn delete_course(&self, principal: &Principal, id: &CourseId) -> Result<(), AdminError> {
        Self::require_admin(principal)?;
        self.api.delete_course(principal, id).await?;
        info!(course = %id, "course removed");
        Ok(())
    }
}
