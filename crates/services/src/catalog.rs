use std::sync::Arc;

use course_core::catalog::{CatalogQuery, CoursePage};
use course_core::model::CATEGORIES;

use crate::api::CourseApi;
use crate::error::ApiError;

/// Course browsing for the home page.
#[derive(Clone)]
pub struct CatalogService {
    api: Arc<dyn CourseApi>,
}

impl CatalogService {
    #[must_use]
    pub fn new(api: Arc<dyn CourseApi>) -> Self {
        Self { api }
    }

    /// # Errors
    ///
    /// Returns `ApiError` if the listing cannot be fetched.
    pub async fn browse(&self, query: &CatalogQuery) -> Result<CoursePage, ApiError> {
        self.api.list_courses(query).await
    }

    #[must_use]
    pub fn categories(&self) -> &'static [&'static str] {
        &CATEGORIES
    }
}
