use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::admin::AdminService;
use crate::api::{CourseApi, HttpCourseApi, LocalCourseApi};
use crate::catalog::CatalogService;
use crate::config::ApiConfig;
use crate::dashboard::DashboardService;
use crate::detail::CourseDetailService;
use crate::error::AppServicesError;
use crate::player::CoursePlayerService;

/// Assembles the view-facing services over one `CourseApi`.
#[derive(Clone)]
pub struct AppServices {
    catalog: CatalogService,
    detail: CourseDetailService,
    player: CoursePlayerService,
    dashboard: DashboardService,
    admin: AdminService,
}

impl AppServices {
    #[must_use]
    pub fn new(api: Arc<dyn CourseApi>) -> Self {
        Self {
            catalog: CatalogService::new(Arc::clone(&api)),
            detail: CourseDetailService::new(Arc::clone(&api)),
            player: CoursePlayerService::new(Arc::clone(&api)),
            dashboard: DashboardService::new(Arc::clone(&api)),
            admin: AdminService::new(api),
        }
    }

    /// Build services against the remote HTTP API.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the HTTP client cannot be built.
    pub fn remote(config: ApiConfig) -> Result<Self, AppServicesError> {
        let api: Arc<dyn CourseApi> = Arc::new(HttpCourseApi::new(config)?);
        Ok(Self::new(api))
    }

    /// Build services backed by the local owning service over `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::local(LocalCourseApi::new(clock, storage)))
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::local(LocalCourseApi::in_memory(clock))
    }

    fn local(api: LocalCourseApi) -> Self {
        let api: Arc<dyn CourseApi> = Arc::new(api);
        Self::new(api)
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    #[must_use]
    pub fn detail(&self) -> &CourseDetailService {
        &self.detail
    }

    #[must_use]
    pub fn player(&self) -> &CoursePlayerService {
        &self.player
    }

    #[must_use]
    pub fn dashboard(&self) -> &DashboardService {
        &self.dashboard
    }

    #[must_use]
    pub fn admin(&self) -> &AdminService {
        &self.admin
    }
}
