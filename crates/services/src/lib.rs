#![forbid(unsafe_code)]

pub mod admin;
pub mod api;
pub mod app_services;
pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod detail;
pub mod error;
pub mod player;

pub use course_core::Clock;

pub use admin::{AdminOverview, AdminService};
pub use api::{CourseApi, HttpCourseApi, LocalCourseApi};
pub use app_services::AppServices;
pub use catalog::CatalogService;
pub use config::ApiConfig;
pub use dashboard::{Dashboard, DashboardEntry, DashboardService};
pub use detail::{CourseDetail, CourseDetailService, EnrollmentStatus, PrimaryAction};
pub use error::{AdminError, ApiError, AppServicesError, DetailError, ErrorKind, PlayerError};
pub use player::CoursePlayerService;
