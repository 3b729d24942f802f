//! Domain model for course enrollment and lesson progress tracking.

#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod model;
pub mod progress;
pub mod remap;
pub mod time;
pub mod tracker;

pub use error::Error;
pub use time::Clock;
pub use tracker::{EnrollmentProgressTracker, LessonOutline, ModuleOutline, compute_lesson_key};
