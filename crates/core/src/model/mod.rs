mod course;
mod draft;
mod enrollment;
mod ids;
mod lesson_key;
mod principal;

pub use course::{Course, Lesson, Module};
pub use draft::{CATEGORIES, CourseDraft, CourseDraftError, LessonDraft, ModuleDraft, parse_tags};
pub use enrollment::{Enrollment, Progress, ProgressError};
pub use ids::{CourseId, EnrollmentId, LearnerId, LessonId, ParseIdError};
pub use lesson_key::{LessonKey, LessonKeyError};
pub use principal::{Principal, Role};
