use thiserror::Error;

use crate::model::{CourseDraftError, LessonKeyError, ProgressError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    LessonKey(#[from] LessonKeyError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Draft(#[from] CourseDraftError),
}
