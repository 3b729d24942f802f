//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Coarse classification used by callers to decide how to present a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    ValidationFailure,
    TransientFailure,
}

impl ErrorKind {
    /// Transient failures may succeed when the same request is repeated.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::TransientFailure)
    }
}

/// Errors returned by a `CourseApi` implementation.
///
/// Variants carrying a `String` hold the owning service's message verbatim so
/// it can be shown to the learner unchanged.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    AlreadyEnrolled(String),
    #[error("{0}")]
    PaymentRequired(String),
    #[error("{0}")]
    InvalidLesson(String),
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Transient(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Domain(#[from] course_core::Error),
}

impl ApiError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::NotFound(_) | ApiError::Storage(StorageError::NotFound) => {
                ErrorKind::NotFound
            }
            ApiError::AlreadyEnrolled(_)
            | ApiError::PaymentRequired(_)
            | ApiError::InvalidLesson(_)
            | ApiError::Rejected(_)
            | ApiError::Unauthorized(_)
            | ApiError::Domain(_)
            | ApiError::Storage(StorageError::Conflict) => ErrorKind::ValidationFailure,
            ApiError::Http(e) if e.is_decode() => ErrorKind::ValidationFailure,
            _ => ErrorKind::TransientFailure,
        }
    }
}

impl From<course_core::model::CourseDraftError> for ApiError {
    fn from(e: course_core::model::CourseDraftError) -> Self {
        ApiError::Domain(e.into())
    }
}

/// Errors emitted by `CoursePlayerService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlayerError {
    #[error("enroll in this course to track progress")]
    NotEnrolled,
    #[error("no lesson selected")]
    NoLessonSelected,
    #[error("lesson is not part of this course")]
    UnknownLesson,
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl PlayerError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlayerError::Api(e) => e.kind(),
            _ => ErrorKind::ValidationFailure,
        }
    }
}

/// Errors emitted by `CourseDetailService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DetailError {
    #[error("sign in to enroll")]
    SignInRequired,
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl DetailError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            DetailError::SignInRequired => ErrorKind::ValidationFailure,
            DetailError::Api(e) => e.kind(),
        }
    }
}

/// Errors emitted by `AdminService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdminError {
    #[error("admin access required")]
    Forbidden,
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AdminError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdminError::Forbidden => ErrorKind::ValidationFailure,
            AdminError::Api(e) => e.kind(),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(ApiError::Transient("down".into()).kind().is_retryable());
        assert!(!ApiError::NotFound("gone".into()).kind().is_retryable());
        assert!(!ApiError::AlreadyEnrolled("dup".into()).kind().is_retryable());
        assert!(
            ApiError::Storage(StorageError::Connection("closed".into()))
                .kind()
                .is_retryable()
        );
    }

    #[test]
    fn service_message_is_shown_verbatim() {
        let err = PlayerError::from(ApiError::InvalidLesson("Lesson 9-9 not found".into()));
        assert_eq!(err.to_string(), "Lesson 9-9 not found");
        assert_eq!(err.kind(), ErrorKind::ValidationFailure);
    }

    #[test]
    fn storage_not_found_classifies_as_not_found() {
        assert_eq!(
            ApiError::Storage(StorageError::NotFound).kind(),
            ErrorKind::NotFound
        );
    }
}
