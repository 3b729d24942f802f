use async_trait::async_trait;
use course_core::catalog::{CatalogQuery, CoursePage};
use course_core::model::{
    Course, CourseDraft, CourseId, Enrollment, LearnerId, LessonKey, Principal, Progress,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::CourseApi;
use crate::config::ApiConfig;
use crate::error::ApiError;

/// Which call failed; selects the fallback message and how ambiguous status
/// codes are classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Endpoint {
    Course,
    Catalog,
    Enrollments,
    Enroll,
    CompleteLesson,
    SaveCourse,
    DeleteCourse,
}

impl Endpoint {
    fn fallback_message(self) -> &'static str {
        match self {
            Endpoint::Course => "Failed to load course",
            Endpoint::Catalog => "Failed to load courses",
            Endpoint::Enrollments => "Failed to load enrolled courses",
            Endpoint::Enroll => "Enrollment failed",
            Endpoint::CompleteLesson => "Failed to mark lesson",
            Endpoint::SaveCourse => "Failed to save course",
            Endpoint::DeleteCourse => "Failed to delete course",
        }
    }
}

/// Maps a non-success response to an `ApiError`, keeping the server's
/// message when it sent one.
pub(crate) fn error_for_status(
    endpoint: Endpoint,
    status: StatusCode,
    message: Option<String>,
) -> ApiError {
    let message = message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| endpoint.fallback_message().to_string());
    let lower = message.to_lowercase();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized(message),
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        StatusCode::PAYMENT_REQUIRED => ApiError::PaymentRequired(message),
        StatusCode::CONFLICT if endpoint == Endpoint::Enroll => ApiError::AlreadyEnrolled(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => ApiError::Transient(message),
        s if s.is_server_error() => ApiError::Transient(message),
        StatusCode::BAD_REQUEST if endpoint == Endpoint::Enroll && lower.contains("already") => {
            ApiError::AlreadyEnrolled(message)
        }
        StatusCode::BAD_REQUEST
            if endpoint == Endpoint::Enroll
                && (lower.contains("payment") || lower.contains("purchase")) =>
        {
            ApiError::PaymentRequired(message)
        }
        StatusCode::BAD_REQUEST if endpoint == Endpoint::CompleteLesson => {
            ApiError::InvalidLesson(message)
        }
        _ => ApiError::Rejected(message),
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompleteLessonRequest {
    lesson_id: String,
}

#[derive(Debug, Deserialize)]
struct CompleteLessonResponse {
    progress: u32,
}

/// `CourseApi` over the REST surface of the course marketplace backend.
#[derive(Clone)]
pub struct HttpCourseApi {
    client: Client,
    config: ApiConfig,
}

impl HttpCourseApi {
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let url = self.config.endpoint(path);
        debug!(%method, %url, "course api request");
        let builder = self.client.request(method, url);
        match self.config.token.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, endpoint: Endpoint, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message);
        debug!(?endpoint, %status, "course api error response");
        Err(error_for_status(endpoint, status, message))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        builder: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.send(endpoint, builder).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl CourseApi for HttpCourseApi {
    async fn get_course(&self, id: &CourseId) -> Result<Course, ApiError> {
        let path = format!("courses/{id}");
        self.fetch(Endpoint::Course, self.request(reqwest::Method::GET, &path))
            .await
    }

    async fn list_courses(&self, query: &CatalogQuery) -> Result<CoursePage, ApiError> {
        let builder = self
            .request(reqwest::Method::GET, "courses")
            .query(&query.to_params());
        self.fetch(Endpoint::Catalog, builder).await
    }

    async fn list_enrollments(&self, _learner: &LearnerId) -> Result<Vec<Enrollment>, ApiError> {
        self.fetch(
            Endpoint::Enrollments,
            self.request(reqwest::Method::GET, "courses/my/enrolled"),
        )
        .await
    }

    async fn enroll(
        &self,
        learner: &LearnerId,
        course: &CourseId,
    ) -> Result<Enrollment, ApiError> {
        let path = format!("courses/{course}/enroll");
        self.send(Endpoint::Enroll, self.request(reqwest::Method::POST, &path))
            .await?;

        // The enroll response carries no embedded course; read it back from
        // the listing so callers get the same shape as `list_enrollments`.
        enrollment_after_enroll(self.list_enrollments(learner).await, course)
    }

    async fn complete_lesson(
        &self,
        _learner: &LearnerId,
        course: &CourseId,
        key: LessonKey,
    ) -> Result<Progress, ApiError> {
        let path = format!("courses/{course}/complete-lesson");
        let body = CompleteLessonRequest {
            lesson_id: key.to_string(),
        };
        let response: CompleteLessonResponse = self
            .fetch(
                Endpoint::CompleteLesson,
                self.request(reqwest::Method::POST, &path).json(&body),
            )
            .await?;
        Progress::new(response.progress).map_err(|e| ApiError::Domain(e.into()))
    }

    async fn create_course(
        &self,
        _principal: &Principal,
        draft: &CourseDraft,
    ) -> Result<Course, ApiError> {
        self.fetch(
            Endpoint::SaveCourse,
            self.request(reqwest::Method::POST, "courses").json(draft),
        )
        .await
    }

    async fn update_course(
        &self,
        _principal: &Principal,
        id: &CourseId,
        draft: &CourseDraft,
    ) -> Result<Course, ApiError> {
        let path = format!("courses/{id}");
        self.fetch(
            Endpoint::SaveCourse,
            self.request(reqwest::Method::PUT, &path).json(draft),
        )
        .await
    }

    async fn delete_course(&self, _principal: &Principal, id: &CourseId) -> Result<(), ApiError> {
        let path = format!("courses/{id}");
        self.send(
            Endpoint::DeleteCourse,
            self.request(reqwest::Method::DELETE, &path),
        )
        .await?;
        Ok(())
    }
}

/// Picks the new enrollment out of the post-enroll listing.
///
/// The enroll call already succeeded at this point, so any failure here is
/// reported as transient rather than as a refusal.
fn enrollment_after_enroll(
    listing: Result<Vec<Enrollment>, ApiError>,
    course: &CourseId,
) -> Result<Enrollment, ApiError> {
    let enrollments = listing.map_err(|e| {
        warn!(%course, error = %e, "enrollment created but listing failed");
        ApiError::Transient(format!(
            "Enrolled, but the enrollment could not be reloaded: {e}"
        ))
    })?;
    enrollments
        .into_iter()
        .find(|e| &e.course().id == course)
        .ok_or_else(|| ApiError::Transient("Enrollment is not visible yet".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn server_message_is_kept_verbatim() {
        let err = error_for_status(
            Endpoint::CompleteLesson,
            StatusCode::BAD_REQUEST,
            Some("Lesson does not belong to this course".into()),
        );
        assert!(matches!(err, ApiError::InvalidLesson(_)));
        assert_eq!(err.to_string(), "Lesson does not belong to this course");
    }

    #[test]
    fn missing_message_uses_endpoint_fallback() {
        let err = error_for_status(Endpoint::Enroll, StatusCode::BAD_REQUEST, None);
        assert_eq!(err.to_string(), "Enrollment failed");
        assert!(matches!(err, ApiError::Rejected(_)));
    }

    #[test]
    fn enroll_refusals_are_classified() {
        let dup = error_for_status(
            Endpoint::Enroll,
            StatusCode::BAD_REQUEST,
            Some("Already enrolled in this course".into()),
        );
        assert!(matches!(dup, ApiError::AlreadyEnrolled(_)));

        let pay = error_for_status(Endpoint::Enroll, StatusCode::PAYMENT_REQUIRED, None);
        assert!(matches!(pay, ApiError::PaymentRequired(_)));
    }

    #[test]
    fn status_classes_map_to_kinds() {
        let cases = [
            (StatusCode::NOT_FOUND, ErrorKind::NotFound),
            (StatusCode::UNAUTHORIZED, ErrorKind::ValidationFailure),
            (StatusCode::UNPROCESSABLE_ENTITY, ErrorKind::ValidationFailure),
            (StatusCode::BAD_GATEWAY, ErrorKind::TransientFailure),
            (StatusCode::TOO_MANY_REQUESTS, ErrorKind::TransientFailure),
        ];
        for (status, kind) in cases {
            assert_eq!(error_for_status(Endpoint::Course, status, None).kind(), kind);
        }
    }

    #[test]
    fn client_builds_from_default_config() {
        let api = HttpCourseApi::new(ApiConfig::default()).unwrap();
        assert_eq!(api.config().base_url, "http://localhost:5000/api");
    }

    #[test]
    fn listing_failure_after_enroll_is_transient() {
        let listing = Err(error_for_status(
            Endpoint::Enrollments,
            StatusCode::INTERNAL_SERVER_ERROR,
            None,
        ));
        let err = enrollment_after_enroll(listing, &CourseId::new("c1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransientFailure);
        assert!(err.to_string().starts_with("Enrolled, but"));

        let missing = enrollment_after_enroll(Ok(Vec::new()), &CourseId::new("c1")).unwrap_err();
        assert!(matches!(missing, ApiError::Transient(_)));
    }
}
