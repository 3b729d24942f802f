#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use course_core::catalog::{CatalogQuery, CoursePage};
use course_core::model::{
    Course, CourseDraft, CourseId, Enrollment, EnrollmentId, LearnerId, Lesson, LessonKey, Module,
    Principal, Progress,
};
use services::{ApiError, CourseApi};

/// Two modules: one lesson, then two lessons.
pub fn two_module_course(id: &str) -> Course {
    Course::new(
        id,
        "Two Modules",
        vec![
            Module::new("Intro", 1, vec![Lesson::new("l-a", "Welcome", 1)]),
            Module::new(
                "Main",
                2,
                vec![Lesson::new("l-b", "First", 1), Lesson::new("l-c", "Second", 2)],
            ),
        ],
    )
}

pub fn empty_enrollment(learner: &str, course: Course) -> Enrollment {
    Enrollment::new(
        EnrollmentId::new(format!("e-{learner}")),
        LearnerId::new(learner),
        course,
        None,
    )
}

/// Scripted owning service: returns canned responses and records calls.
#[derive(Default)]
pub struct ScriptedApi {
    pub courses: Vec<Course>,
    pub enrollments: Mutex<Vec<Enrollment>>,
    pub enrollments_error: Option<String>,
    pub enroll_error: Option<String>,
    pub completion_replies: Mutex<Vec<Result<u32, String>>>,
    pub completion_calls: Mutex<Vec<LessonKey>>,
}

impl ScriptedApi {
    pub fn completion_calls(&self) -> Vec<LessonKey> {
        self.completion_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CourseApi for ScriptedApi {
    async fn get_course(&self, id: &CourseId) -> Result<Course, ApiError> {
        self.courses
            .iter()
            .find(|c| &c.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("Course not found".into()))
    }

    async fn list_courses(&self, query: &CatalogQuery) -> Result<CoursePage, ApiError> {
        Ok(query.apply(self.courses.clone()))
    }

    async fn list_enrollments(&self, _learner: &LearnerId) -> Result<Vec<Enrollment>, ApiError> {
        if let Some(message) = &self.enrollments_error {
            return Err(ApiError::Transient(message.clone()));
        }
        Ok(self.enrollments.lock().unwrap().clone())
    }

    async fn enroll(
        &self,
        learner: &LearnerId,
        course: &CourseId,
    ) -> Result<Enrollment, ApiError> {
        if let Some(message) = &self.enroll_error {
            return Err(ApiError::Transient(message.clone()));
        }
        let course = self.get_course(course).await?;
        let mut enrollments = self.enrollments.lock().unwrap();
        if enrollments.iter().any(|e| e.course().id == course.id) {
            return Err(ApiError::AlreadyEnrolled("Already enrolled".into()));
        }
        let enrollment = empty_enrollment(learner.as_str(), course);
        enrollments.push(enrollment.clone());
        Ok(enrollment)
    }

    async fn complete_lesson(
        &self,
        _learner: &LearnerId,
        _course: &CourseId,
        key: LessonKey,
    ) -> Result<Progress, ApiError> {
        self.completion_calls.lock().unwrap().push(key);
        let mut replies = self.completion_replies.lock().unwrap();
        let reply = if replies.is_empty() {
            Ok(0)
        } else {
            replies.remove(0)
        };
        match reply {
            Ok(percent) => Ok(Progress::new(percent).unwrap()),
            Err(message) => Err(ApiError::Rejected(message)),
        }
    }

    async fn create_course(
        &self,
        _principal: &Principal,
        _draft: &CourseDraft,
    ) -> Result<Course, ApiError> {
        Err(ApiError::Rejected("read-only".into()))
    }

    async fn update_course(
        &self,
        _principal: &Principal,
        _id: &CourseId,
        _draft: &CourseDraft,
    ) -> Result<Course, ApiError> {
        Err(ApiError::Rejected("read-only".into()))
    }

    async fn delete_course(&self, _principal: &Principal, _id: &CourseId) -> Result<(), ApiError> {
        Err(ApiError::Rejected("read-only".into()))
    }
}
