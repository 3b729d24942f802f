use async_trait::async_trait;
use course_core::Clock;
use course_core::catalog::{CatalogQuery, CoursePage};
use course_core::model::{
    Course, CourseDraft, CourseId, Enrollment, EnrollmentId, LearnerId, LessonKey, Principal,
    Progress,
};
use course_core::progress::compute_progress;
use course_core::remap::remap_completions;
use storage::repository::{CompletionRewrite, EnrollmentRecord, Storage, StorageError};
use tracing::{debug, info, warn};

use super::CourseApi;
use crate::error::ApiError;

const COURSE_NOT_FOUND: &str = "Course not found";

/// Reference owning service over `Storage`.
///
/// Enforces the server-side rules: one enrollment per learner and course,
/// lesson keys must resolve against the stored course, progress is computed
/// here on every completion, and course edits remap stored completions.
#[derive(Clone)]
pub struct LocalCourseApi {
    clock: Clock,
    storage: Storage,
}

impl LocalCourseApi {
    #[must_use]
    pub fn new(clock: Clock, storage: Storage) -> Self {
        Self { clock, storage }
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::new(clock, Storage::in_memory())
    }

    async fn with_total(&self, mut course: Course) -> Result<Course, ApiError> {
        course.total_enrollments = self.storage.enrollments.count_for_course(&course.id).await?;
        Ok(course)
    }

    async fn load_course(&self, id: &CourseId) -> Result<Course, ApiError> {
        let course = self
            .storage
            .courses
            .get_course(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(COURSE_NOT_FOUND.into()))?;
        self.with_total(course).await
    }

    fn require_admin(principal: &Principal) -> Result<(), ApiError> {
        if principal.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Unauthorized("Admin access required".into()))
        }
    }

    /// Translates every enrollment of `after.id` onto the edited tree,
    /// returning only the enrollments whose stored state changes.
    async fn remap_enrollments(
        &self,
        before: &Course,
        after: &Course,
    ) -> Result<Vec<CompletionRewrite>, ApiError> {
        let mut rewrites = Vec::new();
        for record in self.storage.enrollments.list_for_course(&after.id).await? {
            let report = remap_completions(before, after, &record.completed);
            let progress = compute_progress(after, &report.completed);
            if report.is_unchanged() && progress == record.progress {
                continue;
            }
            for (old, new) in &report.moved {
                debug!(enrollment = %record.id, %old, %new, "completion moved");
            }
            if !report.dropped.is_empty() {
                warn!(
                    enrollment = %record.id,
                    dropped = report.dropped.len(),
                    "completions dropped by course edit"
                );
            }
            rewrites.push(CompletionRewrite {
                enrollment_id: record.id,
                completed: report.completed,
                progress,
            });
        }
        Ok(rewrites)
    }
}

#[async_trait]
impl CourseApi for LocalCourseApi {
    async fn get_course(&self, id: &CourseId) -> Result<Course, ApiError> {
        self.load_course(id).await
    }

    async fn list_courses(&self, query: &CatalogQuery) -> Result<CoursePage, ApiError> {
        let mut courses = Vec::new();
        for course in self.storage.courses.list_courses().await? {
            courses.push(self.with_total(course).await?);
        }
        Ok(query.apply(courses))
    }

    async fn list_enrollments(&self, learner: &LearnerId) -> Result<Vec<Enrollment>, ApiError> {
        let records = self.storage.enrollments.list_for_learner(learner).await?;
        let mut enrollments = Vec::with_capacity(records.len());
        for record in records {
            match self.storage.courses.get_course(&record.course_id).await? {
                Some(course) => {
                    let course = self.with_total(course).await?;
                    enrollments.push(record.into_enrollment(course));
                }
                None => {
                    warn!(enrollment = %record.id, course = %record.course_id, "skipping enrollment for missing course");
                }
            }
        }
        Ok(enrollments)
    }

    async fn enroll(
        &self,
        learner: &LearnerId,
        course_id: &CourseId,
    ) -> Result<Enrollment, ApiError> {
        let course = self.load_course(course_id).await?;
        let already = || ApiError::AlreadyEnrolled("Already enrolled in this course".into());
        if self
            .storage
            .enrollments
            .find_enrollment(learner, course_id)
            .await?
            .is_some()
        {
            return Err(already());
        }

        let record = EnrollmentRecord::new(
            EnrollmentId::generate(),
            learner.clone(),
            course_id.clone(),
            self.clock.now(),
        );
        match self.storage.enrollments.insert_enrollment(&record).await {
            Ok(()) => {}
            Err(StorageError::Conflict) => return Err(already()),
            Err(e) => return Err(e.into()),
        }
        info!(%learner, course = %course_id, enrollment = %record.id, "learner enrolled");

        let course = self.with_total(course).await?;
        Ok(record.into_enrollment(course))
    }

    async fn complete_lesson(
        &self,
        learner: &LearnerId,
        course_id: &CourseId,
        key: LessonKey,
    ) -> Result<Progress, ApiError> {
        let course = self
            .storage
            .courses
            .get_course(course_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(COURSE_NOT_FOUND.into()))?;
        let record = self
            .storage
            .enrollments
            .find_enrollment(learner, course_id)
            .await?
            .ok_or_else(|| ApiError::Rejected("Not enrolled in this course".into()))?;
        if course.lesson_at(key).is_none() {
            return Err(ApiError::InvalidLesson(format!(
                "Lesson {key} not found in course"
            )));
        }

        let update = self
            .storage
            .enrollments
            .add_completion(&record.id, key, &course)
            .await?;
        info!(
            %learner,
            course = %course_id,
            lesson = %key,
            progress = %update.progress,
            added = update.added,
            "lesson completed"
        );
        Ok(update.progress)
    }

    async fn create_course(
        &self,
        principal: &Principal,
        draft: &CourseDraft,
    ) -> Result<Course, ApiError> {
        Self::require_admin(principal)?;
        let course = draft
            .clone()
            .into_course(CourseId::generate(), Some(self.clock.now()))?;
        self.storage.courses.upsert_course(&course).await?;
        info!(course = %course.id, title = %course.title, "course created");
        Ok(course)
    }

    async fn update_course(
        &self,
        principal: &Principal,
        id: &CourseId,
        draft: &CourseDraft,
    ) -> Result<Course, ApiError> {
        Self::require_admin(principal)?;
        let before = self
            .storage
            .courses
            .get_course(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(COURSE_NOT_FOUND.into()))?;
        let mut draft = draft.clone();
        draft.adopt_lesson_ids(&before);
        let after = draft.into_course(id.clone(), before.created_at)?;
        let rewrites = self.remap_enrollments(&before, &after).await?;
        self.storage
            .courses
            .update_course_with_completions(&after, &rewrites)
            .await?;
        info!(course = %id, remapped = rewrites.len(), "course updated");
        self.with_total(after).await
    }

    async fn delete_course(&self, principal: &Principal, id: &CourseId) -> Result<(), ApiError> {
        Self::require_admin(principal)?;
        match self.storage.courses.delete_course(id).await {
            Ok(()) => {
                info!(course = %id, "course deleted");
                Ok(())
            }
            Err(StorageError::NotFound) => Err(ApiError::NotFound(COURSE_NOT_FOUND.into())),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::{LessonDraft, ModuleDraft};
    use course_core::time::fixed_now;
    use std::sync::Arc;
    use storage::repository::{CourseRepository, InMemoryRepository};

    /// Course store whose edit write always fails.
    struct BrokenEdits(InMemoryRepository);

    #[async_trait]
    impl CourseRepository for BrokenEdits {
        async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
            self.0.upsert_course(course).await
        }

        async fn get_course(&self, id: &CourseId) -> Result<Option<Course>, StorageError> {
            self.0.get_course(id).await
        }

        async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
            self.0.list_courses().await
        }

        async fn update_course_with_completions(
            &self,
            _course: &Course,
            _rewrites: &[CompletionRewrite],
        ) -> Result<(), StorageError> {
            Err(StorageError::Connection("disk full".into()))
        }

        async fn delete_course(&self, id: &CourseId) -> Result<(), StorageError> {
            self.0.delete_course(id).await
        }
    }

    fn draft() -> CourseDraft {
        CourseDraft {
            title: "Rust Basics".into(),
            description: "Ownership and borrowing".into(),
            instructor: "Ferris".into(),
            price: 0.0,
            thumbnail: "https://img.example.com/rust.png".into(),
            modules: vec![
                ModuleDraft {
                    title: "Intro".into(),
                    order: 1,
                    lessons: vec![LessonDraft {
                        title: "Welcome".into(),
                        order: 1,
                        ..LessonDraft::default()
                    }],
                },
                ModuleDraft {
                    title: "Core".into(),
                    order: 2,
                    lessons: vec![
                        LessonDraft {
                            title: "Moves".into(),
                            order: 1,
                            ..LessonDraft::default()
                        },
                        LessonDraft {
                            title: "Borrows".into(),
                            order: 2,
                            ..LessonDraft::default()
                        },
                    ],
                },
            ],
            ..CourseDraft::default()
        }
    }

    fn api() -> LocalCourseApi {
        LocalCourseApi::in_memory(Clock::fixed(fixed_now()))
    }

    fn key(raw: &str) -> LessonKey {
        raw.parse().unwrap()
    }

    #[tokio::test]
    async fn completion_progress_rounds_half_up() {
        let api = api();
        let admin = Principal::admin("root");
        let learner = LearnerId::new("u1");
        let course = api.create_course(&admin, &draft()).await.unwrap();
        api.enroll(&learner, &course.id).await.unwrap();

        let p1 = api.complete_lesson(&learner, &course.id, key("0-1")).await.unwrap();
        let p2 = api.complete_lesson(&learner, &course.id, key("1-2")).await.unwrap();
        let again = api.complete_lesson(&learner, &course.id, key("1-2")).await.unwrap();

        assert_eq!(p1.percent(), 33);
        assert_eq!(p2.percent(), 67);
        assert_eq!(again, p2);
    }

    #[tokio::test]
    async fn rejects_duplicate_enrollment_and_unknown_keys() {
        let api = api();
        let learner = LearnerId::new("u1");
        let course = api
            .create_course(&Principal::admin("root"), &draft())
            .await
            .unwrap();
        api.enroll(&learner, &course.id).await.unwrap();

        let dup = api.enroll(&learner, &course.id).await.unwrap_err();
        assert!(matches!(dup, ApiError::AlreadyEnrolled(_)));

        let bad = api
            .complete_lesson(&learner, &course.id, key("4-1"))
            .await
            .unwrap_err();
        assert!(matches!(bad, ApiError::InvalidLesson(_)));
    }

    #[tokio::test]
    async fn course_edit_remaps_completions() {
        let api = api();
        let admin = Principal::admin("root");
        let learner = LearnerId::new("u1");
        let course = api.create_course(&admin, &draft()).await.unwrap();
        api.enroll(&learner, &course.id).await.unwrap();
        api.complete_lesson(&learner, &course.id, key("1-2")).await.unwrap();

        let mut edited = CourseDraft::from_course(&course);
        edited.modules.insert(
            0,
            ModuleDraft {
                title: "Preface".into(),
                order: 0,
                lessons: vec![LessonDraft {
                    title: "Setup".into(),
                    order: 1,
                    ..LessonDraft::default()
                }],
            },
        );
        api.update_course(&admin, &course.id, &edited).await.unwrap();

        let enrollments = api.list_enrollments(&learner).await.unwrap();
        assert_eq!(enrollments.len(), 1);
        assert!(enrollments[0].is_complete(&key("2-2")));
        assert!(!enrollments[0].is_complete(&key("1-2")));
        assert_eq!(enrollments[0].progress().percent(), 25);
    }

    #[tokio::test]
    async fn deleted_course_hides_enrollment() {
        let api = api();
        let admin = Principal::admin("root");
        let learner = LearnerId::new("u1");
        let course = api.create_course(&admin, &draft()).await.unwrap();
        api.enroll(&learner, &course.id).await.unwrap();

        api.delete_course(&admin, &course.id).await.unwrap();

        assert!(api.list_enrollments(&learner).await.unwrap().is_empty());
        let again = api.delete_course(&admin, &course.id).await.unwrap_err();
        assert!(matches!(again, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn students_cannot_author() {
        let api = api();
        let err = api
            .create_course(&Principal::student("u1"), &draft())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_completions_store_matching_progress() {
        let api = api();
        let learner = LearnerId::new("u1");
        let course = api
            .create_course(&Principal::admin("root"), &draft())
            .await
            .unwrap();
        api.enroll(&learner, &course.id).await.unwrap();

        let (a, b) = tokio::join!(
            api.complete_lesson(&learner, &course.id, key("0-1")),
            api.complete_lesson(&learner, &course.id, key("1-1"))
        );
        a.unwrap();
        b.unwrap();

        let enrollments = api.list_enrollments(&learner).await.unwrap();
        assert_eq!(enrollments[0].completed_lessons().len(), 2);
        assert_eq!(enrollments[0].progress().percent(), 67);
    }

    #[tokio::test]
    async fn update_without_lesson_ids_keeps_completions() {
        let api = api();
        let admin = Principal::admin("root");
        let learner = LearnerId::new("u1");
        let course = api.create_course(&admin, &draft()).await.unwrap();
        api.enroll(&learner, &course.id).await.unwrap();
        api.complete_lesson(&learner, &course.id, key("1-2")).await.unwrap();

        let mut edited = draft();
        edited.title = "Rust Basics, revised".into();
        let updated = api.update_course(&admin, &course.id, &edited).await.unwrap();
        assert_eq!(updated.modules[1].lessons[1].id, course.modules[1].lessons[1].id);

        let enrollments = api.list_enrollments(&learner).await.unwrap();
        assert!(enrollments[0].is_complete(&key("1-2")));
        assert_eq!(enrollments[0].progress().percent(), 33);
        assert_eq!(enrollments[0].course().title, "Rust Basics, revised");
    }

    #[tokio::test]
    async fn failed_edit_leaves_course_and_completions_untouched() {
        let repo = InMemoryRepository::new();
        let storage = Storage {
            courses: Arc::new(BrokenEdits(repo.clone())),
            enrollments: Arc::new(repo),
        };
        let api = LocalCourseApi::new(Clock::fixed(fixed_now()), storage);
        let admin = Principal::admin("root");
        let learner = LearnerId::new("u1");
        let course = api.create_course(&admin, &draft()).await.unwrap();
        api.enroll(&learner, &course.id).await.unwrap();
        api.complete_lesson(&learner, &course.id, key("1-2")).await.unwrap();

        let mut edited = CourseDraft::from_course(&course);
        edited.title = "Never stored".into();
        edited.modules.remove(0);
        let err = api.update_course(&admin, &course.id, &edited).await.unwrap_err();
        assert!(matches!(err, ApiError::Storage(_)));

        let stored = api.get_course(&course.id).await.unwrap();
        assert_eq!(stored.title, "Rust Basics");
        let enrollments = api.list_enrollments(&learner).await.unwrap();
        assert!(enrollments[0].is_complete(&key("1-2")));
        assert_eq!(enrollments[0].progress().percent(), 33);
    }
}
