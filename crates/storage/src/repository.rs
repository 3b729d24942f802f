use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_core::model::{
    Course, CourseId, Enrollment, EnrollmentId, LearnerId, LessonKey, Progress,
};
use course_core::progress::compute_progress;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of an enrollment.
///
/// The course is stored once and referenced by id; repositories join it back
/// in with `into_enrollment` when a caller needs the full `Enrollment`.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentRecord {
    pub id: EnrollmentId,
    pub learner_id: LearnerId,
    pub course_id: CourseId,
    pub completed: BTreeSet<LessonKey>,
    pub progress: Progress,
    pub enrolled_at: DateTime<Utc>,
}

impl EnrollmentRecord {
    #[must_use]
    pub fn new(
        id: EnrollmentId,
        learner_id: LearnerId,
        course_id: CourseId,
        enrolled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            learner_id,
            course_id,
            completed: BTreeSet::new(),
            progress: Progress::ZERO,
            enrolled_at,
        }
    }

    /// Embeds `course` to produce the domain `Enrollment`.
    #[must_use]
    pub fn into_enrollment(self, course: Course) -> Enrollment {
        Enrollment::from_persisted(
            self.id,
            self.learner_id,
            course,
            self.completed,
            self.progress,
            Some(self.enrolled_at),
        )
    }
}

/// Result of recording one completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionUpdate {
    /// `false` when the key was already recorded.
    pub added: bool,
    /// Progress recomputed from the stored completion set.
    pub progress: Progress,
}

/// Replacement completion state for one enrollment after a course edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRewrite {
    pub enrollment_id: EnrollmentId,
    pub completed: BTreeSet<LessonKey>,
    pub progress: Progress,
}

/// Repository contract for published courses.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Persist or replace a course, including its module tree.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// Fetch a course by ID. Returns `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn get_course(&self, id: &CourseId) -> Result<Option<Course>, StorageError>;

    /// List every course, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn list_courses(&self) -> Result<Vec<Course>, StorageError>;

    /// Store an edited course together with the remapped completion sets of
    /// its enrollments. Either everything is written or nothing is.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if a rewrite names an unknown
    /// enrollment; nothing is stored in that case.
    async fn update_course_with_completions(
        &self,
        course: &Course,
        rewrites: &[CompletionRewrite],
    ) -> Result<(), StorageError>;

    /// Remove a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist.
    async fn delete_course(&self, id: &CourseId) -> Result<(), StorageError>;
}

/// Repository contract for enrollments and their completion sets.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Store a new enrollment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the learner is already enrolled in
    /// the course.
    async fn insert_enrollment(&self, record: &EnrollmentRecord) -> Result<(), StorageError>;

    /// Fetch the enrollment of `learner` in `course`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn find_enrollment(
        &self,
        learner: &LearnerId,
        course: &CourseId,
    ) -> Result<Option<EnrollmentRecord>, StorageError>;

    /// All enrollments of a learner, in enrollment order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn list_for_learner(
        &self,
        learner: &LearnerId,
    ) -> Result<Vec<EnrollmentRecord>, StorageError>;

    /// All enrollments in a course, in enrollment order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn list_for_course(&self, course: &CourseId)
    -> Result<Vec<EnrollmentRecord>, StorageError>;

    /// Number of learners enrolled in a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn count_for_course(&self, course: &CourseId) -> Result<u64, StorageError>;

    /// Add `key` to the completion set and store progress recomputed against
    /// `course` from the set as stored after the insert.
    ///
    /// Insert, re-read and recompute happen atomically, so concurrent
    /// completions on one enrollment never leave a stale percentage.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the enrollment does not exist.
    async fn add_completion(
        &self,
        id: &EnrollmentId,
        key: LessonKey,
        course: &Course,
    ) -> Result<CompletionUpdate, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    courses: Arc<Mutex<HashMap<CourseId, Course>>>,
    enrollments: Arc<Mutex<HashMap<EnrollmentId, EnrollmentRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_err<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn sorted(mut records: Vec<EnrollmentRecord>) -> Vec<EnrollmentRecord> {
    records.sort_by(|a, b| {
        a.enrolled_at
            .cmp(&b.enrolled_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    records
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self.courses.lock().map_err(lock_err)?;
        guard.insert(course.id.clone(), course.clone());
        Ok(())
    }

    async fn get_course(&self, id: &CourseId) -> Result<Option<Course>, StorageError> {
        let guard = self.courses.lock().map_err(lock_err)?;
        Ok(guard.get(id).cloned())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let guard = self.courses.lock().map_err(lock_err)?;
        let mut courses: Vec<Course> = guard.values().cloned().collect();
        courses.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(courses)
    }

    async fn update_course_with_completions(
        &self,
        course: &Course,
        rewrites: &[CompletionRewrite],
    ) -> Result<(), StorageError> {
        let mut courses = self.courses.lock().map_err(lock_err)?;
        let mut enrollments = self.enrollments.lock().map_err(lock_err)?;
        if rewrites
            .iter()
            .any(|r| !enrollments.contains_key(&r.enrollment_id))
        {
            return Err(StorageError::NotFound);
        }
        for rewrite in rewrites {
            if let Some(record) = enrollments.get_mut(&rewrite.enrollment_id) {
                record.completed = rewrite.completed.clone();
                record.progress = rewrite.progress;
            }
        }
        courses.insert(course.id.clone(), course.clone());
        Ok(())
    }

    async fn delete_course(&self, id: &CourseId) -> Result<(), StorageError> {
        let mut guard = self.courses.lock().map_err(lock_err)?;
        guard.remove(id).map(|_| ()).ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn insert_enrollment(&self, record: &EnrollmentRecord) -> Result<(), StorageError> {
        let mut guard = self.enrollments.lock().map_err(lock_err)?;
        let duplicate = guard.values().any(|r| {
            r.id == record.id
                || (r.learner_id == record.learner_id && r.course_id == record.course_id)
        });
        if duplicate {
            return Err(StorageError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn find_enrollment(
        &self,
        learner: &LearnerId,
        course: &CourseId,
    ) -> Result<Option<EnrollmentRecord>, StorageError> {
        let guard = self.enrollments.lock().map_err(lock_err)?;
        Ok(guard
            .values()
            .find(|r| &r.learner_id == learner && &r.course_id == course)
            .cloned())
    }

    async fn list_for_learner(
        &self,
        learner: &LearnerId,
    ) -> Result<Vec<EnrollmentRecord>, StorageError> {
        let guard = self.enrollments.lock().map_err(lock_err)?;
        Ok(sorted(
            guard
                .values()
                .filter(|r| &r.learner_id == learner)
                .cloned()
                .collect(),
        ))
    }

    async fn list_for_course(
        &self,
        course: &CourseId,
    ) -> Result<Vec<EnrollmentRecord>, StorageError> {
        let guard = self.enrollments.lock().map_err(lock_err)?;
        Ok(sorted(
            guard
                .values()
                .filter(|r| &r.course_id == course)
                .cloned()
                .collect(),
        ))
    }

    async fn count_for_course(&self, course: &CourseId) -> Result<u64, StorageError> {
        let guard = self.enrollments.lock().map_err(lock_err)?;
        Ok(guard.values().filter(|r| &r.course_id == course).count() as u64)
    }

    async fn add_completion(
        &self,
        id: &EnrollmentId,
        key: LessonKey,
        course: &Course,
    ) -> Result<CompletionUpdate, StorageError> {
        let mut guard = self.enrollments.lock().map_err(lock_err)?;
        let record = guard.get_mut(id).ok_or(StorageError::NotFound)?;
        let added = record.completed.insert(key);
        record.progress = compute_progress(course, &record.completed);
        Ok(CompletionUpdate {
            added,
            progress: record.progress,
        })
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let courses: Arc<dyn CourseRepository> = Arc::new(repo.clone());
        let enrollments: Arc<dyn EnrollmentRepository> = Arc::new(repo);
        Self {
            courses,
            enrollments,
        }
    }
}
