use chrono::{DateTime, Utc};
use course_core::model::{
    Course, CourseId, EnrollmentId, LearnerId, LessonKey, Module, Progress,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use std::collections::BTreeSet;

use crate::repository::{EnrollmentRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Maps unique-constraint violations to `Conflict`, everything else to
/// `Connection`.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => conn(e),
    }
}

fn u64_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn progress_from_i64(v: i64) -> Result<Progress, StorageError> {
    let raw = u32::try_from(v).map_err(|_| ser(format!("progress out of range: {v}")))?;
    Progress::new(raw).map_err(ser)
}

pub(crate) fn progress_to_i64(p: Progress) -> i64 {
    i64::from(p.percent())
}

pub(crate) fn parse_lesson_key(raw: &str) -> Result<LessonKey, StorageError> {
    raw.parse().map_err(ser)
}

pub(crate) fn map_course_row(row: &SqliteRow) -> Result<Course, StorageError> {
    let tags: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("tags").map_err(ser)?).map_err(ser)?;
    let modules: Vec<Module> =
        serde_json::from_str(&row.try_get::<String, _>("modules").map_err(ser)?).map_err(ser)?;
    let created_at: Option<DateTime<Utc>> = row.try_get("created_at").map_err(ser)?;
    let total_enrollments = u64_from_i64(
        "total_enrollments",
        row.try_get::<i64, _>("total_enrollments").map_err(ser)?,
    )?;

    let mut course = Course::new(
        CourseId::new(row.try_get::<String, _>("id").map_err(ser)?),
        row.try_get::<String, _>("title").map_err(ser)?,
        modules,
    );
    course.description = row.try_get("description").map_err(ser)?;
    course.instructor = row.try_get("instructor").map_err(ser)?;
    course.price = row.try_get("price").map_err(ser)?;
    course.thumbnail = row.try_get("thumbnail").map_err(ser)?;
    course.category = row.try_get("category").map_err(ser)?;
    course.tags = tags;
    course.total_enrollments = total_enrollments;
    course.created_at = created_at;
    Ok(course)
}

/// Maps an `enrollments` row; completions are loaded separately.
pub(crate) fn map_enrollment_row(
    row: &SqliteRow,
    completed: BTreeSet<LessonKey>,
) -> Result<EnrollmentRecord, StorageError> {
    Ok(EnrollmentRecord {
        id: EnrollmentId::new(row.try_get::<String, _>("id").map_err(ser)?),
        learner_id: LearnerId::new(row.try_get::<String, _>("learner_id").map_err(ser)?),
        course_id: CourseId::new(row.try_get::<String, _>("course_id").map_err(ser)?),
        completed,
        progress: progress_from_i64(row.try_get("progress").map_err(ser)?)?,
        enrolled_at: row.try_get("enrolled_at").map_err(ser)?,
    })
}
