use std::collections::BTreeSet;

use course_core::model::{Course, CourseId, EnrollmentId, LearnerId, LessonKey};
use course_core::progress::compute_progress;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

use super::SqliteRepository;
use super::mapping::{
    conn, map_enrollment_row, parse_lesson_key, progress_to_i64, ser, write_err,
};
use crate::repository::{CompletionUpdate, EnrollmentRecord, EnrollmentRepository, StorageError};

pub(crate) async fn load_completions<'e, E>(
    executor: E,
    id: &str,
) -> Result<BTreeSet<LessonKey>, StorageError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query("SELECT lesson_key FROM enrollment_completions WHERE enrollment_id = ?1")
        .bind(id)
        .fetch_all(executor)
        .await
        .map_err(conn)?;

    rows.iter()
        .map(|row| {
            let raw: String = row.try_get("lesson_key").map_err(ser)?;
            parse_lesson_key(&raw)
        })
        .collect()
}

impl SqliteRepository {
    async fn hydrate(&self, rows: Vec<SqliteRow>) -> Result<Vec<EnrollmentRecord>, StorageError> {
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id").map_err(ser)?;
            let completed = load_completions(&self.pool, &id).await?;
            out.push(map_enrollment_row(&row, completed)?);
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn insert_enrollment(&self, record: &EnrollmentRecord) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO enrollments (id, learner_id, course_id, progress, enrolled_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(record.id.as_str())
        .bind(record.learner_id.as_str())
        .bind(record.course_id.as_str())
        .bind(progress_to_i64(record.progress))
        .bind(record.enrolled_at)
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;

        for key in &record.completed {
            sqlx::query(
                "INSERT INTO enrollment_completions (enrollment_id, lesson_key) VALUES (?1, ?2)",
            )
            .bind(record.id.as_str())
            .bind(key.to_string())
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn find_enrollment(
        &self,
        learner: &LearnerId,
        course: &CourseId,
    ) -> Result<Option<EnrollmentRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, learner_id, course_id, progress, enrolled_at
            FROM enrollments
            WHERE learner_id = ?1 AND course_id = ?2
            ",
        )
        .bind(learner.as_str())
        .bind(course.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        Ok(self.hydrate(rows).await?.into_iter().next())
    }

    async fn list_for_learner(
        &self,
        learner: &LearnerId,
    ) -> Result<Vec<EnrollmentRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, learner_id, course_id, progress, enrolled_at
            FROM enrollments
            WHERE learner_id = ?1
            ORDER BY enrolled_at ASC, id ASC
            ",
        )
        .bind(learner.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        self.hydrate(rows).await
    }

    async fn list_for_course(
        &self,
        course: &CourseId,
    ) -> Result<Vec<EnrollmentRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, learner_id, course_id, progress, enrolled_at
            FROM enrollments
            WHERE course_id = ?1
            ORDER BY enrolled_at ASC, id ASC
            ",
        )
        .bind(course.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        self.hydrate(rows).await
    }

    async fn count_for_course(&self, course: &CourseId) -> Result<u64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE course_id = ?1")
            .bind(course.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        u64::try_from(count).map_err(ser)
    }

    async fn add_completion(
        &self,
        id: &EnrollmentId,
        key: LessonKey,
        course: &Course,
    ) -> Result<CompletionUpdate, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        // Writing first takes the database write lock before anything is read,
        // so the set recomputed below cannot miss a concurrent insert.
        let touched = sqlx::query("UPDATE enrollments SET progress = progress WHERE id = ?1")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        if touched.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        let inserted = sqlx::query(
            r"
            INSERT INTO enrollment_completions (enrollment_id, lesson_key)
            VALUES (?1, ?2)
            ON CONFLICT(enrollment_id, lesson_key) DO NOTHING
            ",
        )
        .bind(id.as_str())
        .bind(key.to_string())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        let completed = load_completions(&mut *tx, id.as_str()).await?;
        let progress = compute_progress(course, &completed);

        sqlx::query("UPDATE enrollments SET progress = ?1 WHERE id = ?2")
            .bind(progress_to_i64(progress))
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        tx.commit().await.map_err(conn)?;
        Ok(CompletionUpdate {
            added: inserted.rows_affected() > 0,
            progress,
        })
    }
}
