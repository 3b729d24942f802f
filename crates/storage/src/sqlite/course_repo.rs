use course_core::model::{Course, CourseId};
use sqlx::{Executor, Sqlite};

use super::SqliteRepository;
use super::mapping::{conn, map_course_row, progress_to_i64, ser};
use crate::repository::{CompletionRewrite, CourseRepository, StorageError};

const SELECT_COURSE: &str = r"
    SELECT c.id, c.title, c.description, c.instructor, c.price, c.thumbnail,
           c.category, c.tags, c.modules, c.created_at,
           (SELECT COUNT(*) FROM enrollments e WHERE e.course_id = c.id) AS total_enrollments
    FROM courses c
";

async fn write_course<'e, E>(executor: E, course: &Course) -> Result<(), StorageError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let tags = serde_json::to_string(&course.tags).map_err(ser)?;
    let modules = serde_json::to_string(&course.modules).map_err(ser)?;

    sqlx::query(
        r"
        INSERT INTO courses (id, title, description, instructor, price, thumbnail, category, tags, modules, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            description = excluded.description,
            instructor = excluded.instructor,
            price = excluded.price,
            thumbnail = excluded.thumbnail,
            category = excluded.category,
            tags = excluded.tags,
            modules = excluded.modules
        ",
    )
    .bind(course.id.as_str())
    .bind(&course.title)
    .bind(&course.description)
    .bind(&course.instructor)
    .bind(course.price)
    .bind(&course.thumbnail)
    .bind(&course.category)
    .bind(tags)
    .bind(modules)
    .bind(course.created_at)
    .execute(executor)
    .await
    .map_err(conn)?;

    Ok(())
}

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        write_course(&self.pool, course).await
    }

    async fn get_course(&self, id: &CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query(&format!("{SELECT_COURSE} WHERE c.id = ?1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_course_row).transpose()
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let rows = sqlx::query(&format!("{SELECT_COURSE} ORDER BY c.created_at ASC, c.id ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_course_row).collect()
    }

    async fn update_course_with_completions(
        &self,
        course: &Course,
        rewrites: &[CompletionRewrite],
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        write_course(&mut *tx, course).await?;

        for rewrite in rewrites {
            let id = rewrite.enrollment_id.as_str();
            let res = sqlx::query("UPDATE enrollments SET progress = ?1 WHERE id = ?2")
                .bind(progress_to_i64(rewrite.progress))
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            if res.rows_affected() == 0 {
                return Err(StorageError::NotFound);
            }

            sqlx::query("DELETE FROM enrollment_completions WHERE enrollment_id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(conn)?;

            for key in &rewrite.completed {
                sqlx::query(
                    "INSERT INTO enrollment_completions (enrollment_id, lesson_key) VALUES (?1, ?2)",
                )
                .bind(id)
                .bind(key.to_string())
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            }
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn delete_course(&self, id: &CourseId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM courses WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
