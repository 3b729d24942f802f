use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{CourseRepository, EnrollmentRepository, Storage};

mod course_repo;
mod enrollment_repo;
mod mapping;
mod migrate;

/// Course catalog and enrollment store on a single `SQLite` database.
///
/// Courses keep their module tree as JSON; completed lessons live in their own
/// table keyed by enrollment so completions can be added one row at a time.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

fn connect_options(database_url: &str) -> Result<SqliteConnectOptions, sqlx::Error> {
    Ok(SqliteConnectOptions::from_str(database_url)?
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5)))
}

impl SqliteRepository {
    /// Open a pool on `database_url` with foreign keys enforced and a busy
    /// timeout so concurrent completion writes queue instead of failing.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the URL is invalid or the database cannot
    /// be opened.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(connect_options(database_url)?)
            .await?;
        tracing::debug!(url = database_url, "course store connected");
        Ok(Self { pool })
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let courses: Arc<dyn CourseRepository> = Arc::new(repo.clone());
        let enrollments: Arc<dyn EnrollmentRepository> = Arc::new(repo);
        Ok(Self {
            courses,
            enrollments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::{Course, CourseId, Lesson, Module};

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteRepository>();
    }

    #[tokio::test]
    async fn migrations_can_run_twice_on_one_database() {
        let url = "sqlite:file:memdb_migrate_twice?mode=memory&cache=shared";
        let repo = SqliteRepository::connect(url).await.unwrap();
        repo.migrate().await.unwrap();
        repo.migrate().await.unwrap();

        let storage = Storage::sqlite(url).await.unwrap();
        let course = Course::new(
            "c1",
            "Intro",
            vec![Module::new("M", 1, vec![Lesson::new("l1", "L1", 1)])],
        );
        storage.courses.upsert_course(&course).await.unwrap();

        let fetched = repo.get_course(&CourseId::new("c1")).await.unwrap();
        assert_eq!(fetched.map(|c| c.title), Some("Intro".to_string()));
    }
}
