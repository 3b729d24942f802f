use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use tracing::warn;

use crate::model::course::Course;
use crate::model::ids::{EnrollmentId, LearnerId};
use crate::model::lesson_key::LessonKey;

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("progress must be between 0 and 100, got {0}")]
    OutOfRange(u32),
}

/// Whole-number completion percentage, 0 to 100 inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Progress(u8);

impl Progress {
    pub const ZERO: Progress = Progress(0);
    pub const COMPLETE: Progress = Progress(100);

    /// Creates a progress value.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::OutOfRange` if `percent` is greater than 100.
    pub fn new(percent: u32) -> Result<Self, ProgressError> {
        u8::try_from(percent)
            .ok()
            .filter(|p| *p <= 100)
            .map(Self)
            .ok_or(ProgressError::OutOfRange(percent))
    }

    #[must_use]
    pub fn percent(&self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.0 == 100
    }
}

impl TryFrom<u32> for Progress {
    type Error = ProgressError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Progress> for u32 {
    fn from(progress: Progress) -> Self {
        u32::from(progress.0)
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

//
// ─── ENROLLMENT ────────────────────────────────────────────────────────────────
//

/// Durable record linking one learner to one course.
///
/// The course is embedded as returned by the owning service. `progress` is
/// always the value the service computed; it is never derived locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    #[serde(rename = "_id", alias = "id")]
    id: EnrollmentId,
    #[serde(alias = "user", alias = "student")]
    learner_id: LearnerId,
    course: Course,
    #[serde(default, deserialize_with = "lenient_keys")]
    completed_lessons: BTreeSet<LessonKey>,
    #[serde(default)]
    progress: Progress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    enrolled_at: Option<DateTime<Utc>>,
}

/// Reads the completion set, skipping entries that are not valid lesson keys
/// so one bad stored value cannot hide the whole enrollment.
fn lenient_keys<'de, D>(deserializer: D) -> Result<BTreeSet<LessonKey>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|entry| match entry.parse::<LessonKey>() {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(key = %entry, error = %e, "skipping malformed completed lesson");
                None
            }
        })
        .collect())
}

impl Enrollment {
    /// A fresh enrollment with nothing completed.
    #[must_use]
    pub fn new(
        id: EnrollmentId,
        learner_id: LearnerId,
        course: Course,
        enrolled_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            learner_id,
            course,
            completed_lessons: BTreeSet::new(),
            progress: Progress::ZERO,
            enrolled_at,
        }
    }

    /// Rehydrates an enrollment from persisted state.
    #[must_use]
    pub fn from_persisted(
        id: EnrollmentId,
        learner_id: LearnerId,
        course: Course,
        completed_lessons: BTreeSet<LessonKey>,
        progress: Progress,
        enrolled_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            learner_id,
            course,
            completed_lessons,
            progress,
            enrolled_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> &EnrollmentId {
        &self.id
    }

    #[must_use]
    pub fn learner_id(&self) -> &LearnerId {
        &self.learner_id
    }

    #[must_use]
    pub fn course(&self) -> &Course {
        &self.course
    }

    #[must_use]
    pub fn completed_lessons(&self) -> &BTreeSet<LessonKey> {
        &self.completed_lessons
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        self.progress
    }

    #[must_use]
    pub fn enrolled_at(&self) -> Option<DateTime<Utc>> {
        self.enrolled_at
    }

    #[must_use]
    pub fn is_complete(&self, key: &LessonKey) -> bool {
        self.completed_lessons.contains(key)
    }

    /// Applies a completion confirmed by the owning service.
    ///
    /// Adds `key` to the completed set and replaces progress with the value
    /// the service returned. Returns `true` if the key was not already present.
    pub fn record_completion(&mut self, key: LessonKey, progress: Progress) -> bool {
        self.progress = progress;
        self.completed_lessons.insert(key)
    }
}
