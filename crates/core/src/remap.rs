//! Carries completion records across course edits.
//!
//! Lesson keys are positional, so inserting, removing or reordering modules
//! detaches stored keys from the lessons they were recorded for. The owning
//! service runs this step whenever a course tree changes, translating each
//! key through the lesson's permanent id.

use std::collections::BTreeSet;

use crate::model::{Course, LessonKey};

/// Outcome of translating a completion set onto an edited course.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemapReport {
    /// Keys valid against the edited course.
    pub completed: BTreeSet<LessonKey>,
    /// Old keys whose key changed, with their replacement.
    pub moved: Vec<(LessonKey, LessonKey)>,
    /// Old keys that no longer address any lesson.
    pub dropped: Vec<LessonKey>,
}

impl RemapReport {
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.moved.is_empty() && self.dropped.is_empty()
    }
}

/// Translates `completed` (recorded against `before`) onto `after`.
#[must_use]
pub fn remap_completions(
    before: &Course,
    after: &Course,
    completed: &BTreeSet<LessonKey>,
) -> RemapReport {
    let mut report = RemapReport::default();

    for &old_key in completed {
        let new_key = before
            .lesson_at(old_key)
            .and_then(|lesson| {
                after
                    .modules
                    .iter()
                    .flat_map(|m| m.lessons.iter())
                    .find(|l| l.id == lesson.id)
            })
            .and_then(|lesson| after.lesson_key(lesson));

        match new_key {
            Some(new_key) => {
                if new_key != old_key {
                    report.moved.push((old_key, new_key));
                }
                report.completed.insert(new_key);
            }
            None => report.dropped.push(old_key),
        }
    }

    report
}
