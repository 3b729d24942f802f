//! Progress formula used by the owning service.
//!
//! Clients never call this to derive a percentage for display; they trust the
//! value returned with each completion.

use std::collections::BTreeSet;

use crate::model::{Course, LessonKey, Progress};

/// Percentage of lessons in `course` covered by `completed`, rounded half up.
///
/// Keys that do not resolve to a lesson in the tree are ignored. A course
/// with no lessons reports 0.
#[must_use]
pub fn compute_progress(course: &Course, completed: &BTreeSet<LessonKey>) -> Progress {
    let total = course.total_lessons();
    if total == 0 {
        return Progress::ZERO;
    }
    let done = completed
        .iter()
        .filter(|key| course.lesson_at(**key).is_some())
        .count()
        .min(total);

    let percent = (done * 100 + total / 2) / total;
    Progress::new(u32::try_from(percent).unwrap_or(100)).unwrap_or(Progress::COMPLETE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Lesson, Module};

    fn course() -> Course {
        Course::new(
            "c1",
            "Three lessons",
            vec![
                Module::new("A", 1, vec![Lesson::new("a1", "a1", 1)]),
                Module::new("B", 2, vec![Lesson::new("b1", "b1", 1), Lesson::new("b2", "b2", 2)]),
            ],
        )
    }

    fn keys(raw: &[&str]) -> BTreeSet<LessonKey> {
        raw.iter().map(|k| k.parse().unwrap()).collect()
    }

    #[test]
    fn one_of_three_is_thirty_three() {
        assert_eq!(compute_progress(&course(), &keys(&["0-1"])).percent(), 33);
    }

    #[test]
    fn two_of_three_rounds_up() {
        assert_eq!(compute_progress(&course(), &keys(&["0-1", "1-2"])).percent(), 67);
    }

    #[test]
    fn all_lessons_is_complete() {
        let progress = compute_progress(&course(), &keys(&["0-1", "1-1", "1-2"]));
        assert!(progress.is_complete());
    }

    #[test]
    fn unresolved_keys_do_not_count() {
        assert_eq!(compute_progress(&course(), &keys(&["4-1", "0-9"])), Progress::ZERO);
    }

    #[test]
    fn empty_course_reports_zero() {
        let empty = Course::new("c0", "Empty", Vec::new());
        assert_eq!(compute_progress(&empty, &keys(&["0-1"])), Progress::ZERO);
    }
}
