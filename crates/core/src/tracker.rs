use std::collections::BTreeSet;

use crate::model::{Course, Enrollment, Lesson, LessonKey, Progress};

/// Computes the progress identity of `lesson` inside `course`.
///
/// Returns `None` when no module of `course` contains the lesson. Lessons
/// taken from the same tree always resolve.
#[must_use]
pub fn compute_lesson_key(course: &Course, lesson: &Lesson) -> Option<LessonKey> {
    course.lesson_key(lesson)
}

//
// ─── VIEW MODEL ────────────────────────────────────────────────────────────────
//

/// Sidebar row for one lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonOutline {
    pub key: Option<LessonKey>,
    pub title: String,
    pub duration_minutes: u32,
    pub completed: bool,
    pub selected: bool,
}

/// Sidebar block for one module. Lessons are listed only when expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleOutline {
    pub index: usize,
    pub title: String,
    pub expanded: bool,
    pub lessons: Vec<LessonOutline>,
}

//
// ─── TRACKER ───────────────────────────────────────────────────────────────────
//

/// One learner's view of one course: completion state plus navigation state.
///
/// Completion lives in the (optional) `Enrollment` and only changes through
/// `record_completion`, after the owning service has confirmed it. Expanded
/// modules and the selected lesson are transient view state and never touch
/// the enrollment.
#[derive(Debug, Clone)]
pub struct EnrollmentProgressTracker {
    course: Course,
    enrollment: Option<Enrollment>,
    expanded_modules: BTreeSet<usize>,
    selected_lesson: Option<Lesson>,
}

impl EnrollmentProgressTracker {
    /// Initial state: first module expanded, first lesson of the first module
    /// selected if there is one.
    #[must_use]
    pub fn new(course: Course, enrollment: Option<Enrollment>) -> Self {
        let selected_lesson = course.first_lesson().cloned();
        Self {
            course,
            enrollment,
            expanded_modules: BTreeSet::from([0]),
            selected_lesson,
        }
    }

    #[must_use]
    pub fn course(&self) -> &Course {
        &self.course
    }

    #[must_use]
    pub fn enrollment(&self) -> Option<&Enrollment> {
        self.enrollment.as_ref()
    }

    #[must_use]
    pub fn is_enrolled(&self) -> bool {
        self.enrollment.is_some()
    }

    /// Last progress reported by the owning service; 0 when not enrolled.
    #[must_use]
    pub fn progress(&self) -> Progress {
        self.enrollment
            .as_ref()
            .map_or(Progress::ZERO, Enrollment::progress)
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.enrollment
            .as_ref()
            .map_or(0, |e| e.completed_lessons().len())
    }

    // ─── Completion ────────────────────────────────────────────────────────────

    /// Key for `lesson` within this tracker's course.
    #[must_use]
    pub fn compute_lesson_key(&self, lesson: &Lesson) -> Option<LessonKey> {
        compute_lesson_key(&self.course, lesson)
    }

    /// False for every key while there is no enrollment.
    #[must_use]
    pub fn is_complete(&self, key: &LessonKey) -> bool {
        self.enrollment
            .as_ref()
            .is_some_and(|e| e.is_complete(key))
    }

    #[must_use]
    pub fn is_lesson_complete(&self, lesson: &Lesson) -> bool {
        self.compute_lesson_key(lesson)
            .is_some_and(|key| self.is_complete(&key))
    }

    /// Whether the "mark complete" action should be offered for `lesson`.
    #[must_use]
    pub fn can_mark_complete(&self, lesson: &Lesson) -> bool {
        self.is_enrolled()
            && self
                .compute_lesson_key(lesson)
                .is_some_and(|key| !self.is_complete(&key))
    }

    /// Applies a completion the owning service accepted.
    ///
    /// Returns `true` if the key was newly added. Without an enrollment this
    /// is a no-op returning `false`.
    pub fn record_completion(&mut self, key: LessonKey, progress: Progress) -> bool {
        match self.enrollment.as_mut() {
            Some(enrollment) => enrollment.record_completion(key, progress),
            None => false,
        }
    }

    // ─── Navigation ────────────────────────────────────────────────────────────

    #[must_use]
    pub fn expanded_modules(&self) -> &BTreeSet<usize> {
        &self.expanded_modules
    }

    #[must_use]
    pub fn is_module_expanded(&self, index: usize) -> bool {
        self.expanded_modules.contains(&index)
    }

    /// Flips whether module `index` is expanded. Out-of-range indices are kept
    /// and simply never rendered.
    pub fn toggle_module(&mut self, index: usize) {
        if !self.expanded_modules.remove(&index) {
            self.expanded_modules.insert(index);
        }
    }

    #[must_use]
    pub fn selected_lesson(&self) -> Option<&Lesson> {
        self.selected_lesson.as_ref()
    }

    /// Selects a lesson. The caller is responsible for passing a lesson of
    /// this course.
    pub fn select_lesson(&mut self, lesson: Lesson) {
        self.selected_lesson = Some(lesson);
    }

    /// Selects the lesson addressed by `key`, if it exists in the tree.
    pub fn select_key(&mut self, key: LessonKey) -> bool {
        match self.course.lesson_at(key).cloned() {
            Some(lesson) => {
                self.selected_lesson = Some(lesson);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn selected_lesson_key(&self) -> Option<LessonKey> {
        self.selected_lesson
            .as_ref()
            .and_then(|lesson| self.compute_lesson_key(lesson))
    }

    #[must_use]
    pub fn can_mark_selected_complete(&self) -> bool {
        self.selected_lesson
            .as_ref()
            .is_some_and(|lesson| self.can_mark_complete(lesson))
    }

    /// Sidebar model: every module with its expansion flag, and lesson rows
    /// for expanded modules.
    #[must_use]
    pub fn outline(&self) -> Vec<ModuleOutline> {
        let selected_id = self.selected_lesson.as_ref().map(|l| &l.id);
        self.course
            .modules
            .iter()
            .enumerate()
            .map(|(index, module)| {
                let expanded = self.is_module_expanded(index);
                let lessons = if expanded {
                    module
                        .lessons
                        .iter()
                        .map(|lesson| {
                            let key = self.compute_lesson_key(lesson);
                            LessonOutline {
                                key,
                                title: lesson.title.clone(),
                                duration_minutes: lesson.duration_minutes,
                                completed: key.is_some_and(|k| self.is_complete(&k)),
                                selected: selected_id == Some(&lesson.id),
                            }
                        })
                        .collect()
                } else {
                    Vec::new()
                };
                ModuleOutline {
                    index,
                    title: module.title.clone(),
                    expanded,
                    lessons,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EnrollmentId, LearnerId, Module};

    fn course() -> Course {
        Course::new(
            "c1",
            "Course",
            vec![
                Module::new("Intro", 1, vec![Lesson::new("l01", "Welcome", 1)]),
                Module::new(
                    "Deep dive",
                    2,
                    vec![Lesson::new("l11", "Part 1", 1), Lesson::new("l12", "Part 2", 2)],
                ),
            ],
        )
    }

    fn enrolled() -> EnrollmentProgressTracker {
        let enrollment = Enrollment::new(
            EnrollmentId::new("e1"),
            LearnerId::new("u1"),
            course(),
            None,
        );
        EnrollmentProgressTracker::new(course(), Some(enrollment))
    }

    fn key(raw: &str) -> LessonKey {
        raw.parse().unwrap()
    }

    #[test]
    fn defaults_to_first_module_and_lesson() {
        let tracker = enrolled();
        assert_eq!(tracker.expanded_modules(), &BTreeSet::from([0]));
        assert_eq!(tracker.selected_lesson().map(|l| l.title.as_str()), Some("Welcome"));
        assert_eq!(tracker.selected_lesson_key(), Some(key("0-1")));
    }

    #[test]
    fn no_selection_when_first_module_is_empty() {
        let mut c = course();
        c.modules[0].lessons.clear();
        let tracker = EnrollmentProgressTracker::new(c, None);
        assert!(tracker.selected_lesson().is_none());
    }

    #[test]
    fn nothing_is_complete_without_enrollment() {
        let tracker = EnrollmentProgressTracker::new(course(), None);
        for raw in ["0-1", "1-1", "1-2", "9-9"] {
            assert!(!tracker.is_complete(&key(raw)));
        }
        assert_eq!(tracker.progress(), Progress::ZERO);
        let first = tracker.course().modules[0].lessons[0].clone();
        assert!(!tracker.can_mark_complete(&first));
    }

    #[test]
    fn record_completion_flips_can_mark_complete() {
        let mut tracker = enrolled();
        let lesson = tracker.course().modules[1].lessons[1].clone();
        assert!(tracker.can_mark_complete(&lesson));

        assert!(tracker.record_completion(key("1-2"), Progress::new(33).unwrap()));

        assert!(!tracker.can_mark_complete(&lesson));
        assert!(tracker.is_lesson_complete(&lesson));
        assert_eq!(tracker.progress().percent(), 33);
    }

    #[test]
    fn record_completion_twice_keeps_one_entry() {
        let mut tracker = enrolled();
        tracker.record_completion(key("0-1"), Progress::new(33).unwrap());
        assert!(!tracker.record_completion(key("0-1"), Progress::new(33).unwrap()));
        assert_eq!(tracker.completed_count(), 1);
    }

    #[test]
    fn record_completion_without_enrollment_is_noop() {
        let mut tracker = EnrollmentProgressTracker::new(course(), None);
        assert!(!tracker.record_completion(key("0-1"), Progress::COMPLETE));
        assert!(!tracker.is_complete(&key("0-1")));
    }

    #[test]
    fn toggle_module_twice_restores_membership() {
        let mut tracker = enrolled();
        for index in [0, 1, 42] {
            let before = tracker.is_module_expanded(index);
            tracker.toggle_module(index);
            assert_ne!(tracker.is_module_expanded(index), before);
            tracker.toggle_module(index);
            assert_eq!(tracker.is_module_expanded(index), before);
        }
    }

    #[test]
    fn foreign_lesson_cannot_be_marked() {
        let tracker = enrolled();
        let stranger = Lesson::new("nope", "Elsewhere", 1);
        assert!(tracker.compute_lesson_key(&stranger).is_none());
        assert!(!tracker.can_mark_complete(&stranger));
    }

    #[test]
    fn selection_does_not_touch_completion() {
        let mut tracker = enrolled();
        assert!(tracker.select_key(key("1-1")));
        assert!(!tracker.select_key(key("3-1")));
        assert_eq!(tracker.selected_lesson_key(), Some(key("1-1")));
        assert_eq!(tracker.completed_count(), 0);
    }

    #[test]
    fn outline_lists_lessons_of_expanded_modules_only() {
        let mut tracker = enrolled();
        tracker.record_completion(key("0-1"), Progress::new(33).unwrap());

        let outline = tracker.outline();
        assert_eq!(outline.len(), 2);
        assert!(outline[0].expanded);
        assert!(outline[0].lessons[0].completed);
        assert!(outline[0].lessons[0].selected);
        assert!(!outline[1].expanded);
        assert!(outline[1].lessons.is_empty());

        tracker.toggle_module(1);
        let outline = tracker.outline();
        assert_eq!(outline[1].lessons.len(), 2);
        assert_eq!(outline[1].lessons[1].key, Some(key("1-2")));
        assert!(!outline[1].lessons[1].completed);
    }
}
