use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{CourseId, LessonId};
use crate::model::lesson_key::LessonKey;

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// A single video lesson inside a module.
///
/// `order` is the 1-based position assigned when the lesson was authored. It is
/// not kept in sync with the lesson's array position when lessons are removed
/// or reordered later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    #[serde(rename = "_id", alias = "id")]
    pub id: LessonId,
    pub title: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(rename = "duration", default)]
    pub duration_minutes: u32,
    pub order: u32,
}

impl Lesson {
    #[must_use]
    pub fn new(id: impl Into<LessonId>, title: impl Into<String>, order: u32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            video_url: String::new(),
            duration_minutes: 0,
            order,
        }
    }

    #[must_use]
    pub fn with_video_url(mut self, video_url: impl Into<String>) -> Self {
        self.video_url = video_url.into();
        self
    }

    #[must_use]
    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = minutes;
        self
    }
}

//
// ─── MODULE ────────────────────────────────────────────────────────────────────
//

/// An authored group of lessons. Module position in `Course::modules` is the
/// module index used by lesson keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub title: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Module {
    #[must_use]
    pub fn new(title: impl Into<String>, order: u32, lessons: Vec<Lesson>) -> Self {
        Self {
            title: title.into(),
            order,
            lessons,
        }
    }

    /// Returns true if a lesson with the same id belongs to this module.
    #[must_use]
    pub fn contains(&self, lesson_id: &LessonId) -> bool {
        self.lessons.iter().any(|l| &l.id == lesson_id)
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.lessons.iter().map(|l| l.duration_minutes).sum()
    }
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A published course with its authored module/lesson tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "_id", alias = "id")]
    pub id: CourseId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instructor: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub total_enrollments: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Course {
    #[must_use]
    pub fn new(id: impl Into<CourseId>, title: impl Into<String>, modules: Vec<Module>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            instructor: String::new(),
            price: 0.0,
            thumbnail: String::new(),
            category: String::new(),
            tags: Vec::new(),
            modules,
            total_enrollments: 0,
            created_at: None,
        }
    }

    /// Index of the first module that contains a lesson with this id.
    #[must_use]
    pub fn module_index_of(&self, lesson_id: &LessonId) -> Option<usize> {
        self.modules.iter().position(|m| m.contains(lesson_id))
    }

    /// Computes the progress identity of `lesson` within this course tree.
    ///
    /// Uses the first module containing a lesson with the same id and the
    /// lesson's authored `order`. Returns `None` when no module contains the
    /// lesson, or when its order is 0.
    #[must_use]
    pub fn lesson_key(&self, lesson: &Lesson) -> Option<LessonKey> {
        let module_index = self.module_index_of(&lesson.id)?;
        LessonKey::new(module_index, lesson.order).ok()
    }

    /// Resolves a key back to the lesson it addresses in this tree.
    #[must_use]
    pub fn lesson_at(&self, key: LessonKey) -> Option<&Lesson> {
        self.modules
            .get(key.module_index())?
            .lessons
            .iter()
            .find(|l| l.order == key.order())
    }

    #[must_use]
    pub fn first_lesson(&self) -> Option<&Lesson> {
        self.modules.first().and_then(|m| m.lessons.first())
    }

    #[must_use]
    pub fn total_lessons(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }

    #[must_use]
    pub fn total_duration_minutes(&self) -> u32 {
        self.modules.iter().map(Module::duration_minutes).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Course {
        Course::new(
            "c1",
            "Rust for Web",
            vec![
                Module::new("Intro", 1, vec![Lesson::new("l1", "Welcome", 1).with_duration(5)]),
                Module::new(
                    "Ownership",
                    2,
                    vec![
                        // Lesson 1 was deleted after authoring; order 2 and 3 remain.
                        Lesson::new("l3", "Borrowing", 3).with_duration(12),
                        Lesson::new("l2", "Moves", 2).with_duration(8),
                    ],
                ),
            ],
        )
    }

    #[test]
    fn lesson_key_uses_authored_order_not_position() {
        let course = sample();
        let borrowing = &course.modules[1].lessons[0];
        let key = course.lesson_key(borrowing).unwrap();
        assert_eq!(key.to_string(), "1-3");
    }

    #[test]
    fn lesson_key_is_none_for_foreign_lesson() {
        let course = sample();
        let stranger = Lesson::new("elsewhere", "Other", 1);
        assert!(course.lesson_key(&stranger).is_none());
    }

    #[test]
    fn lesson_key_uses_first_containing_module() {
        let mut course = sample();
        let shared = Lesson::new("l3", "Borrowing (copy)", 4);
        course.modules[0].lessons.push(shared.clone());
        assert_eq!(course.lesson_key(&shared).unwrap().to_string(), "0-4");
    }

    #[test]
    fn lesson_at_resolves_by_order() {
        let course = sample();
        let key: LessonKey = "1-2".parse().unwrap();
        assert_eq!(course.lesson_at(key).map(|l| l.title.as_str()), Some("Moves"));
        assert!(course.lesson_at("1-1".parse().unwrap()).is_none());
        assert!(course.lesson_at("7-1".parse().unwrap()).is_none());
    }

    #[test]
    fn totals_cover_all_modules() {
        let course = sample();
        assert_eq!(course.total_lessons(), 3);
        assert_eq!(course.total_duration_minutes(), 25);
    }

    #[test]
    fn deserializes_api_payload() {
        let json = r#"{
            "_id": "65b0",
            "title": "Design Basics",
            "instructor": "Ada",
            "price": 19.99,
            "category": "Design",
            "totalEnrollments": 4,
            "modules": [
                { "_id": "m0", "title": "Color", "order": 1, "lessons": [
                    { "_id": "x1", "title": "Hue", "videoUrl": "https://example.com/v", "duration": 7, "order": 1 }
                ]}
            ]
        }"#;
        let course: Course = serde_json::from_str(json).unwrap();
        assert_eq!(course.id, CourseId::new("65b0"));
        assert_eq!(course.total_enrollments, 4);
        assert_eq!(course.modules[0].lessons[0].duration_minutes, 7);
        assert!(course.created_at.is_none());
    }
}
