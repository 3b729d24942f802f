use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

use crate::model::course::{Course, Lesson, Module};
use crate::model::ids::{CourseId, LessonId};
use crate::model::lesson_key::LessonKey;

/// Categories offered by the authoring form.
pub const CATEGORIES: [&str; 5] = [
    "Web Development",
    "Computer Science",
    "Data Science",
    "Design",
    "Business",
];

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseDraftError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("course description cannot be empty")]
    EmptyDescription,

    #[error("instructor cannot be empty")]
    EmptyInstructor,

    #[error("price must be a non-negative number")]
    InvalidPrice,

    #[error("thumbnail is not a valid URL: {0}")]
    InvalidThumbnail(String),

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("module {module} lesson {lesson}: video URL is not valid")]
    InvalidVideoUrl { module: usize, lesson: usize },

    #[error("module {module} lesson {lesson}: order must be >= 1")]
    ZeroLessonOrder { module: usize, lesson: usize },

    #[error("module {module}: lesson order {order} is used twice")]
    DuplicateLessonOrder { module: usize, order: u32 },
}

//
// ─── DRAFTS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDraft {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LessonId>,
    pub title: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(rename = "duration", default)]
    pub duration_minutes: u32,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDraft {
    pub title: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub lessons: Vec<LessonDraft>,
}

/// Editable form state for creating or updating a course.
///
/// Lessons keep the `order` they were authored with. Newly added modules and
/// lessons take the next order after the current maximum, so removing an
/// entry never causes two siblings to share an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDraft {
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub price: f64,
    pub thumbnail: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub modules: Vec<ModuleDraft>,
}

impl Default for CourseDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            instructor: String::new(),
            price: 0.0,
            thumbnail: String::new(),
            category: CATEGORIES[0].to_string(),
            tags: Vec::new(),
            modules: Vec::new(),
        }
    }
}

/// Splits a comma-separated tag field, dropping blanks.
#[must_use]
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect()
}

impl CourseDraft {
    /// Prefills the form from an existing course (edit flow).
    #[must_use]
    pub fn from_course(course: &Course) -> Self {
        Self {
            title: course.title.clone(),
            description: course.description.clone(),
            instructor: course.instructor.clone(),
            price: course.price,
            thumbnail: course.thumbnail.clone(),
            category: course.category.clone(),
            tags: course.tags.clone(),
            modules: course
                .modules
                .iter()
                .map(|m| ModuleDraft {
                    title: m.title.clone(),
                    order: m.order,
                    lessons: m
                        .lessons
                        .iter()
                        .map(|l| LessonDraft {
                            id: Some(l.id.clone()),
                            title: l.title.clone(),
                            video_url: l.video_url.clone(),
                            duration_minutes: l.duration_minutes,
                            order: l.order,
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn set_tags(&mut self, input: &str) {
        self.tags = parse_tags(input);
    }

    /// Appends an empty module and returns its index.
    pub fn add_module(&mut self, title: impl Into<String>) -> usize {
        let order = self.modules.iter().map(|m| m.order).max().unwrap_or(0) + 1;
        self.modules.push(ModuleDraft {
            title: title.into(),
            order,
            lessons: Vec::new(),
        });
        self.modules.len() - 1
    }

    pub fn remove_module(&mut self, index: usize) -> Option<ModuleDraft> {
        (index < self.modules.len()).then(|| self.modules.remove(index))
    }

    /// Appends a lesson to a module, assigning the next free order.
    ///
    /// Returns `None` if the module does not exist.
    pub fn add_lesson(
        &mut self,
        module_index: usize,
        title: impl Into<String>,
        video_url: impl Into<String>,
        duration_minutes: u32,
    ) -> Option<&mut LessonDraft> {
        let module = self.modules.get_mut(module_index)?;
        let order = module.lessons.iter().map(|l| l.order).max().unwrap_or(0) + 1;
        module.lessons.push(LessonDraft {
            id: None,
            title: title.into(),
            video_url: video_url.into(),
            duration_minutes,
            order,
        });
        module.lessons.last_mut()
    }

    pub fn remove_lesson(&mut self, module_index: usize, lesson_index: usize) -> Option<LessonDraft> {
        let module = self.modules.get_mut(module_index)?;
        (lesson_index < module.lessons.len()).then(|| module.lessons.remove(lesson_index))
    }

    /// Checks the form the way the authoring surface requires.
    ///
    /// # Errors
    ///
    /// Returns the first `CourseDraftError` found.
    pub fn validate(&self) -> Result<(), CourseDraftError> {
        if self.title.trim().is_empty() {
            return Err(CourseDraftError::EmptyTitle);
        }
        if self.description.trim().is_empty() {
            return Err(CourseDraftError::EmptyDescription);
        }
        if self.instructor.trim().is_empty() {
            return Err(CourseDraftError::EmptyInstructor);
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(CourseDraftError::InvalidPrice);
        }
        if Url::parse(self.thumbnail.trim()).is_err() {
            return Err(CourseDraftError::InvalidThumbnail(self.thumbnail.clone()));
        }
        if !CATEGORIES.contains(&self.category.as_str()) {
            return Err(CourseDraftError::UnknownCategory(self.category.clone()));
        }

        for (module_index, module) in self.modules.iter().enumerate() {
            let mut seen = HashSet::new();
            for (lesson_index, lesson) in module.lessons.iter().enumerate() {
                if lesson.order == 0 {
                    return Err(CourseDraftError::ZeroLessonOrder {
                        module: module_index,
                        lesson: lesson_index,
                    });
                }
                if !seen.insert(lesson.order) {
                    return Err(CourseDraftError::DuplicateLessonOrder {
                        module: module_index,
                        order: lesson.order,
                    });
                }
                let video = lesson.video_url.trim();
                if !video.is_empty() && Url::parse(video).is_err() {
                    return Err(CourseDraftError::InvalidVideoUrl {
                        module: module_index,
                        lesson: lesson_index,
                    });
                }
            }
        }
        Ok(())
    }

    /// Gives each lesson without an id the id of the lesson `existing` holds
    /// at the same module index and order.
    ///
    /// An id already carried elsewhere in the draft is never handed out twice.
    pub fn adopt_lesson_ids(&mut self, existing: &Course) {
        let mut claimed: HashSet<LessonId> = self
            .modules
            .iter()
            .flat_map(|m| m.lessons.iter())
            .filter_map(|l| l.id.clone())
            .collect();

        for (module_index, module) in self.modules.iter_mut().enumerate() {
            for lesson in module.lessons.iter_mut().filter(|l| l.id.is_none()) {
                let Ok(key) = LessonKey::new(module_index, lesson.order) else {
                    continue;
                };
                if let Some(stored) = existing.lesson_at(key) {
                    if claimed.insert(stored.id.clone()) {
                        lesson.id = Some(stored.id.clone());
                    }
                }
            }
        }
    }

    /// Materializes a validated draft as a course, minting ids for new lessons.
    ///
    /// # Errors
    ///
    /// Returns `CourseDraftError` if the draft does not validate.
    pub fn into_course(
        self,
        id: CourseId,
        created_at: Option<DateTime<Utc>>,
    ) -> Result<Course, CourseDraftError> {
        self.validate()?;
        let modules = self
            .modules
            .into_iter()
            .map(|m| Module {
                title: m.title,
                order: m.order,
                lessons: m
                    .lessons
                    .into_iter()
                    .map(|l| Lesson {
                        id: l.id.unwrap_or_else(LessonId::generate),
                        title: l.title,
                        video_url: l.video_url.trim().to_string(),
                        duration_minutes: l.duration_minutes,
                        order: l.order,
                    })
                    .collect(),
            })
            .collect();

        Ok(Course {
            id,
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            instructor: self.instructor.trim().to_string(),
            price: self.price,
            thumbnail: self.thumbnail.trim().to_string(),
            category: self.category,
            tags: self.tags,
            modules,
            total_enrollments: 0,
            created_at,
        })
    }
}
