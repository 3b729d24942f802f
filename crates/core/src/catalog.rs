//! Course browsing: search, category filter, sorting and pagination.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::model::Course;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    CreatedAt,
    Price,
    Title,
    TotalEnrollments,
}

impl SortField {
    #[must_use]
    pub fn as_param(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "createdAt",
            SortField::Price => "price",
            SortField::Title => "title",
            SortField::TotalEnrollments => "totalEnrollments",
        }
    }

    #[must_use]
    pub fn from_param(raw: &str) -> Option<Self> {
        match raw {
            "createdAt" => Some(Self::CreatedAt),
            "price" => Some(Self::Price),
            "title" => Some(Self::Title),
            "totalEnrollments" => Some(Self::TotalEnrollments),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    #[must_use]
    pub fn as_param(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    #[must_use]
    pub fn from_param(raw: &str) -> Option<Self> {
        match raw {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Filters for the public course listing. Defaults to newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort_by: SortField,
    pub order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self {
            search: None,
            category: None,
            sort_by: SortField::default(),
            order: SortOrder::default(),
            page: 1,
            limit: 12,
        }
    }
}

/// One page of courses as returned by a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursePage {
    pub courses: Vec<Course>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page", alias = "currentPage")]
    pub page: u32,
    #[serde(default, alias = "totalPages")]
    pub pages: u32,
}

fn first_page() -> u32 {
    1
}

impl CatalogQuery {
    /// Query-string pairs for the listing endpoint. Blank filters are omitted.
    #[must_use]
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(6);
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(("search", search.to_string()));
        }
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            params.push(("category", category.to_string()));
        }
        params.push(("sortBy", self.sort_by.as_param().to_string()));
        params.push(("order", self.order.as_param().to_string()));
        params.push(("page", self.page.max(1).to_string()));
        params.push(("limit", self.limit.max(1).to_string()));
        params
    }

    /// Plain substring filter; no relevance ranking.
    #[must_use]
    pub fn matches(&self, course: &Course) -> bool {
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            if course.category != category {
                return false;
            }
        }

        let Some(needle) = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            return true;
        };
        let needle = needle.to_lowercase();
        let hit = |s: &str| s.to_lowercase().contains(&needle);
        hit(&course.title)
            || hit(&course.description)
            || hit(&course.instructor)
            || course.tags.iter().any(|t| hit(t.as_str()))
    }

    fn compare(&self, a: &Course, b: &Course) -> Ordering {
        let ordering = match self.sort_by {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Price => a.price.total_cmp(&b.price),
            SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortField::TotalEnrollments => a.total_enrollments.cmp(&b.total_enrollments),
        };
        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }

    /// Filters, sorts and paginates an in-memory course list.
    #[must_use]
    pub fn apply(&self, courses: Vec<Course>) -> CoursePage {
        let mut matching: Vec<Course> = courses.into_iter().filter(|c| self.matches(c)).collect();
        matching.sort_by(|a, b| self.compare(a, b));

        let limit = self.limit.max(1);
        let page = self.page.max(1);
        let total = matching.len() as u64;
        let pages = u32::try_from(total.div_ceil(u64::from(limit))).unwrap_or(u32::MAX);
        let skip = usize::try_from(u64::from(page - 1) * u64::from(limit)).unwrap_or(usize::MAX);
        let courses = matching
            .into_iter()
            .skip(skip)
            .take(limit as usize)
            .collect();

        CoursePage {
            courses,
            total,
            page,
            pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn course(id: &str, title: &str, category: &str, price: f64, age_days: i64) -> Course {
        let mut c = Course::new(id, title, Vec::new());
        c.category = category.to_string();
        c.price = price;
        c.created_at = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() - Duration::days(age_days));
        c
    }

    fn courses() -> Vec<Course> {
        vec![
            course("a", "React Hooks", "Web Development", 30.0, 3),
            course("b", "Algorithms", "Computer Science", 10.0, 1),
            course("c", "React Native", "Web Development", 50.0, 2),
        ]
    }

    #[test]
    fn default_query_is_newest_first() {
        let page = CatalogQuery::default().apply(courses());
        let ids: Vec<&str> = page.courses.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
        assert_eq!(page.total, 3);
        assert_eq!(page.pages, 1);
    }

    #[test]
    fn search_is_case_insensitive_and_combines_with_category() {
        let query = CatalogQuery {
            search: Some("react".into()),
            category: Some("Web Development".into()),
            sort_by: SortField::Price,
            order: SortOrder::Asc,
            ..CatalogQuery::default()
        };
        let page = query.apply(courses());
        let ids: Vec<&str> = page.courses.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[test]
    fn paginates_after_sorting() {
        let query = CatalogQuery {
            sort_by: SortField::Title,
            order: SortOrder::Asc,
            page: 2,
            limit: 2,
            ..CatalogQuery::default()
        };
        let page = query.apply(courses());
        assert_eq!(page.pages, 2);
        assert_eq!(page.courses.len(), 1);
        assert_eq!(page.courses[0].id.as_str(), "c");
    }

    #[test]
    fn params_skip_blank_filters() {
        let query = CatalogQuery {
            search: Some("   ".into()),
            ..CatalogQuery::default()
        };
        let keys: Vec<&str> = query.to_params().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, ["sortBy", "order", "page", "limit"]);
    }
}
