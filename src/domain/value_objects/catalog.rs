use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::{course_modules::CourseModuleEntity, courses::CourseEntity, lessons::LessonEntity},
    value_objects::enrollments::EnrollmentModel,
};

pub const SEARCH_RESULT_LIMIT: i64 = 10;
pub const DEFAULT_FEATURED_LIMIT: i64 = 6;

/// Catalog filter. Blank values are treated as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CourseFilter {
    pub category: Option<String>,
    pub level: Option<String>,
    pub search: Option<String>,
}

impl CourseFilter {
    pub fn normalized(self) -> Self {
        Self {
            category: non_blank(self.category),
            level: non_blank(self.level),
            search: non_blank(self.search),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Builds an `ILIKE` pattern matching `term` anywhere, with LIKE wildcards in the term escaped.
pub fn contains_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourseSummaryDto {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub category: String,
    pub level: String,
    pub price_minor: i32,
    pub currency: String,
    pub duration_hours: i32,
    pub thumbnail_url: Option<String>,
    pub instructor_name: Option<String>,
    pub is_premium: bool,
    pub is_free: bool,
}

impl From<CourseEntity> for CourseSummaryDto {
    fn from(value: CourseEntity) -> Self {
        Self {
            is_free: value.is_free(),
            id: value.id,
            title: value.title,
            slug: value.slug,
            description: value.description,
            category: value.category,
            level: value.level,
            price_minor: value.price_minor,
            currency: value.currency,
            duration_hours: value.duration_hours,
            thumbnail_url: value.thumbnail_url,
            instructor_name: value.instructor_name,
            is_premium: value.is_premium,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CatalogPageDto {
    pub courses: Vec<CourseSummaryDto>,
    pub categories: Vec<String>,
    pub levels: Vec<String>,
    pub enrolled_course_ids: Vec<Uuid>,
    pub filter: CourseFilter,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CourseSearchHitDto {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub category: String,
    pub level: String,
    pub price_minor: i32,
    pub thumbnail_url: Option<String>,
}

impl From<CourseEntity> for CourseSearchHitDto {
    fn from(value: CourseEntity) -> Self {
        Self {
            id: value.id,
            title: value.title,
            slug: value.slug,
            category: value.category,
            level: value.level,
            price_minor: value.price_minor,
            thumbnail_url: value.thumbnail_url,
        }
    }
}

/// An active module together with its active lessons, both in `order_index` order.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleWithLessons {
    pub module: CourseModuleEntity,
    pub lessons: Vec<LessonEntity>,
}

pub fn total_lessons(modules: &[ModuleWithLessons]) -> usize {
    modules.iter().map(|m| m.lessons.len()).sum()
}

/// Lesson outline entry; the video and body are only served from the lesson endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LessonOutlineDto {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub video_duration_sec: Option<i32>,
    pub order_index: i32,
    pub is_free: bool,
}

impl From<LessonEntity> for LessonOutlineDto {
    fn from(value: LessonEntity) -> Self {
        Self {
            id: value.id,
            title: value.title,
            description: value.description,
            video_duration_sec: value.video_duration_sec,
            order_index: value.order_index,
            is_free: value.is_free,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModuleOutlineDto {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub order_index: i32,
    pub lessons: Vec<LessonOutlineDto>,
}

impl From<ModuleWithLessons> for ModuleOutlineDto {
    fn from(value: ModuleWithLessons) -> Self {
        Self {
            id: value.module.id,
            title: value.module.title,
            description: value.module.description,
            order_index: value.module.order_index,
            lessons: value.lessons.into_iter().map(LessonOutlineDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CourseDetailDto {
    #[serde(flatten)]
    pub course: CourseSummaryDto,
    pub trailer_url: Option<String>,
    pub prerequisites: Option<String>,
    pub learning_outcomes: Option<String>,
    pub modules: Vec<ModuleOutlineDto>,
    pub total_lessons: usize,
    pub enrollment_count: i64,
    pub is_enrolled: bool,
    pub enrollment: Option<EnrollmentModel>,
}

impl CourseDetailDto {
    pub fn new(
        course: CourseEntity,
        modules: Vec<ModuleWithLessons>,
        enrollment_count: i64,
        enrollment: Option<EnrollmentModel>,
    ) -> Self {
        let trailer_url = course.trailer_url.clone();
        let prerequisites = course.prerequisites.clone();
        let learning_outcomes = course.learning_outcomes.clone();
        let total_lessons = total_lessons(&modules);

        Self {
            course: CourseSummaryDto::from(course),
            trailer_url,
            prerequisites,
            learning_outcomes,
            modules: modules.into_iter().map(ModuleOutlineDto::from).collect(),
            total_lessons,
            enrollment_count,
            is_enrolled: enrollment.is_some(),
            enrollment,
        }
    }
}
