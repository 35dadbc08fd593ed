use anyhow::Result;
use async_trait::async_trait;
use diesel::{PgConnection, RunQueryDsl, dsl::count_star, prelude::*};
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

use crate::{
    domain,
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{course_modules, courses, enrollments, lessons},
    },
};
use domain::{
    entities::{course_modules::CourseModuleEntity, courses::CourseEntity, lessons::LessonEntity},
    repositories::courses::CourseRepository,
    value_objects::{
        catalog::{CourseFilter, ModuleWithLessons, contains_pattern},
        lessons::LessonWithCourse,
    },
};

pub struct CoursePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CoursePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

/// Active lessons inside active modules of the course.
pub(crate) fn count_active_lessons(conn: &mut PgConnection, course_id: Uuid) -> QueryResult<i64> {
    lessons::table
        .inner_join(course_modules::table.on(course_modules::id.eq(lessons::module_id)))
        .filter(course_modules::course_id.eq(course_id))
        .filter(course_modules::is_active.eq(true))
        .filter(lessons::is_active.eq(true))
        .select(count_star())
        .first::<i64>(conn)
}

#[async_trait]
impl CourseRepository for CoursePostgres {
    async fn list_active(&self, filter: CourseFilter) -> Result<Vec<CourseEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = courses::table
            .filter(courses::is_active.eq(true))
            .select(CourseEntity::as_select())
            .into_boxed();

        if let Some(category) = filter.category {
            query = query.filter(courses::category.eq(category));
        }
        if let Some(level) = filter.level {
            query = query.filter(courses::level.eq(level));
        }
        if let Some(search) = filter.search {
            let pattern = contains_pattern(&search);
            query = query.filter(
                courses::title
                    .ilike(pattern.clone())
                    .or(courses::description.ilike(pattern)),
            );
        }

        let results = query
            .order(courses::created_at.desc())
            .load::<CourseEntity>(&mut conn)?;

        Ok(results)
    }

    async fn distinct_categories(&self) -> Result<Vec<String>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = courses::table
            .filter(courses::is_active.eq(true))
            .select(courses::category)
            .distinct()
            .order(courses::category.asc())
            .load::<String>(&mut conn)?;

        Ok(results)
    }

    async fn distinct_levels(&self) -> Result<Vec<String>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = courses::table
            .filter(courses::is_active.eq(true))
            .select(courses::level)
            .distinct()
            .order(courses::level.asc())
            .load::<String>(&mut conn)?;

        Ok(results)
    }

    async fn search(&self, query: String, limit: i64) -> Result<Vec<CourseEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let pattern = contains_pattern(&query);
        let results = courses::table
            .filter(courses::is_active.eq(true))
            .filter(
                courses::title
                    .ilike(pattern.clone())
                    .or(courses::description.ilike(pattern.clone()))
                    .or(courses::category.ilike(pattern)),
            )
            .select(CourseEntity::as_select())
            .order(courses::title.asc())
            .limit(limit)
            .load::<CourseEntity>(&mut conn)?;

        Ok(results)
    }

    async fn featured(&self, limit: i64) -> Result<Vec<CourseEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = courses::table
            .filter(courses::is_active.eq(true))
            .select(CourseEntity::as_select())
            .order((courses::is_premium.desc(), courses::created_at.desc()))
            .limit(limit)
            .load::<CourseEntity>(&mut conn)?;

        Ok(results)
    }

    async fn find_active_by_slug(&self, slug: String) -> Result<Option<CourseEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = courses::table
            .filter(courses::slug.eq(slug))
            .filter(courses::is_active.eq(true))
            .select(CourseEntity::as_select())
            .first::<CourseEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_active_by_id(&self, course_id: Uuid) -> Result<Option<CourseEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = courses::table
            .filter(courses::id.eq(course_id))
            .filter(courses::is_active.eq(true))
            .select(CourseEntity::as_select())
            .first::<CourseEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn list_modules_with_lessons(&self, course_id: Uuid) -> Result<Vec<ModuleWithLessons>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let modules = course_modules::table
            .filter(course_modules::course_id.eq(course_id))
            .filter(course_modules::is_active.eq(true))
            .select(CourseModuleEntity::as_select())
            .order(course_modules::order_index.asc())
            .load::<CourseModuleEntity>(&mut conn)?;

        let module_ids: Vec<Uuid> = modules.iter().map(|module| module.id).collect();
        let lessons = lessons::table
            .filter(lessons::module_id.eq_any(&module_ids))
            .filter(lessons::is_active.eq(true))
            .select(LessonEntity::as_select())
            .order(lessons::order_index.asc())
            .load::<LessonEntity>(&mut conn)?;

        let mut lessons_by_module: HashMap<Uuid, Vec<LessonEntity>> = HashMap::new();
        for lesson in lessons {
            lessons_by_module
                .entry(lesson.module_id)
                .or_default()
                .push(lesson);
        }

        let results = modules
            .into_iter()
            .map(|module| {
                let lessons = lessons_by_module.remove(&module.id).unwrap_or_default();
                ModuleWithLessons { module, lessons }
            })
            .collect();

        Ok(results)
    }

    async fn count_lessons(&self, course_id: Uuid) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let total = count_active_lessons(&mut conn, course_id)?;

        Ok(total)
    }

    async fn count_enrollments(&self, course_id: Uuid) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let total = enrollments::table
            .filter(enrollments::course_id.eq(course_id))
            .filter(enrollments::is_active.eq(true))
            .select(count_star())
            .first::<i64>(&mut conn)?;

        Ok(total)
    }

    async fn find_lesson(&self, lesson_id: Uuid) -> Result<Option<LessonWithCourse>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = lessons::table
            .inner_join(course_modules::table.on(course_modules::id.eq(lessons::module_id)))
            .inner_join(courses::table.on(courses::id.eq(course_modules::course_id)))
            .filter(lessons::id.eq(lesson_id))
            .filter(lessons::is_active.eq(true))
            .filter(course_modules::is_active.eq(true))
            .filter(courses::is_active.eq(true))
            .select((LessonEntity::as_select(), courses::id, courses::slug))
            .first::<(LessonEntity, Uuid, String)>(&mut conn)
            .optional()?;

        Ok(result.map(|(lesson, course_id, course_slug)| LessonWithCourse {
            lesson,
            course_id,
            course_slug,
        }))
    }
}
