use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::lesson_progress::{
    InsertLessonProgressEntity, LessonProgressEntity, UpdateLessonProgressEntity,
};

/// Body of a progress report coming from the lesson player.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RecordProgressModel {
    #[serde(default)]
    pub watch_time: i32,
    #[serde(default)]
    pub is_completed: bool,
}

/// Everything the store needs to apply one progress report atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordLessonProgressCommand {
    pub enrollment_id: Uuid,
    pub course_id: Uuid,
    pub lesson_id: Uuid,
    pub watch_time_sec: i32,
    pub completed: bool,
    pub now: DateTime<Utc>,
}

/// Latch state of a single (enrollment, lesson) pair.
///
/// `watch_time_sec` never decreases and `is_completed` never goes back to false.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LessonProgressState {
    pub is_completed: bool,
    pub watch_time_sec: i32,
    pub completed_at: Option<DateTime<Utc>>,
}

impl LessonProgressState {
    pub fn fresh() -> Self {
        Self {
            is_completed: false,
            watch_time_sec: 0,
            completed_at: None,
        }
    }

    pub fn advance(self, watch_time_sec: i32, completed: bool, now: DateTime<Utc>) -> Self {
        let watch_time_sec = self.watch_time_sec.max(watch_time_sec);

        if self.is_completed {
            return Self {
                is_completed: true,
                watch_time_sec,
                completed_at: self.completed_at.or(Some(now)),
            };
        }

        Self {
            is_completed: completed,
            watch_time_sec,
            completed_at: completed.then_some(now),
        }
    }

    pub fn to_insert_entity(
        &self,
        enrollment_id: Uuid,
        lesson_id: Uuid,
        now: DateTime<Utc>,
    ) -> InsertLessonProgressEntity {
        InsertLessonProgressEntity {
            enrollment_id,
            lesson_id,
            is_completed: self.is_completed,
            watch_time_sec: self.watch_time_sec,
            completed_at: self.completed_at,
            last_watched_at: now,
        }
    }

    pub fn to_update_entity(&self, now: DateTime<Utc>) -> UpdateLessonProgressEntity {
        UpdateLessonProgressEntity {
            is_completed: self.is_completed,
            watch_time_sec: self.watch_time_sec,
            completed_at: self.completed_at,
            last_watched_at: now,
        }
    }
}

impl From<&LessonProgressEntity> for LessonProgressState {
    fn from(entity: &LessonProgressEntity) -> Self {
        Self {
            is_completed: entity.is_completed,
            watch_time_sec: entity.watch_time_sec,
            completed_at: entity.completed_at,
        }
    }
}

/// Share of completed lessons, in percent. A course without lessons is at 0.
pub fn course_progress_percentage(completed_lessons: i64, total_lessons: i64) -> f64 {
    if total_lessons <= 0 {
        return 0.0;
    }

    let completed = completed_lessons.clamp(0, total_lessons);
    completed as f64 / total_lessons as f64 * 100.0
}

/// Course completion is stamped once, the first time progress reaches 100%.
pub fn course_completed_at(
    progress_percentage: f64,
    current: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match current {
        Some(completed_at) => Some(completed_at),
        None if progress_percentage >= 100.0 => Some(now),
        None => None,
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProgressSnapshot {
    pub enrollment_id: Uuid,
    pub lesson_id: Uuid,
    pub watch_time_sec: i32,
    pub lesson_completed: bool,
    pub progress_percentage: f64,
    pub course_completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LessonProgressModel {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub lesson_id: Uuid,
    pub is_completed: bool,
    pub watch_time_sec: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_watched_at: DateTime<Utc>,
}

impl From<LessonProgressEntity> for LessonProgressModel {
    fn from(entity: LessonProgressEntity) -> Self {
        Self {
            id: entity.id,
            enrollment_id: entity.enrollment_id,
            lesson_id: entity.lesson_id,
            is_completed: entity.is_completed,
            watch_time_sec: entity.watch_time_sec,
            completed_at: entity.completed_at,
            last_watched_at: entity.last_watched_at,
        }
    }
}

/// A row of the "continue watching" feed.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecentLessonActivity {
    pub lesson_id: Uuid,
    pub lesson_title: String,
    pub course_id: Uuid,
    pub course_title: String,
    pub watch_time_sec: i32,
    pub is_completed: bool,
    pub last_watched_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn watch_time_never_regresses() {
        let now = Utc::now();
        let state = LessonProgressState::fresh()
            .advance(120, false, now)
            .advance(30, false, now + Duration::seconds(5));

        assert_eq!(state.watch_time_sec, 120);

        let state = state.advance(300, false, now + Duration::seconds(10));
        assert_eq!(state.watch_time_sec, 300);
    }

    #[test]
    fn completion_latches_and_keeps_first_timestamp() {
        let first = Utc::now();
        let later = first + Duration::minutes(3);

        let state = LessonProgressState::fresh().advance(10, true, first);
        assert!(state.is_completed);
        assert_eq!(state.completed_at, Some(first));

        let state = state.advance(5, false, later);
        assert!(state.is_completed);
        assert_eq!(state.completed_at, Some(first));
        assert_eq!(state.watch_time_sec, 10);
    }

    #[test]
    fn incomplete_report_does_not_stamp_completion() {
        let state = LessonProgressState::fresh().advance(42, false, Utc::now());

        assert!(!state.is_completed);
        assert_eq!(state.completed_at, None);
    }

    #[test]
    fn percentage_is_share_of_completed_lessons() {
        assert_eq!(course_progress_percentage(2, 4), 50.0);
        assert_eq!(course_progress_percentage(4, 4), 100.0);
        assert_eq!(course_progress_percentage(0, 4), 0.0);
        assert_eq!(course_progress_percentage(3, 3), 100.0);
    }

    #[test]
    fn percentage_is_zero_without_lessons_and_bounded() {
        assert_eq!(course_progress_percentage(0, 0), 0.0);
        assert_eq!(course_progress_percentage(3, 0), 0.0);
        assert_eq!(course_progress_percentage(7, 4), 100.0);
        assert_eq!(course_progress_percentage(-1, 4), 0.0);

        for total in 1..=12 {
            for completed in 0..=total {
                let pct = course_progress_percentage(completed, total);
                assert!((0.0..=100.0).contains(&pct));
            }
        }
    }

    #[test]
    fn course_completion_is_stamped_once() {
        let first = Utc::now();
        let later = first + Duration::days(1);

        assert_eq!(course_completed_at(50.0, None, first), None);
        assert_eq!(course_completed_at(100.0, None, first), Some(first));
        assert_eq!(course_completed_at(100.0, Some(first), later), Some(first));
        assert_eq!(course_completed_at(75.0, Some(first), later), Some(first));
    }
}
