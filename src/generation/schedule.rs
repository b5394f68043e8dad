//! Schedule Builder
//!
//! Distributes an ordered module list across weekly periods given the
//! user's weekly-hour budget. Assignment is a contiguous slice of the
//! id list into equal-sized chunks; it does not rebalance by
//! per-module duration.

use chrono::{Duration, NaiveDate, Utc};

use crate::store::{NewSchedule, Store};

use super::error::GenerationResult;
use super::types::ScheduleStatus;

/// Builds and persists the weekly schedule for a path.
pub struct ScheduleBuilder {
    store: Store,
}

impl ScheduleBuilder {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Create one schedule row per week, starting today. Week 1 is
    /// `active`, later weeks `upcoming`.
    pub fn build(
        &self,
        user_id: i64,
        path_id: i64,
        modules: &[(i64, i64)],
        weekly_hours: i64,
    ) -> GenerationResult<Vec<NewSchedule>> {
        let rows = plan_weeks(user_id, path_id, modules, weekly_hours, Utc::now().date_naive());
        self.store.insert_schedules(&rows)?;
        Ok(rows)
    }
}

/// Pure scheduling computation over (module_id, duration_minutes)
/// pairs. `weeks = max(1, ceil(total_minutes / (hours * 60)))`.
pub fn plan_weeks(
    user_id: i64,
    path_id: i64,
    modules: &[(i64, i64)],
    weekly_hours: i64,
    start: NaiveDate,
) -> Vec<NewSchedule> {
    let total_minutes: i64 = modules.iter().map(|(_, duration)| duration).sum();
    let minutes_per_week = weekly_hours.max(1) * 60;
    let weeks_needed = ((total_minutes + minutes_per_week - 1) / minutes_per_week).max(1);
    let chunk_size = ((modules.len() as i64 + weeks_needed - 1) / weeks_needed).max(1) as usize;

    let mut rows = Vec::with_capacity(weeks_needed as usize);
    for week in 0..weeks_needed {
        let start_date = start + Duration::days(week * 7);
        let module_ids: Vec<i64> = modules
            .iter()
            .skip(week as usize * chunk_size)
            .take(chunk_size)
            .map(|(id, _)| *id)
            .collect();
        rows.push(NewSchedule {
            user_id,
            learning_path_id: path_id,
            period_number: week + 1,
            start_date,
            end_date: start_date + Duration::days(6),
            module_ids,
            status: if week == 0 {
                ScheduleStatus::Active
            } else {
                ScheduleStatus::Upcoming
            },
            completion_percentage: 0.0,
        });
    }
    rows
}
