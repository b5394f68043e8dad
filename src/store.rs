//! Persistence Store
//!
//! SQLite-backed storage for users, preferences, learning paths,
//! modules, schedules, and module progress. Writes are per-statement
//! upserts/deletes; there is no pipeline-wide transaction. The status
//! guard for concurrent regeneration is the conditional update in
//! `try_mark_generating`.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::generation::types::{
    CohortGroup, Difficulty, LearningModule, LearningPath, LearningSchedule, ModuleType,
    PathPayload, PathStatus, Preferences, ScheduleStatus, User,
};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        cohort_group TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS preferences (
        user_id INTEGER PRIMARY KEY,
        skill_ids TEXT NOT NULL,
        interest_ids TEXT NOT NULL,
        course_id INTEGER,
        branch_id INTEGER,
        target_role TEXT,
        industry TEXT,
        experience_years INTEGER,
        weekly_hours INTEGER NOT NULL,
        learning_style TEXT
    );

    CREATE TABLE IF NOT EXISTS learning_paths (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        status TEXT NOT NULL,
        path TEXT,
        generation_error TEXT,
        generated_at TEXT,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS learning_modules (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        learning_path_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        module_type TEXT NOT NULL,
        difficulty TEXT NOT NULL,
        duration INTEGER NOT NULL,
        content_url TEXT,
        thumbnail_url TEXT,
        skill_tags TEXT NOT NULL,
        prerequisite_modules TEXT NOT NULL,
        order_in_path INTEGER NOT NULL,
        is_ai_generated INTEGER NOT NULL,
        generation_metadata TEXT NOT NULL,
        UNIQUE(learning_path_id, order_in_path)
    );

    CREATE TABLE IF NOT EXISTS learning_schedules (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        learning_path_id INTEGER NOT NULL,
        period_number INTEGER NOT NULL,
        start_date TEXT NOT NULL,
        end_date TEXT NOT NULL,
        schedule_data TEXT NOT NULL,
        status TEXT NOT NULL,
        completion_percentage REAL NOT NULL,
        UNIQUE(learning_path_id, period_number)
    );

    CREATE TABLE IF NOT EXISTS module_progress (
        user_id INTEGER NOT NULL,
        module_id INTEGER NOT NULL,
        status TEXT NOT NULL,
        PRIMARY KEY(user_id, module_id)
    );

    CREATE INDEX IF NOT EXISTS idx_paths_user ON learning_paths(user_id);
    CREATE INDEX IF NOT EXISTS idx_modules_path ON learning_modules(learning_path_id);
    CREATE INDEX IF NOT EXISTS idx_schedules_path ON learning_schedules(learning_path_id);
";

/// A module row about to be inserted by the materializer.
#[derive(Debug, Clone)]
pub struct NewModule {
    pub learning_path_id: i64,
    pub title: String,
    pub module_type: ModuleType,
    pub difficulty: Difficulty,
    pub duration: i64,
    pub content_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub skill_tags: Vec<String>,
    pub prerequisite_modules: Vec<i64>,
    pub order_in_path: i64,
    pub is_ai_generated: bool,
    pub generation_metadata: serde_json::Value,
}

/// A schedule row about to be inserted by the schedule builder.
#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub user_id: i64,
    pub learning_path_id: i64,
    pub period_number: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub module_ids: Vec<i64>,
    pub status: ScheduleStatus,
    pub completion_percentage: f64,
}

/// SQLite-backed persistence store.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database file and initialize the schema.
    pub fn open(db_path: Option<PathBuf>) -> SqlResult<Self> {
        let path = db_path.unwrap_or_else(|| PathBuf::from("learning_agent.db"));
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store for testing.
    pub fn in_memory() -> SqlResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // --------------------------------------------------------
    // USERS & PREFERENCES
    // --------------------------------------------------------

    pub fn insert_user(&self, name: &str, group: CohortGroup) -> SqlResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO users (name, cohort_group) VALUES (?1, ?2)",
            params![name, group.as_str()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_user(&self, user_id: i64) -> SqlResult<Option<User>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, name, cohort_group FROM users WHERE id = ?1",
            [user_id],
            |row| {
                let group_str: String = row.get(2)?;
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    group: CohortGroup::from_str(&group_str)
                        .unwrap_or(CohortGroup::CollegeStudents),
                })
            },
        )
        .optional()
    }

    pub fn upsert_preferences(&self, prefs: &Preferences) -> SqlResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO preferences
                (user_id, skill_ids, interest_ids, course_id, branch_id,
                 target_role, industry, experience_years, weekly_hours, learning_style)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(user_id) DO UPDATE SET
                skill_ids = excluded.skill_ids,
                interest_ids = excluded.interest_ids,
                course_id = excluded.course_id,
                branch_id = excluded.branch_id,
                target_role = excluded.target_role,
                industry = excluded.industry,
                experience_years = excluded.experience_years,
                weekly_hours = excluded.weekly_hours,
                learning_style = excluded.learning_style",
            params![
                prefs.user_id,
                serde_json::to_string(&prefs.skill_ids).unwrap_or_default(),
                serde_json::to_string(&prefs.interest_ids).unwrap_or_default(),
                prefs.course_id,
                prefs.branch_id,
                prefs.target_role,
                prefs.industry,
                prefs.experience_years,
                prefs.weekly_hours,
                prefs.learning_style,
            ],
        )?;
        Ok(())
    }

    pub fn get_preferences(&self, user_id: i64) -> SqlResult<Option<Preferences>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT user_id, skill_ids, interest_ids, course_id, branch_id,
                    target_role, industry, experience_years, weekly_hours, learning_style
             FROM preferences WHERE user_id = ?1",
            [user_id],
            row_to_preferences,
        )
        .optional()
    }

    // --------------------------------------------------------
    // LEARNING PATHS
    // --------------------------------------------------------

    pub fn create_path(&self, user_id: i64, name: &str) -> SqlResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO learning_paths (user_id, name, status, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                user_id,
                name,
                PathStatus::Generating.as_str(),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_path(&self, path_id: i64) -> SqlResult<Option<LearningPath>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, user_id, name, status, path, generation_error, generated_at, created_at
             FROM learning_paths WHERE id = ?1",
            [path_id],
            row_to_path,
        )
        .optional()
    }

    /// Most recent path for a user, by creation time.
    pub fn latest_path(&self, user_id: i64) -> SqlResult<Option<LearningPath>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, user_id, name, status, path, generation_error, generated_at, created_at
             FROM learning_paths WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC LIMIT 1",
            [user_id],
            row_to_path,
        )
        .optional()
    }

    pub fn count_paths(&self, user_id: i64) -> SqlResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM learning_paths WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )
    }

    /// Compare-and-swap the path into `generating`. Returns false when
    /// the path is already generating (another run owns it) or missing.
    pub fn try_mark_generating(&self, path_id: i64) -> SqlResult<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE learning_paths
             SET status = ?1, path = NULL, generation_error = NULL, generated_at = NULL
             WHERE id = ?2 AND status != ?1",
            params![PathStatus::Generating.as_str(), path_id],
        )?;
        Ok(updated == 1)
    }

    pub fn mark_completed(&self, path_id: i64, payload: &PathPayload) -> SqlResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE learning_paths
             SET status = ?1, path = ?2, generation_error = NULL, generated_at = ?3
             WHERE id = ?4",
            params![
                PathStatus::Completed.as_str(),
                serde_json::to_string(payload).unwrap_or_default(),
                Utc::now().to_rfc3339(),
                path_id
            ],
        )?;
        Ok(())
    }

    pub fn mark_failed(&self, path_id: i64, error: &str) -> SqlResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE learning_paths SET status = ?1, generation_error = ?2 WHERE id = ?3",
            params![PathStatus::Failed.as_str(), error, path_id],
        )?;
        Ok(())
    }

    /// Completed paths of other users in the same cohort group,
    /// paired with their owners' preferences. Donor candidates for
    /// the similarity matcher.
    pub fn donor_candidates(
        &self,
        group: CohortGroup,
        exclude_user_id: i64,
    ) -> SqlResult<Vec<(LearningPath, Preferences)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT p.id, p.user_id, p.name, p.status, p.path, p.generation_error,
                    p.generated_at, p.created_at,
                    pr.user_id, pr.skill_ids, pr.interest_ids, pr.course_id, pr.branch_id,
                    pr.target_role, pr.industry, pr.experience_years, pr.weekly_hours,
                    pr.learning_style
             FROM learning_paths p
             JOIN users u ON u.id = p.user_id
             JOIN preferences pr ON pr.user_id = p.user_id
             WHERE p.status = 'completed'
               AND p.user_id != ?1
               AND u.cohort_group = ?2
             ORDER BY p.created_at DESC",
            )?;

        let rows = stmt.query_map(params![exclude_user_id, group.as_str()], |row| {
            let path = row_to_path(row)?;
            let prefs = Preferences {
                user_id: row.get(8)?,
                skill_ids: json_column(row.get::<_, String>(9)?),
                interest_ids: json_column(row.get::<_, String>(10)?),
                course_id: row.get(11)?,
                branch_id: row.get(12)?,
                target_role: row.get(13)?,
                industry: row.get(14)?,
                experience_years: row.get(15)?,
                weekly_hours: row.get(16)?,
                learning_style: row.get(17)?,
            };
            Ok((path, prefs))
        })?;

        rows.collect()
    }

    // --------------------------------------------------------
    // LEARNING MODULES
    // --------------------------------------------------------

    pub fn insert_module(&self, module: &NewModule) -> SqlResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO learning_modules
                (learning_path_id, title, module_type, difficulty, duration,
                 content_url, thumbnail_url, skill_tags, prerequisite_modules,
                 order_in_path, is_ai_generated, generation_metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                module.learning_path_id,
                module.title,
                module.module_type.as_str(),
                module.difficulty.as_str(),
                module.duration,
                module.content_url,
                module.thumbnail_url,
                serde_json::to_string(&module.skill_tags).unwrap_or_default(),
                serde_json::to_string(&module.prerequisite_modules).unwrap_or_default(),
                module.order_in_path,
                module.is_ai_generated,
                module.generation_metadata.to_string(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn modules_for_path(&self, path_id: i64) -> SqlResult<Vec<LearningModule>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, learning_path_id, title, module_type, difficulty, duration,
                    content_url, thumbnail_url, skill_tags, prerequisite_modules,
                    order_in_path, is_ai_generated, generation_metadata
             FROM learning_modules WHERE learning_path_id = ?1
             ORDER BY order_in_path ASC",
        )?;
        let rows = stmt.query_map([path_id], row_to_module)?;
        rows.collect()
    }

    pub fn delete_modules_for_path(&self, path_id: i64) -> SqlResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM learning_modules WHERE learning_path_id = ?1",
            [path_id],
        )?;
        Ok(())
    }

    // --------------------------------------------------------
    // LEARNING SCHEDULES
    // --------------------------------------------------------

    pub fn insert_schedules(&self, schedules: &[NewSchedule]) -> SqlResult<()> {
        let conn = self.conn.lock().unwrap();
        for schedule in schedules {
            conn.execute(
                "INSERT INTO learning_schedules
                    (user_id, learning_path_id, period_number, start_date, end_date,
                     schedule_data, status, completion_percentage)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    schedule.user_id,
                    schedule.learning_path_id,
                    schedule.period_number,
                    schedule.start_date.format("%Y-%m-%d").to_string(),
                    schedule.end_date.format("%Y-%m-%d").to_string(),
                    serde_json::to_string(&schedule.module_ids).unwrap_or_default(),
                    schedule.status.as_str(),
                    schedule.completion_percentage,
                ],
            )?;
        }
        Ok(())
    }

    pub fn schedules_for_path(&self, path_id: i64) -> SqlResult<Vec<LearningSchedule>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, learning_path_id, period_number, start_date, end_date,
                    schedule_data, status, completion_percentage
             FROM learning_schedules WHERE learning_path_id = ?1
             ORDER BY period_number ASC",
        )?;
        let rows = stmt.query_map([path_id], |row| {
            let start: String = row.get(4)?;
            let end: String = row.get(5)?;
            let status_str: String = row.get(7)?;
            Ok(LearningSchedule {
                id: row.get(0)?,
                user_id: row.get(1)?,
                learning_path_id: row.get(2)?,
                period_number: row.get(3)?,
                start_date: NaiveDate::parse_from_str(&start, "%Y-%m-%d")
                    .unwrap_or_else(|_| Utc::now().date_naive()),
                end_date: NaiveDate::parse_from_str(&end, "%Y-%m-%d")
                    .unwrap_or_else(|_| Utc::now().date_naive()),
                module_ids: json_column(row.get::<_, String>(6)?),
                status: ScheduleStatus::from_str(&status_str)
                    .unwrap_or(ScheduleStatus::Upcoming),
                completion_percentage: row.get(8)?,
            })
        })?;
        rows.collect()
    }

    pub fn delete_schedules_for_path(&self, path_id: i64) -> SqlResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM learning_schedules WHERE learning_path_id = ?1",
            [path_id],
        )?;
        Ok(())
    }

    // --------------------------------------------------------
    // MODULE PROGRESS
    // --------------------------------------------------------

    pub fn set_module_progress(&self, user_id: i64, module_id: i64, status: &str) -> SqlResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO module_progress (user_id, module_id, status)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, module_id) DO UPDATE SET status = excluded.status",
            params![user_id, module_id, status],
        )?;
        Ok(())
    }

    /// True when every module of the path has a `completed` progress
    /// row for the user. A path with zero modules counts as not
    /// finished.
    pub fn all_modules_completed(&self, user_id: i64, path_id: i64) -> SqlResult<bool> {
        let conn = self.conn.lock().unwrap();
        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM learning_modules WHERE learning_path_id = ?1",
            [path_id],
            |row| row.get(0),
        )?;
        if total == 0 {
            return Ok(false);
        }
        let completed: i64 = conn.query_row(
            "SELECT COUNT(*) FROM learning_modules m
             JOIN module_progress pr ON pr.module_id = m.id
             WHERE m.learning_path_id = ?1 AND pr.user_id = ?2 AND pr.status = 'completed'",
            params![path_id, user_id],
            |row| row.get(0),
        )?;
        Ok(completed == total)
    }

    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> SqlResult<usize> {
        self.conn.lock().unwrap().execute(sql, [])
    }
}

// ============================================================
// ROW MAPPING
// ============================================================

fn json_column<T: serde::de::DeserializeOwned + Default>(raw: String) -> T {
    serde_json::from_str(&raw).unwrap_or_default()
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_path(row: &rusqlite::Row<'_>) -> SqlResult<LearningPath> {
    let status_str: String = row.get(3)?;
    let payload_str: Option<String> = row.get(4)?;
    let generated_at: Option<String> = row.get(6)?;
    let created_at: String = row.get(7)?;
    Ok(LearningPath {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        status: PathStatus::from_str(&status_str).unwrap_or(PathStatus::Failed),
        path: payload_str.and_then(|s| serde_json::from_str::<PathPayload>(&s).ok()),
        generation_error: row.get(5)?,
        generated_at: generated_at.map(|ts| parse_timestamp(&ts)),
        created_at: parse_timestamp(&created_at),
    })
}

fn row_to_module(row: &rusqlite::Row<'_>) -> SqlResult<LearningModule> {
    let module_type: String = row.get(3)?;
    let difficulty: String = row.get(4)?;
    let metadata: String = row.get(12)?;
    Ok(LearningModule {
        id: row.get(0)?,
        learning_path_id: row.get(1)?,
        title: row.get(2)?,
        module_type: ModuleType::from_str(&module_type).unwrap_or(ModuleType::Course),
        difficulty: Difficulty::from_str(&difficulty).unwrap_or(Difficulty::Intermediate),
        duration: row.get(5)?,
        content_url: row.get(6)?,
        thumbnail_url: row.get(7)?,
        skill_tags: json_column(row.get::<_, String>(8)?),
        prerequisite_modules: json_column(row.get::<_, String>(9)?),
        order_in_path: row.get(10)?,
        is_ai_generated: row.get(11)?,
        generation_metadata: serde_json::from_str(&metadata)
            .unwrap_or(serde_json::Value::Null),
    })
}

fn row_to_preferences(row: &rusqlite::Row<'_>) -> SqlResult<Preferences> {
    Ok(Preferences {
        user_id: row.get(0)?,
        skill_ids: json_column(row.get::<_, String>(1)?),
        interest_ids: json_column(row.get::<_, String>(2)?),
        course_id: row.get(3)?,
        branch_id: row.get(4)?,
        target_role: row.get(5)?,
        industry: row.get(6)?,
        experience_years: row.get(7)?,
        weekly_hours: row.get(8)?,
        learning_style: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_prefs(user_id: i64) -> Preferences {
        Preferences {
            user_id,
            skill_ids: vec![1, 2, 3],
            interest_ids: vec![10],
            course_id: Some(7),
            branch_id: None,
            target_role: None,
            industry: None,
            experience_years: None,
            weekly_hours: 5,
            learning_style: Some("visual".to_string()),
        }
    }

    #[test]
    fn test_user_and_preferences_round_trip() {
        let store = Store::in_memory().unwrap();
        let user_id = store.insert_user("Asha", CohortGroup::CollegeStudents).unwrap();
        store.upsert_preferences(&test_prefs(user_id)).unwrap();

        let user = store.get_user(user_id).unwrap().unwrap();
        assert_eq!(user.name, "Asha");
        assert_eq!(user.group, CohortGroup::CollegeStudents);

        let prefs = store.get_preferences(user_id).unwrap().unwrap();
        assert_eq!(prefs.skill_ids, vec![1, 2, 3]);
        assert_eq!(prefs.weekly_hours, 5);
        assert!(store.get_user(9999).unwrap().is_none());
    }

    #[test]
    fn test_path_lifecycle() {
        let store = Store::in_memory().unwrap();
        let user_id = store.insert_user("Ben", CohortGroup::Teens).unwrap();
        let path_id = store.create_path(user_id, "Ben Learning Path #1").unwrap();

        let path = store.latest_path(user_id).unwrap().unwrap();
        assert_eq!(path.id, path_id);
        assert_eq!(path.status, PathStatus::Generating);
        assert!(path.path.is_none());

        let payload = PathPayload {
            description: "A path".to_string(),
            module_ids: vec![1, 2],
            metadata: serde_json::json!({}),
        };
        store.mark_completed(path_id, &payload).unwrap();
        let path = store.get_path(path_id).unwrap().unwrap();
        assert_eq!(path.status, PathStatus::Completed);
        assert_eq!(path.path.unwrap().module_ids, vec![1, 2]);
        assert!(path.generated_at.is_some());
    }

    #[test]
    fn test_try_mark_generating_is_a_guard() {
        let store = Store::in_memory().unwrap();
        let user_id = store.insert_user("Cleo", CohortGroup::Seniors).unwrap();
        let path_id = store.create_path(user_id, "Cleo Learning Path #1").unwrap();

        // Freshly created paths are already generating: the swap must fail.
        assert!(!store.try_mark_generating(path_id).unwrap());

        store.mark_failed(path_id, "model unavailable").unwrap();
        assert!(store.try_mark_generating(path_id).unwrap());
        let path = store.get_path(path_id).unwrap().unwrap();
        assert_eq!(path.status, PathStatus::Generating);
        assert!(path.generation_error.is_none());
    }

    #[test]
    fn test_all_modules_completed() {
        let store = Store::in_memory().unwrap();
        let user_id = store.insert_user("Dev", CohortGroup::Professionals).unwrap();
        let path_id = store.create_path(user_id, "Dev Learning Path #1").unwrap();

        // Zero modules is never "finished".
        assert!(!store.all_modules_completed(user_id, path_id).unwrap());

        let mut ids = Vec::new();
        for order in 1..=2 {
            let id = store
                .insert_module(&NewModule {
                    learning_path_id: path_id,
                    title: format!("Module {}", order),
                    module_type: ModuleType::Course,
                    difficulty: Difficulty::Intermediate,
                    duration: 60,
                    content_url: None,
                    thumbnail_url: None,
                    skill_tags: vec![],
                    prerequisite_modules: vec![],
                    order_in_path: order,
                    is_ai_generated: true,
                    generation_metadata: serde_json::json!({}),
                })
                .unwrap();
            ids.push(id);
        }

        store.set_module_progress(user_id, ids[0], "completed").unwrap();
        assert!(!store.all_modules_completed(user_id, path_id).unwrap());
        store.set_module_progress(user_id, ids[1], "completed").unwrap();
        assert!(store.all_modules_completed(user_id, path_id).unwrap());
    }

    #[test]
    fn test_corrupt_module_row_is_an_error_not_a_gap() {
        let store = Store::in_memory().unwrap();
        let user_id = store.insert_user("Ola", CohortGroup::Teens).unwrap();
        let path_id = store.create_path(user_id, "Ola Learning Path #1").unwrap();
        store
            .insert_module(&NewModule {
                learning_path_id: path_id,
                title: "Fine".to_string(),
                module_type: ModuleType::Course,
                difficulty: Difficulty::Intermediate,
                duration: 60,
                content_url: None,
                thumbnail_url: None,
                skill_tags: vec![],
                prerequisite_modules: vec![],
                order_in_path: 1,
                is_ai_generated: true,
                generation_metadata: serde_json::json!({}),
            })
            .unwrap();
        assert_eq!(store.modules_for_path(path_id).unwrap().len(), 1);

        // A non-numeric duration makes the row unmappable; the read
        // must surface that rather than return a shorter list.
        store
            .execute_raw("UPDATE learning_modules SET duration = 'corrupt'")
            .unwrap();
        assert!(store.modules_for_path(path_id).is_err());
    }

    #[test]
    fn test_donor_candidates_same_group_only() {
        let store = Store::in_memory().unwrap();
        let requester = store.insert_user("Eve", CohortGroup::CollegeStudents).unwrap();
        let same_group = store.insert_user("Finn", CohortGroup::CollegeStudents).unwrap();
        let other_group = store.insert_user("Gus", CohortGroup::Professionals).unwrap();
        store.upsert_preferences(&test_prefs(same_group)).unwrap();
        store.upsert_preferences(&test_prefs(other_group)).unwrap();

        let donor_path = store.create_path(same_group, "Finn Learning Path #1").unwrap();
        store
            .mark_completed(
                donor_path,
                &PathPayload {
                    description: "done".to_string(),
                    module_ids: vec![],
                    metadata: serde_json::json!({}),
                },
            )
            .unwrap();

        let other_path = store.create_path(other_group, "Gus Learning Path #1").unwrap();
        store
            .mark_completed(
                other_path,
                &PathPayload {
                    description: "done".to_string(),
                    module_ids: vec![],
                    metadata: serde_json::json!({}),
                },
            )
            .unwrap();

        let candidates = store
            .donor_candidates(CohortGroup::CollegeStudents, requester)
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].0.id, donor_path);
    }
}
