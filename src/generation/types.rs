//! Learning Path Types
//!
//! Core data structures for the learning path generation pipeline:
//! user profiles, persisted path/module/schedule records, and the
//! typed descriptors parsed out of the generation model's JSON output.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================
// COHORT GROUPS
// ============================================================

/// The five fixed user segments driving prompt strategy and
/// target module counts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CohortGroup {
    Kids,
    Teens,
    CollegeStudents,
    Professionals,
    Seniors,
}

impl CohortGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            CohortGroup::Kids => "KIDS",
            CohortGroup::Teens => "TEENS",
            CohortGroup::CollegeStudents => "COLLEGE_STUDENTS",
            CohortGroup::Professionals => "PROFESSIONALS",
            CohortGroup::Seniors => "SENIORS",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "KIDS" => Some(CohortGroup::Kids),
            "TEENS" => Some(CohortGroup::Teens),
            "COLLEGE_STUDENTS" => Some(CohortGroup::CollegeStudents),
            "PROFESSIONALS" => Some(CohortGroup::Professionals),
            "SENIORS" => Some(CohortGroup::Seniors),
            _ => None,
        }
    }
}

// ============================================================
// PATH / SCHEDULE STATUS
// ============================================================

/// Lifecycle status of a learning path.
///
/// Transitions: generating -> completed, generating -> failed, and
/// completed|failed -> generating only through the regenerate branch
/// of the orchestrator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PathStatus {
    Generating,
    Completed,
    Failed,
}

impl PathStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathStatus::Generating => "generating",
            PathStatus::Completed => "completed",
            PathStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "generating" => Some(PathStatus::Generating),
            "completed" => Some(PathStatus::Completed),
            "failed" => Some(PathStatus::Failed),
            _ => None,
        }
    }
}

/// Status of one weekly schedule period.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Upcoming,
    Active,
    Completed,
    Skipped,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Upcoming => "upcoming",
            ScheduleStatus::Active => "active",
            ScheduleStatus::Completed => "completed",
            ScheduleStatus::Skipped => "skipped",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "upcoming" => Some(ScheduleStatus::Upcoming),
            "active" => Some(ScheduleStatus::Active),
            "completed" => Some(ScheduleStatus::Completed),
            "skipped" => Some(ScheduleStatus::Skipped),
            _ => None,
        }
    }
}

// ============================================================
// MODULE ENUMS
// ============================================================

/// Closed set of module content types. Free-text model output is
/// normalized into this set by the materializer's rule table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModuleType {
    Video,
    Article,
    Course,
    Project,
    Interactive,
    Assessment,
}

impl ModuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleType::Video => "video",
            ModuleType::Article => "article",
            ModuleType::Course => "course",
            ModuleType::Project => "project",
            ModuleType::Interactive => "interactive",
            ModuleType::Assessment => "assessment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "video" => Some(ModuleType::Video),
            "article" => Some(ModuleType::Article),
            "course" => Some(ModuleType::Course),
            "project" => Some(ModuleType::Project),
            "interactive" => Some(ModuleType::Interactive),
            "assessment" => Some(ModuleType::Assessment),
            _ => None,
        }
    }
}

/// Closed set of difficulty levels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "beginner" => Some(Difficulty::Beginner),
            "intermediate" => Some(Difficulty::Intermediate),
            "advanced" => Some(Difficulty::Advanced),
            _ => None,
        }
    }
}

// ============================================================
// USER & PREFERENCES
// ============================================================

/// An onboarded end-user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub group: CohortGroup,
}

/// Onboarding preferences, owned 1:1 by a user. Read-only to the
/// generation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    pub user_id: i64,
    pub skill_ids: Vec<i64>,
    pub interest_ids: Vec<i64>,
    pub course_id: Option<i64>,
    pub branch_id: Option<i64>,
    /// Professionals only
    pub target_role: Option<String>,
    /// Professionals only
    pub industry: Option<String>,
    /// Professionals only
    pub experience_years: Option<i64>,
    /// Weekly learning-hour budget
    pub weekly_hours: i64,
    /// Free-text learning style hint embedded into prompts
    pub learning_style: Option<String>,
}

// ============================================================
// PERSISTED RECORDS
// ============================================================

/// Serialized payload stored on a completed learning path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathPayload {
    pub description: String,
    #[serde(rename = "moduleIds")]
    pub module_ids: Vec<i64>,
    pub metadata: serde_json::Value,
}

/// A learning path record. One "current" path per user by convention;
/// history rows are retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningPath {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub status: PathStatus,
    pub path: Option<PathPayload>,
    pub generation_error: Option<String>,
    pub generated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A persisted learning module, owned by exactly one path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningModule {
    pub id: i64,
    pub learning_path_id: i64,
    pub title: String,
    pub module_type: ModuleType,
    pub difficulty: Difficulty,
    /// Duration in minutes
    pub duration: i64,
    pub content_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub skill_tags: Vec<String>,
    /// Intra-path module ids
    pub prerequisite_modules: Vec<i64>,
    /// 1-based, unique within the path
    pub order_in_path: i64,
    pub is_ai_generated: bool,
    /// Audit blob recorded at materialization time
    pub generation_metadata: serde_json::Value,
}

/// One weekly period of a learning schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningSchedule {
    pub id: i64,
    pub user_id: i64,
    pub learning_path_id: i64,
    /// 1-based week index, unique within the path
    pub period_number: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Module ids assigned to this period
    pub module_ids: Vec<i64>,
    pub status: ScheduleStatus,
    pub completion_percentage: f64,
}

// ============================================================
// GENERATED PLAN DESCRIPTORS
// ============================================================

/// A module descriptor as produced by the generation model.
///
/// Only the structural shape is trusted: missing optional fields
/// default, free-text type/difficulty are normalized later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedModule {
    #[serde(default = "default_module_title")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "moduleType")]
    pub module_type: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default = "default_module_duration")]
    pub duration: i64,
    #[serde(default, rename = "skillTags")]
    pub skill_tags: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    #[serde(default, rename = "searchKeywords")]
    pub search_keywords: Option<String>,
    /// Prerequisite module titles within the same plan
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

fn default_module_title() -> String {
    "Untitled Module".to_string()
}

fn default_module_duration() -> i64 {
    60
}

impl GeneratedModule {
    /// Topic string used for resource lookups: explicit search
    /// keywords when present, else the module title.
    pub fn topic(&self) -> &str {
        match &self.search_keywords {
            Some(kw) if !kw.trim().is_empty() => kw,
            _ => &self.title,
        }
    }
}

/// The full plan parsed from the generation model's JSON response.
/// An absent `modules` array fails deserialization and is fatal to
/// the generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedPlan {
    #[serde(default = "default_plan_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub modules: Vec<GeneratedModule>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

fn default_plan_name() -> String {
    "Personalized Learning Path".to_string()
}
