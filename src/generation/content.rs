//! Content Generator
//!
//! Builds the cohort-specific prompt, invokes the generation model
//! with cohort-tuned settings, and parses the JSON plan. The target
//! module count is a pure function of the cohort, not of the weekly
//! hour budget.

use std::sync::Arc;

use super::capabilities::{CompletionOptions, ContentModel};
use super::error::{GenerationError, GenerationResult};
use super::types::{CohortGroup, GeneratedPlan, Preferences, User};

const SYSTEM_PROMPT: &str = "You are a curriculum designer. Respond with a single JSON object \
shaped as {\"name\", \"description\", \"modules\": [{\"title\", \"description\", \
\"moduleType\", \"difficulty\", \"duration\", \"skillTags\", \"category\", \"subcategory\", \
\"searchKeywords\", \"prerequisites\"}], \"metadata\"}. Durations are minutes. \
Prerequisites reference other module titles in the same plan.";

/// Cohort-tuned prompt and model settings.
#[derive(Debug, Clone)]
pub struct PromptPlan {
    pub prompt: String,
    pub module_count: usize,
    pub options: CompletionOptions,
}

/// Generates a structured learning plan from a user profile.
pub struct ContentGenerator {
    model: Arc<dyn ContentModel>,
}

impl ContentGenerator {
    pub fn new(model: Arc<dyn ContentModel>) -> Self {
        Self { model }
    }

    /// Fixed per-cohort module target. KIDS never reach this layer.
    pub fn module_count(group: CohortGroup) -> Option<usize> {
        match group {
            CohortGroup::CollegeStudents => Some(15),
            CohortGroup::Professionals => Some(10),
            CohortGroup::Teens => Some(12),
            CohortGroup::Seniors => Some(6),
            CohortGroup::Kids => None,
        }
    }

    /// Build the cohort strategy for one user.
    pub fn build_plan(user: &User, prefs: &Preferences) -> GenerationResult<PromptPlan> {
        let module_count = Self::module_count(user.group)
            .ok_or_else(|| GenerationError::UnsupportedCohort(user.group.as_str().to_string()))?;

        let profile = profile_summary(prefs);
        let (audience, temperature, max_tokens) = match user.group {
            CohortGroup::CollegeStudents => (
                "a college student balancing coursework. Favor exam-relevant depth, \
                 projects that fit a semester, and progression from fundamentals to \
                 applied work",
                0.7,
                4000,
            ),
            CohortGroup::Professionals => (
                "a working professional advancing their career. Favor practical, \
                 role-relevant modules with immediate workplace application",
                0.6,
                3500,
            ),
            CohortGroup::Teens => (
                "a teenager exploring new skills. Keep modules engaging, visual, and \
                 achievable in short sessions",
                0.8,
                3000,
            ),
            CohortGroup::Seniors => (
                "a senior learner. Keep the pace gentle, avoid jargon, and favor \
                 clear step-by-step material",
                0.5,
                2000,
            ),
            CohortGroup::Kids => unreachable!("rejected above"),
        };

        let prompt = format!(
            "Create a learning path of exactly {} modules for {}, named {}.\n\
             Learner profile: {}.\n\
             Order modules so prerequisites come first, vary the module types, and \
             give each module realistic searchKeywords for finding supporting videos.",
            module_count, audience, user.name, profile
        );

        Ok(PromptPlan {
            prompt,
            module_count,
            options: CompletionOptions {
                temperature,
                max_tokens,
                system_prompt: SYSTEM_PROMPT.to_string(),
            },
        })
    }

    /// Invoke the model and parse its JSON plan. Malformed output is
    /// fatal to the run.
    pub async fn generate(&self, user: &User, prefs: &Preferences) -> GenerationResult<GeneratedPlan> {
        let plan = Self::build_plan(user, prefs)?;
        log::info!(
            "requesting {} modules for user {} ({})",
            plan.module_count,
            user.id,
            user.group.as_str()
        );

        let raw = self.model.complete(&plan.prompt, &plan.options).await?;
        parse_plan(raw)
    }
}

/// Structural parse of the model output. Only a missing `modules`
/// array (or an undeserializable root) is fatal; optional fields
/// default.
pub fn parse_plan(raw: serde_json::Value) -> GenerationResult<GeneratedPlan> {
    let plan: GeneratedPlan = serde_json::from_value(raw)
        .map_err(|e| GenerationError::ContentGeneration(format!("malformed plan JSON: {}", e)))?;
    if plan.modules.is_empty() {
        return Err(GenerationError::ContentGeneration(
            "plan contains no modules".to_string(),
        ));
    }
    Ok(plan)
}

fn profile_summary(prefs: &Preferences) -> String {
    let mut parts = vec![
        format!("skill ids {:?}", prefs.skill_ids),
        format!("interest ids {:?}", prefs.interest_ids),
        format!("{} study hours per week", prefs.weekly_hours),
    ];
    if let Some(course_id) = prefs.course_id {
        parts.push(format!("enrolled in course {}", course_id));
    }
    if let Some(branch_id) = prefs.branch_id {
        parts.push(format!("branch {}", branch_id));
    }
    if let Some(role) = &prefs.target_role {
        parts.push(format!("target role {}", role));
    }
    if let Some(industry) = &prefs.industry {
        parts.push(format!("industry {}", industry));
    }
    if let Some(years) = prefs.experience_years {
        parts.push(format!("{} years of experience", years));
    }
    if let Some(style) = &prefs.learning_style {
        parts.push(format!("prefers {} learning", style));
    }
    parts.join(", ")
}
