//! Similarity Matcher
//!
//! Before fresh generation, looks for a "donor": a completed path of
//! another user in the same cohort whose preferences score close
//! enough to the requester's. A cloned donor skips the generation
//! model and resource lookups entirely.

use chrono::Utc;

use crate::store::{NewModule, Store};

use super::error::GenerationResult;
use super::types::{LearningPath, Preferences, User};

/// Minimum weighted score for a donor to be accepted.
pub const DONOR_SCORE_THRESHOLD: i64 = 40;

const COURSE_WEIGHT: i64 = 25;
const BRANCH_WEIGHT: i64 = 25;
const INDUSTRY_WEIGHT: i64 = 15;
const TARGET_ROLE_WEIGHT: i64 = 15;
const SKILL_OVERLAP_WEIGHT: i64 = 8;
const INTEREST_OVERLAP_WEIGHT: i64 = 8;

/// An accepted donor path.
#[derive(Debug, Clone)]
pub struct Donor {
    pub path: LearningPath,
    pub score: i64,
}

/// Scores candidate paths and clones the accepted donor's modules.
pub struct SimilarityMatcher {
    store: Store,
}

impl SimilarityMatcher {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Highest-scoring completed path of a different same-cohort
    /// user, accepted only at or above the threshold.
    pub fn find_donor(
        &self,
        user: &User,
        prefs: &Preferences,
    ) -> GenerationResult<Option<Donor>> {
        let candidates = self.store.donor_candidates(user.group, user.id)?;

        let mut best: Option<Donor> = None;
        for (path, candidate_prefs) in candidates {
            let score = similarity_score(prefs, &candidate_prefs);
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(Donor { path, score });
            }
        }

        Ok(best.filter(|donor| donor.score >= DONOR_SCORE_THRESHOLD))
    }

    /// Clone every donor module into new rows owned by the target
    /// path: same order and content, `is_ai_generated = false`,
    /// lineage recorded in the generation metadata. Resources are
    /// inherited as-is. Returns (id, duration) pairs for scheduling.
    pub fn clone_modules(
        &self,
        target_path_id: i64,
        donor: &Donor,
    ) -> GenerationResult<Vec<(i64, i64)>> {
        let donor_modules = self.store.modules_for_path(donor.path.id)?;
        let mut cloned = Vec::with_capacity(donor_modules.len());

        for module in donor_modules {
            let id = self.store.insert_module(&NewModule {
                learning_path_id: target_path_id,
                title: module.title.clone(),
                module_type: module.module_type,
                difficulty: module.difficulty,
                duration: module.duration,
                content_url: module.content_url.clone(),
                thumbnail_url: module.thumbnail_url.clone(),
                skill_tags: module.skill_tags.clone(),
                prerequisite_modules: Vec::new(),
                order_in_path: module.order_in_path,
                is_ai_generated: false,
                generation_metadata: serde_json::json!({
                    "clonedFromPath": donor.path.id,
                    "clonedFromModule": module.id,
                    "clonedAt": Utc::now().to_rfc3339(),
                    "similarityScore": donor.score,
                }),
            })?;
            cloned.push((id, module.duration));
        }

        log::info!(
            "cloned {} modules from donor path {} (score {})",
            cloned.len(),
            donor.path.id,
            donor.score
        );
        Ok(cloned)
    }
}

/// Weighted point sum over two preference profiles:
/// `25*course + 25*branch + 15*industry + 15*targetRole +
///  8*|skill overlap| + 8*|interest overlap|`.
pub fn similarity_score(requester: &Preferences, candidate: &Preferences) -> i64 {
    let mut score = 0;

    if ids_match(requester.course_id, candidate.course_id) {
        score += COURSE_WEIGHT;
    }
    if ids_match(requester.branch_id, candidate.branch_id) {
        score += BRANCH_WEIGHT;
    }
    if text_match(&requester.industry, &candidate.industry) {
        score += INDUSTRY_WEIGHT;
    }
    if text_match(&requester.target_role, &candidate.target_role) {
        score += TARGET_ROLE_WEIGHT;
    }

    score += SKILL_OVERLAP_WEIGHT * overlap(&requester.skill_ids, &candidate.skill_ids);
    score += INTEREST_OVERLAP_WEIGHT * overlap(&requester.interest_ids, &candidate.interest_ids);
    score
}

fn ids_match(a: Option<i64>, b: Option<i64>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}

fn text_match(a: &Option<String>, b: &Option<String>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
        _ => false,
    }
}

fn overlap(a: &[i64], b: &[i64]) -> i64 {
    a.iter().filter(|id| b.contains(id)).count() as i64
}
