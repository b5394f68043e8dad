//! Module Materializer
//!
//! Turns generated module descriptors into persisted records. Modules
//! are processed strictly in order: prerequisite references only
//! resolve against modules already materialized in the same batch,
//! and sequencing bounds burst concurrency against the external
//! search capabilities. One module's failure degrades that module and
//! never aborts the batch.

use chrono::Utc;
use uuid::Uuid;

use crate::store::{NewModule, Store};

use super::error::GenerationResult;
use super::resources::{EnrichedResources, ResourceEnricher};
use super::types::{Difficulty, GeneratedModule, ModuleType};

/// Ordered keyword rules for free-text module types; first match
/// wins, else `course`.
const MODULE_TYPE_RULES: &[(&str, ModuleType)] = &[
    ("video", ModuleType::Video),
    ("watch", ModuleType::Video),
    ("article", ModuleType::Article),
    ("read", ModuleType::Article),
    ("blog", ModuleType::Article),
    ("project", ModuleType::Project),
    ("build", ModuleType::Project),
    ("hands-on", ModuleType::Project),
    ("quiz", ModuleType::Assessment),
    ("assessment", ModuleType::Assessment),
    ("exam", ModuleType::Assessment),
    ("test", ModuleType::Assessment),
    ("interactive", ModuleType::Interactive),
    ("exercise", ModuleType::Interactive),
    ("practice", ModuleType::Interactive),
    ("course", ModuleType::Course),
    ("lesson", ModuleType::Course),
];

/// Ordered keyword rules for free-text difficulty; first match wins,
/// else `intermediate`.
const DIFFICULTY_RULES: &[(&str, Difficulty)] = &[
    ("begin", Difficulty::Beginner),
    ("intro", Difficulty::Beginner),
    ("basic", Difficulty::Beginner),
    ("easy", Difficulty::Beginner),
    ("novice", Difficulty::Beginner),
    ("advanced", Difficulty::Advanced),
    ("expert", Difficulty::Advanced),
    ("hard", Difficulty::Advanced),
    ("inter", Difficulty::Intermediate),
    ("medium", Difficulty::Intermediate),
    ("moderate", Difficulty::Intermediate),
];

pub fn normalize_module_type(raw: &str) -> ModuleType {
    let lowered = raw.to_lowercase();
    for (keyword, module_type) in MODULE_TYPE_RULES {
        if lowered.contains(keyword) {
            return *module_type;
        }
    }
    ModuleType::Course
}

pub fn normalize_difficulty(raw: &str) -> Difficulty {
    let lowered = raw.to_lowercase();
    for (keyword, difficulty) in DIFFICULTY_RULES {
        if lowered.contains(keyword) {
            return *difficulty;
        }
    }
    Difficulty::Intermediate
}

/// Resolve prerequisite title strings against already-materialized
/// batch modules: case-insensitive substring containment in either
/// direction, first match wins, unmatched titles dropped silently.
pub fn resolve_prerequisites(titles: &[String], created: &[(i64, String)]) -> Vec<i64> {
    let mut resolved = Vec::new();
    for title in titles {
        let wanted = title.to_lowercase();
        let matched = created.iter().find(|(_, existing)| {
            let existing = existing.to_lowercase();
            existing.contains(&wanted) || wanted.contains(&existing)
        });
        match matched {
            Some((id, _)) => resolved.push(*id),
            None => log::debug!("unresolved prerequisite '{}' dropped", title),
        }
    }
    resolved
}

/// Persists generated modules in order, enriching each with resources.
pub struct ModuleMaterializer {
    store: Store,
    enricher: ResourceEnricher,
}

impl ModuleMaterializer {
    pub fn new(store: Store, enricher: ResourceEnricher) -> Self {
        Self { store, enricher }
    }

    /// Materialize the whole batch. Returns (module_id, duration)
    /// pairs in path order for the schedule builder.
    pub async fn materialize(
        &self,
        path_id: i64,
        descriptors: &[GeneratedModule],
    ) -> GenerationResult<Vec<(i64, i64)>> {
        // (id, title) of everything materialized so far, for
        // prerequisite resolution.
        let mut created: Vec<(i64, String)> = Vec::with_capacity(descriptors.len());
        let mut results = Vec::with_capacity(descriptors.len());
        // One batch id ties all modules of this run together.
        let batch_id = Uuid::new_v4().to_string();

        for (index, descriptor) in descriptors.iter().enumerate() {
            let order = (index + 1) as i64;
            let module_type = normalize_module_type(&descriptor.module_type);
            let enriched = self
                .enricher
                .enrich(descriptor.topic(), descriptor.duration, module_type)
                .await;

            let module = build_module(
                path_id,
                order,
                descriptor,
                module_type,
                &created,
                enriched,
                &batch_id,
            );
            match self.store.insert_module(&module) {
                Ok(id) => {
                    created.push((id, descriptor.title.clone()));
                    results.push((id, descriptor.duration));
                }
                Err(e) => {
                    log::warn!(
                        "module '{}' failed to persist ({}), storing degraded record",
                        descriptor.title,
                        e
                    );
                    let degraded = build_degraded_module(path_id, order, descriptor, &e.to_string());
                    match self.store.insert_module(&degraded) {
                        Ok(id) => {
                            created.push((id, descriptor.title.clone()));
                            results.push((id, descriptor.duration));
                        }
                        Err(e) => {
                            // Batch keeps going; this slot is lost.
                            log::error!(
                                "degraded module '{}' also failed to persist: {}",
                                descriptor.title,
                                e
                            );
                        }
                    }
                }
            }
        }

        Ok(results)
    }
}

fn build_module(
    path_id: i64,
    order: i64,
    descriptor: &GeneratedModule,
    module_type: ModuleType,
    created: &[(i64, String)],
    enriched: EnrichedResources,
    batch_id: &str,
) -> NewModule {
    NewModule {
        learning_path_id: path_id,
        title: descriptor.title.clone(),
        module_type,
        difficulty: normalize_difficulty(&descriptor.difficulty),
        duration: descriptor.duration,
        content_url: Some(enriched.content_url),
        thumbnail_url: Some(enriched.thumbnail_url),
        skill_tags: descriptor.skill_tags.clone(),
        prerequisite_modules: resolve_prerequisites(&descriptor.prerequisites, created),
        order_in_path: order,
        is_ai_generated: true,
        generation_metadata: serde_json::json!({
            "generatedAt": Utc::now().to_rfc3339(),
            "generationBatchId": batch_id,
            "searchKeywords": descriptor.topic(),
            "formatMetadata": enriched.format_metadata,
            "readingResources": enriched.reading_resources,
            "originalPrerequisites": descriptor.prerequisites,
            "category": descriptor.category,
            "subcategory": descriptor.subcategory,
        }),
    }
}

fn build_degraded_module(
    path_id: i64,
    order: i64,
    descriptor: &GeneratedModule,
    error: &str,
) -> NewModule {
    NewModule {
        learning_path_id: path_id,
        title: descriptor.title.clone(),
        module_type: normalize_module_type(&descriptor.module_type),
        difficulty: normalize_difficulty(&descriptor.difficulty),
        duration: descriptor.duration,
        content_url: None,
        thumbnail_url: None,
        skill_tags: descriptor.skill_tags.clone(),
        prerequisite_modules: Vec::new(),
        order_in_path: order,
        is_ai_generated: true,
        generation_metadata: serde_json::json!({
            "generatedAt": Utc::now().to_rfc3339(),
            "degraded": true,
            "error": error,
        }),
    }
}
