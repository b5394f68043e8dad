//! Generation Orchestrator
//!
//! Owns the learning-path status state machine and drives the full
//! pipeline: donor reuse via the similarity matcher, or fresh content
//! generation, materialization, and scheduling. The synchronous
//! `generate` call creates or resets the path record, emits the
//! start event, and spawns the async phase as a tracked background
//! job; nothing raised in that phase ever escapes to a caller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use crate::store::Store;

use super::capabilities::{ContentModel, Notifier};
use super::content::ContentGenerator;
use super::error::{GenerationError, GenerationResult};
use super::materialize::ModuleMaterializer;
use super::resources::ResourceEnricher;
use super::schedule::ScheduleBuilder;
use super::similarity::SimilarityMatcher;
use super::types::{
    CohortGroup, LearningModule, LearningPath, PathPayload, PathStatus, Preferences, User,
};

/// Status snapshot surfaced through the API.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StatusReport {
    pub exists: bool,
    pub status: Option<PathStatus>,
    pub generated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub error: Option<String>,
}

pub struct GenerationOrchestrator {
    store: Store,
    content: ContentGenerator,
    matcher: SimilarityMatcher,
    materializer: ModuleMaterializer,
    scheduler: ScheduleBuilder,
    notifier: Arc<dyn Notifier>,
    /// Live background jobs by path id. Tracked so tests can await
    /// completion and callers can abort.
    jobs: Mutex<HashMap<i64, JoinHandle<()>>>,
}

impl GenerationOrchestrator {
    pub fn new(
        store: Store,
        model: Arc<dyn ContentModel>,
        enricher: ResourceEnricher,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            content: ContentGenerator::new(model),
            matcher: SimilarityMatcher::new(store.clone()),
            materializer: ModuleMaterializer::new(store.clone(), enricher),
            scheduler: ScheduleBuilder::new(store.clone()),
            store,
            notifier,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Trigger generation for a user. Returns once the path record is
    /// in place and the background job is spawned; `Ok(None)` means
    /// the user's cohort never gets paths (KIDS).
    pub async fn generate(self: &Arc<Self>, user_id: i64) -> GenerationResult<Option<i64>> {
        let user = self
            .store
            .get_user(user_id)?
            .ok_or(GenerationError::UserNotFound(user_id))?;

        // Kids never get learning paths; bail before any side effect.
        if user.group == CohortGroup::Kids {
            log::info!("skipping generation for kids account {}", user_id);
            return Ok(None);
        }

        let prefs = self
            .store
            .get_preferences(user_id)?
            .ok_or(GenerationError::PreferencesMissing(user_id))?;

        let path_id = self.prepare_path(&user)?;

        self.notifier.emit(
            user_id,
            "generation_started",
            serde_json::json!({
                "learningPathId": path_id,
                "message": "Your personalized learning path is being generated",
            }),
        );

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            this.perform_generation(user, prefs, path_id).await;
            this.jobs.lock().unwrap().remove(&path_id);
        });
        // A job that finished before this insert leaves a dead handle
        // behind; prune those while we hold the lock.
        let mut jobs = self.jobs.lock().unwrap();
        jobs.retain(|_, job| !job.is_finished());
        jobs.insert(path_id, handle);
        drop(jobs);

        Ok(Some(path_id))
    }

    /// Decide which path row this run owns: create the first row,
    /// create a successor row when the previous path is completed and
    /// fully finished, otherwise reclaim the existing row.
    fn prepare_path(&self, user: &User) -> GenerationResult<i64> {
        let latest = self.store.latest_path(user.id)?;

        let path_id = match latest {
            None => self.create_numbered_path(user)?,
            Some(previous)
                if previous.status == PathStatus::Completed
                    && self.store.all_modules_completed(user.id, previous.id)? =>
            {
                // History row stays untouched.
                self.create_numbered_path(user)?
            }
            Some(previous) => {
                // Conditional status swap is the concurrency guard: a
                // path already generating belongs to another run.
                if !self.store.try_mark_generating(previous.id)? {
                    return Err(GenerationError::GenerationInProgress(previous.id));
                }
                self.store.delete_modules_for_path(previous.id)?;
                self.store.delete_schedules_for_path(previous.id)?;
                previous.id
            }
        };

        Ok(path_id)
    }

    fn create_numbered_path(&self, user: &User) -> GenerationResult<i64> {
        let count = self.store.count_paths(user.id)?;
        let name = format!("{} Learning Path #{}", user.name, count + 1);
        Ok(self.store.create_path(user.id, &name)?)
    }

    /// The async phase. Exactly one catch: any failure marks the path
    /// failed, records the message, and emits the failure event.
    async fn perform_generation(&self, user: User, prefs: Preferences, path_id: i64) {
        if let Err(e) = self.run_pipeline(&user, &prefs, path_id).await {
            log::error!("generation failed for path {}: {}", path_id, e);
            if let Err(store_err) = self.store.mark_failed(path_id, &e.to_string()) {
                log::error!("could not record failure on path {}: {}", path_id, store_err);
            }
            self.notifier.emit(
                user.id,
                "generation_failed",
                serde_json::json!({
                    "learningPathId": path_id,
                    "error": e.to_string(),
                }),
            );
        }
    }

    async fn run_pipeline(
        &self,
        user: &User,
        prefs: &Preferences,
        path_id: i64,
    ) -> GenerationResult<()> {
        // Donor reuse first: a close enough profile skips the model
        // and resource lookups entirely.
        if let Some(donor) = self.matcher.find_donor(user, prefs)? {
            let modules = self.matcher.clone_modules(path_id, &donor)?;
            self.scheduler
                .build(user.id, path_id, &modules, prefs.weekly_hours)?;

            let donor_payload = donor.path.path.clone();
            let payload = PathPayload {
                description: donor_payload
                    .as_ref()
                    .map(|p| p.description.clone())
                    .unwrap_or_default(),
                module_ids: modules.iter().map(|(id, _)| *id).collect(),
                metadata: donor_payload
                    .map(|p| p.metadata)
                    .unwrap_or_else(|| serde_json::json!({"clonedFromPath": donor.path.id})),
            };
            self.complete(user.id, path_id, payload)?;
            return Ok(());
        }

        let plan = self.content.generate(user, prefs).await?;
        let modules = self.materializer.materialize(path_id, &plan.modules).await?;
        self.scheduler
            .build(user.id, path_id, &modules, prefs.weekly_hours)?;

        let payload = PathPayload {
            description: plan.description,
            module_ids: modules.iter().map(|(id, _)| *id).collect(),
            metadata: plan.metadata,
        };
        self.complete(user.id, path_id, payload)?;
        Ok(())
    }

    fn complete(&self, user_id: i64, path_id: i64, payload: PathPayload) -> GenerationResult<()> {
        self.store.mark_completed(path_id, &payload)?;
        log::info!(
            "path {} completed with {} modules",
            path_id,
            payload.module_ids.len()
        );
        self.notifier.emit(
            user_id,
            "generation_completed",
            serde_json::json!({
                "learningPathId": path_id,
                "message": "Your personalized learning path is ready",
                "path": payload,
            }),
        );
        Ok(())
    }

    /// Latest path for a user together with its ordered modules.
    pub fn get_path(&self, user_id: i64) -> GenerationResult<Option<(LearningPath, Vec<LearningModule>)>> {
        match self.store.latest_path(user_id)? {
            Some(path) => {
                let modules = self.store.modules_for_path(path.id)?;
                Ok(Some((path, modules)))
            }
            None => Ok(None),
        }
    }

    pub fn get_status(&self, user_id: i64) -> GenerationResult<StatusReport> {
        Ok(match self.store.latest_path(user_id)? {
            Some(path) => StatusReport {
                exists: true,
                status: Some(path.status),
                generated_at: path.generated_at,
                error: path.generation_error,
            },
            None => StatusReport {
                exists: false,
                status: None,
                generated_at: None,
                error: None,
            },
        })
    }

    /// Number of background jobs currently in the map.
    pub fn active_jobs(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    /// Await the background job for a path, if one is live.
    pub async fn wait_for(&self, path_id: i64) {
        let handle = self.jobs.lock().unwrap().remove(&path_id);
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                log::error!("generation job for path {} panicked: {}", path_id, e);
            }
        }
    }

    /// Abort the background job for a path, if one is live.
    pub fn abort(&self, path_id: i64) {
        if let Some(handle) = self.jobs.lock().unwrap().remove(&path_id) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::capabilities::{CompletionOptions, LogNotifier};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedModel {
        response: serde_json::Value,
        calls: AtomicUsize,
    }

    impl CannedModel {
        fn new(response: serde_json::Value) -> Self {
            Self {
                response,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ContentModel for CannedModel {
        async fn complete(
            &self,
            _prompt: &str,
            _options: &CompletionOptions,
        ) -> GenerationResult<serde_json::Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<(i64, String, serde_json::Value)>>,
    }

    impl RecordingNotifier {
        fn events_named(&self, name: &str) -> Vec<serde_json::Value> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, event, _)| event == name)
                .map(|(_, _, payload)| payload.clone())
                .collect()
        }

        fn len(&self) -> usize {
            self.events.lock().unwrap().len()
        }
    }

    impl Notifier for RecordingNotifier {
        fn emit(&self, user_id: i64, event: &str, payload: serde_json::Value) {
            self.events
                .lock()
                .unwrap()
                .push((user_id, event.to_string(), payload));
        }
    }

    fn two_module_plan() -> serde_json::Value {
        serde_json::json!({
            "name": "Test Path",
            "description": "two modules",
            "modules": [
                {"title": "SQL Basics", "moduleType": "video", "duration": 600},
                {"title": "Advanced SQL", "duration": 1200, "prerequisites": ["SQL Basics"]}
            ],
            "metadata": {"source": "test"}
        })
    }

    fn seed_user(store: &Store, group: CohortGroup, weekly_hours: i64) -> i64 {
        let user_id = store.insert_user("Pat", group).unwrap();
        store
            .upsert_preferences(&Preferences {
                user_id,
                skill_ids: vec![1, 2],
                interest_ids: vec![3],
                course_id: Some(5),
                branch_id: None,
                target_role: None,
                industry: None,
                experience_years: None,
                weekly_hours,
                learning_style: None,
            })
            .unwrap();
        user_id
    }

    fn orchestrator(
        store: &Store,
        model: Arc<dyn ContentModel>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<GenerationOrchestrator> {
        Arc::new(GenerationOrchestrator::new(
            store.clone(),
            model,
            ResourceEnricher::offline(),
            notifier,
        ))
    }

    #[tokio::test]
    async fn test_kids_get_nothing() {
        let store = Store::in_memory().unwrap();
        let user_id = seed_user(&store, CohortGroup::Kids, 5);
        let model = Arc::new(CannedModel::new(two_module_plan()));
        let notifier = Arc::new(RecordingNotifier::default());
        let orch = orchestrator(&store, model.clone(), notifier.clone());

        let result = orch.generate(user_id).await.unwrap();
        assert!(result.is_none());
        assert_eq!(store.count_paths(user_id).unwrap(), 0);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
        assert_eq!(notifier.len(), 0);
    }

    #[tokio::test]
    async fn test_missing_preferences_is_fatal_pre_dispatch() {
        let store = Store::in_memory().unwrap();
        let user_id = store.insert_user("NoPrefs", CohortGroup::Teens).unwrap();
        let orch = orchestrator(
            &store,
            Arc::new(CannedModel::new(two_module_plan())),
            Arc::new(LogNotifier),
        );

        let result = orch.generate(user_id).await;
        assert!(matches!(result, Err(GenerationError::PreferencesMissing(_))));
        assert_eq!(store.count_paths(user_id).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_happy_path_end_to_end() {
        let store = Store::in_memory().unwrap();
        let user_id = seed_user(&store, CohortGroup::CollegeStudents, 5);
        let notifier = Arc::new(RecordingNotifier::default());
        let orch = orchestrator(
            &store,
            Arc::new(CannedModel::new(two_module_plan())),
            notifier.clone(),
        );

        let path_id = orch.generate(user_id).await.unwrap().unwrap();
        orch.wait_for(path_id).await;

        let path = store.get_path(path_id).unwrap().unwrap();
        assert_eq!(path.status, PathStatus::Completed);
        assert!(path.generated_at.is_some());
        let payload = path.path.unwrap();
        assert_eq!(payload.description, "two modules");
        assert_eq!(payload.module_ids.len(), 2);

        let modules = store.modules_for_path(path_id).unwrap();
        assert_eq!(modules.len(), 2);
        assert!(modules[0].is_ai_generated);
        assert_eq!(modules[1].prerequisite_modules, vec![modules[0].id]);

        // 1800 minutes at 5 h/week: 6 weekly periods.
        let schedules = store.schedules_for_path(path_id).unwrap();
        assert_eq!(schedules.len(), 6);

        assert_eq!(notifier.events_named("generation_started").len(), 1);
        assert_eq!(notifier.events_named("generation_completed").len(), 1);
        assert!(notifier.events_named("generation_failed").is_empty());
    }

    #[tokio::test]
    async fn test_malformed_model_output_fails_the_run() {
        let store = Store::in_memory().unwrap();
        let user_id = seed_user(&store, CohortGroup::Teens, 5);
        let notifier = Arc::new(RecordingNotifier::default());
        let orch = orchestrator(
            &store,
            Arc::new(CannedModel::new(serde_json::json!({"not": "a plan"}))),
            notifier.clone(),
        );

        let path_id = orch.generate(user_id).await.unwrap().unwrap();
        orch.wait_for(path_id).await;

        let path = store.get_path(path_id).unwrap().unwrap();
        assert_eq!(path.status, PathStatus::Failed);
        assert!(path.generation_error.unwrap().contains("malformed"));
        assert!(store.modules_for_path(path_id).unwrap().is_empty());
        assert!(store.schedules_for_path(path_id).unwrap().is_empty());
        assert_eq!(notifier.events_named("generation_failed").len(), 1);
        assert!(notifier.events_named("generation_completed").is_empty());

        let status = orch.get_status(user_id).unwrap();
        assert!(status.exists);
        assert_eq!(status.status, Some(PathStatus::Failed));
        assert!(status.error.is_some());
    }

    #[tokio::test]
    async fn test_regenerate_rejected_while_generating() {
        let store = Store::in_memory().unwrap();
        let user_id = seed_user(&store, CohortGroup::Teens, 5);
        // A path stuck in `generating` (e.g. a live concurrent run).
        let stuck = store.create_path(user_id, "Pat Learning Path #1").unwrap();

        let orch = orchestrator(
            &store,
            Arc::new(CannedModel::new(two_module_plan())),
            Arc::new(LogNotifier),
        );
        let result = orch.generate(user_id).await;
        assert!(matches!(
            result,
            Err(GenerationError::GenerationInProgress(id)) if id == stuck
        ));
    }

    #[tokio::test]
    async fn test_finished_path_gets_a_new_numbered_row() {
        let store = Store::in_memory().unwrap();
        let user_id = seed_user(&store, CohortGroup::Teens, 5);
        let notifier = Arc::new(RecordingNotifier::default());
        let orch = orchestrator(
            &store,
            Arc::new(CannedModel::new(two_module_plan())),
            notifier.clone(),
        );

        // First run.
        let first = orch.generate(user_id).await.unwrap().unwrap();
        orch.wait_for(first).await;
        let first_modules = store.modules_for_path(first).unwrap();
        assert_eq!(first_modules.len(), 2);

        // User finishes every module of the first path.
        for module in &first_modules {
            store.set_module_progress(user_id, module.id, "completed").unwrap();
        }

        // Second run creates a successor row; history stays untouched.
        let second = orch.generate(user_id).await.unwrap().unwrap();
        assert_ne!(second, first);
        orch.wait_for(second).await;

        assert_eq!(store.count_paths(user_id).unwrap(), 2);
        let second_path = store.get_path(second).unwrap().unwrap();
        assert!(second_path.name.ends_with("#2"));
        assert_eq!(store.modules_for_path(first).unwrap().len(), 2);
        assert_eq!(store.get_path(first).unwrap().unwrap().status, PathStatus::Completed);
    }

    #[tokio::test]
    async fn test_unfinished_path_is_reused_and_cleared() {
        let store = Store::in_memory().unwrap();
        let user_id = seed_user(&store, CohortGroup::Teens, 5);
        let orch = orchestrator(
            &store,
            Arc::new(CannedModel::new(two_module_plan())),
            Arc::new(LogNotifier),
        );

        let first = orch.generate(user_id).await.unwrap().unwrap();
        orch.wait_for(first).await;

        // Completed but not finished: regenerate reuses the same row.
        let second = orch.generate(user_id).await.unwrap().unwrap();
        assert_eq!(second, first);
        orch.wait_for(second).await;
        assert_eq!(store.count_paths(user_id).unwrap(), 1);
        assert_eq!(store.modules_for_path(first).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_finished_jobs_leave_the_job_map() {
        let store = Store::in_memory().unwrap();
        let user_id = seed_user(&store, CohortGroup::Teens, 5);
        let orch = orchestrator(
            &store,
            Arc::new(CannedModel::new(two_module_plan())),
            Arc::new(LogNotifier),
        );

        let path_id = orch.generate(user_id).await.unwrap().unwrap();
        assert_eq!(orch.active_jobs(), 1);

        // The job removes its own entry on completion, without any
        // wait_for/abort from the caller.
        for _ in 0..200 {
            if orch.active_jobs() == 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(orch.active_jobs(), 0);
        let path = store.get_path(path_id).unwrap().unwrap();
        assert_eq!(path.status, PathStatus::Completed);
    }

    #[tokio::test]
    async fn test_donor_reuse_skips_the_model() {
        let store = Store::in_memory().unwrap();

        // Donor: same cohort, same course and skills, completed path
        // with one module.
        let donor_user = seed_user(&store, CohortGroup::CollegeStudents, 4);
        let donor_notifier = Arc::new(RecordingNotifier::default());
        let donor_orch = orchestrator(
            &store,
            Arc::new(CannedModel::new(two_module_plan())),
            donor_notifier,
        );
        let donor_path = donor_orch.generate(donor_user).await.unwrap().unwrap();
        donor_orch.wait_for(donor_path).await;

        // Requester with an identical profile.
        let requester = seed_user(&store, CohortGroup::CollegeStudents, 8);
        let model = Arc::new(CannedModel::new(two_module_plan()));
        let notifier = Arc::new(RecordingNotifier::default());
        let orch = orchestrator(&store, model.clone(), notifier.clone());

        let path_id = orch.generate(requester).await.unwrap().unwrap();
        orch.wait_for(path_id).await;

        // Cloned, not generated.
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
        let path = store.get_path(path_id).unwrap().unwrap();
        assert_eq!(path.status, PathStatus::Completed);

        let modules = store.modules_for_path(path_id).unwrap();
        assert_eq!(modules.len(), 2);
        assert!(modules.iter().all(|m| !m.is_ai_generated));
        assert_eq!(modules[0].generation_metadata["clonedFromPath"], donor_path);

        // Scheduled with the requester's own weekly budget:
        // 1800 minutes at 8 h/week = 480 min/week -> 4 weeks.
        let schedules = store.schedules_for_path(path_id).unwrap();
        assert_eq!(schedules.len(), 4);
        assert_eq!(notifier.events_named("generation_completed").len(), 1);
    }
}
