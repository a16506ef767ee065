//! Migration Driver Service
//!
//! Async driver in front of [`CommentsMigrator`]: exposes status probing and
//! step execution to operators, runs each step as a background tokio task and
//! enforces at most one concurrent run per migration id.
//!
//! State in a status response is always re-probed from the live store, never
//! cached; a second process driving the same migration sees accurate state.

use crate::services::{
    CommentError, CommentsMigrator, LoggingMigrationContext, MigrationContext, MigrationState,
    MigrationStep,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// Snapshot of one registered migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationStatus {
    pub state: MigrationState,
    pub is_running: bool,
}

#[derive(Clone)]
struct Registration {
    migrator: Arc<CommentsMigrator>,
    running: Arc<AtomicBool>,
    /// Context of the active run, if any; the handle `request_shutdown`
    /// reaches for.
    active_ctx: Arc<Mutex<Option<Arc<LoggingMigrationContext>>>>,
}

/// Registry and runner for storage migrations.
#[derive(Default)]
pub struct MigrationService {
    registrations: RwLock<HashMap<String, Registration>>,
}

impl MigrationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a migrator under an id.
    pub async fn register(&self, id: impl Into<String>, migrator: Arc<CommentsMigrator>) {
        let id = id.into();
        let registration = Registration {
            migrator,
            running: Arc::new(AtomicBool::new(false)),
            active_ctx: Arc::new(Mutex::new(None)),
        };
        self.registrations.write().await.insert(id, registration);
    }

    async fn registration(&self, id: &str) -> Result<Registration, CommentError> {
        self.registrations
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CommentError::unknown_migration(id))
    }

    /// Current state (freshly probed) and whether a run is in flight.
    pub async fn status(&self, id: &str) -> Result<MigrationStatus, CommentError> {
        let registration = self.registration(id).await?;
        let state: MigrationState = registration.migrator.probe_state().await?;
        Ok(MigrationStatus {
            state,
            is_running: registration.running.load(Ordering::SeqCst),
        })
    }

    /// Start one migration step as a background task.
    ///
    /// Fails with `MigrationAlreadyRunning` when a run for this id is still in
    /// flight; the running flag is claimed before the task is spawned, so the
    /// check is race-free for callers on the same service.
    pub async fn run_step(&self, id: &str, step_id: &str) -> Result<(), CommentError> {
        let registration = self.registration(id).await?;
        let step = MigrationStep::from_id(step_id)
            .ok_or_else(|| CommentError::unsupported(format!("unknown migration step: {}", step_id)))?;

        if registration
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CommentError::migration_already_running(id));
        }

        let ctx = Arc::new(LoggingMigrationContext::new());
        *registration.active_ctx.lock().unwrap() = Some(ctx.clone());

        let migration_id = id.to_string();
        let migrator = registration.migrator.clone();
        let running = registration.running.clone();
        let active_ctx = registration.active_ctx.clone();
        tokio::spawn(async move {
            tracing::info!("Migration {} step {} starting", migration_id, step.id());
            match migrator.run_step(step, ctx.as_ref()).await {
                Ok(()) => {
                    tracing::info!("Migration {} step {} finished", migration_id, step.id())
                }
                Err(err) => {
                    tracing::error!("Migration {} step {} failed: {}", migration_id, step.id(), err)
                }
            }
            *active_ctx.lock().unwrap() = None;
            running.store(false, Ordering::SeqCst);
        });
        Ok(())
    }

    /// Ask the active run (if any) to stop at the next batch boundary.
    pub async fn request_shutdown(&self, id: &str) -> Result<(), CommentError> {
        let registration = self.registration(id).await?;
        if let Some(ctx) = registration.active_ctx.lock().unwrap().as_ref() {
            ctx.request_shutdown();
        }
        Ok(())
    }
}
