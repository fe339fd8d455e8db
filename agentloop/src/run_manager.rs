//! Run lifecycle: create/get/update/list over a `RunStore`, enforcing the
//! `created -> running -> {completed|cancelled|failed}` state machine as a
//! compare-and-set on status.
//!
//! The trait split (a narrow async trait owning persistence, `RunManager`
//! owning the state-machine policy on top of it) mirrors the teacher's
//! `Checkpointer<S>` pattern in `memory/checkpointer.rs`: the store defines
//! where runs live, the manager defines what writes are legal.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum RunManagerError {
    #[error("run not found: {0}")]
    NotFound(String),
    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition { from: RunStatus, to: RunStatus },
    #[error("storage error: {0}")]
    Storage(String),
}

/// Status of a Run. Terminal states are absorbing: once reached, no further
/// transition is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Created,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl RunStatus {
    fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Whether writing `to` is a legal transition from `self`.
    fn can_transition_to(self, to: Self) -> bool {
        use RunStatus::*;
        match (self, to) {
            (Created, Running) => true,
            (Created, Cancelled) => true,
            (Running, Completed | Cancelled | Failed) => true,
            _ => false,
        }
    }
}

/// Reason a run stopped, surfaced to clients on terminal transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxSteps,
    Cancelled,
    Error,
    LlmApiError,
    Refused,
}

/// One user-initiated turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub agent_id: String,
    pub status: RunStatus,
    pub background: bool,
    pub stop_reason: Option<StopReason>,
    pub error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Run {
    pub fn new(id: impl Into<String>, agent_id: impl Into<String>, background: bool, now: i64) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            status: RunStatus::Created,
            background,
            stop_reason: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A status/stop-reason/error write requested by a caller.
#[derive(Debug, Clone, Default)]
pub struct RunUpdate {
    pub status: Option<RunStatus>,
    pub stop_reason: Option<StopReason>,
    pub error: Option<String>,
}

/// Persistence contract for `Run` records. An external store would implement
/// `update` as a conditional `UPDATE ... WHERE status = ?`; the in-memory
/// implementation here serializes reads and the state-machine check behind
/// one `RwLock` write guard to the same effect.
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn create(&self, run: Run) -> Result<Run, RunManagerError>;
    async fn get(&self, run_id: &str) -> Result<Run, RunManagerError>;
    async fn update(&self, run_id: &str, update: RunUpdate, now: i64) -> Result<Run, RunManagerError>;
    async fn list_by_agent(&self, agent_id: &str) -> Result<Vec<Run>, RunManagerError>;
}

/// In-process `RunStore`, used by tests and as the default when no durable
/// store is configured.
#[derive(Clone, Default)]
pub struct InMemoryRunStore {
    runs: Arc<RwLock<HashMap<String, Run>>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn create(&self, run: Run) -> Result<Run, RunManagerError> {
        let mut runs = self.runs.write().await;
        runs.insert(run.id.clone(), run.clone());
        Ok(run)
    }

    async fn get(&self, run_id: &str) -> Result<Run, RunManagerError> {
        self.runs.read().await.get(run_id).cloned().ok_or_else(|| RunManagerError::NotFound(run_id.to_string()))
    }

    async fn update(&self, run_id: &str, update: RunUpdate, now: i64) -> Result<Run, RunManagerError> {
        let mut runs = self.runs.write().await;
        let run = runs.get_mut(run_id).ok_or_else(|| RunManagerError::NotFound(run_id.to_string()))?;

        if let Some(to) = update.status {
            if !run.status.can_transition_to(to) {
                return Err(RunManagerError::InvalidTransition { from: run.status, to });
            }
            run.status = to;
        }
        if let Some(reason) = update.stop_reason {
            run.stop_reason = Some(reason);
        }
        if update.error.is_some() {
            run.error = update.error;
        }
        run.updated_at = now;
        Ok(run.clone())
    }

    async fn list_by_agent(&self, agent_id: &str) -> Result<Vec<Run>, RunManagerError> {
        Ok(self.runs.read().await.values().filter(|r| r.agent_id == agent_id).cloned().collect())
    }
}

/// Enforces the run state machine on top of a `RunStore`.
pub struct RunManager<S: RunStore> {
    store: S,
}

impl<S: RunStore> RunManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn create(&self, id: impl Into<String>, agent_id: impl Into<String>, background: bool, now: i64) -> Result<Run, RunManagerError> {
        self.store.create(Run::new(id, agent_id, background, now)).await
    }

    pub async fn get(&self, run_id: &str) -> Result<Run, RunManagerError> {
        self.store.get(run_id).await
    }

    pub async fn update(&self, run_id: &str, update: RunUpdate, now: i64) -> Result<Run, RunManagerError> {
        self.store.update(run_id, update, now).await
    }

    /// Out-of-band cancellation: legal from `created` or `running`, regardless
    /// of what the owning step loop is doing. This is how the step loop's
    /// cancellation token learns about a cancellation initiated elsewhere.
    pub async fn request_cancellation(&self, run_id: &str, now: i64) -> Result<Run, RunManagerError> {
        self.store
            .update(run_id, RunUpdate { status: Some(RunStatus::Cancelled), stop_reason: Some(StopReason::Cancelled), error: None }, now)
            .await
    }

    pub async fn list_by_agent(&self, agent_id: &str) -> Result<Vec<Run>, RunManagerError> {
        self.store.list_by_agent(agent_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> RunManager<InMemoryRunStore> {
        RunManager::new(InMemoryRunStore::new())
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let manager = manager();
        manager.create("run-1", "agent-1", false, 0).await.unwrap();
        let run = manager.get("run-1").await.unwrap();
        assert_eq!(run.status, RunStatus::Created);
    }

    #[tokio::test]
    async fn legal_transition_chain_succeeds() {
        let manager = manager();
        manager.create("run-1", "agent-1", false, 0).await.unwrap();
        manager.update("run-1", RunUpdate { status: Some(RunStatus::Running), ..Default::default() }, 1).await.unwrap();
        let run = manager
            .update("run-1", RunUpdate { status: Some(RunStatus::Completed), stop_reason: Some(StopReason::EndTurn), ..Default::default() }, 2)
            .await
            .unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.stop_reason, Some(StopReason::EndTurn));
    }

    #[tokio::test]
    async fn skipping_running_is_rejected() {
        let manager = manager();
        manager.create("run-1", "agent-1", false, 0).await.unwrap();
        let err = manager
            .update("run-1", RunUpdate { status: Some(RunStatus::Completed), ..Default::default() }, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, RunManagerError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn terminal_state_rejects_further_transitions() {
        let manager = manager();
        manager.create("run-1", "agent-1", false, 0).await.unwrap();
        manager.update("run-1", RunUpdate { status: Some(RunStatus::Running), ..Default::default() }, 1).await.unwrap();
        manager.update("run-1", RunUpdate { status: Some(RunStatus::Failed), ..Default::default() }, 2).await.unwrap();
        let err = manager
            .update("run-1", RunUpdate { status: Some(RunStatus::Running), ..Default::default() }, 3)
            .await
            .unwrap_err();
        assert!(matches!(err, RunManagerError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn out_of_band_cancellation_from_created_succeeds() {
        let manager = manager();
        manager.create("run-1", "agent-1", false, 0).await.unwrap();
        let run = manager.request_cancellation("run-1", 1).await.unwrap();
        assert_eq!(run.status, RunStatus::Cancelled);
    }

    #[tokio::test]
    async fn list_by_agent_filters_other_agents() {
        let manager = manager();
        manager.create("run-1", "agent-1", false, 0).await.unwrap();
        manager.create("run-2", "agent-2", false, 0).await.unwrap();
        let runs = manager.list_by_agent("agent-1").await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, "run-1");
    }

    #[tokio::test]
    async fn get_unknown_run_is_not_found() {
        let manager = manager();
        let err = manager.get("missing").await.unwrap_err();
        assert!(matches!(err, RunManagerError::NotFound(_)));
    }
}
