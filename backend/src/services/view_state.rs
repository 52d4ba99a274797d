//! Query lifecycle for the query-driven views
//!
//! Each view instance owns a [`ViewController`]. Starting a query hands out a
//! ticket with a new generation; when a query finishes with a ticket that is no
//! longer current its result is dropped (last query wins). Every query runs
//! under a timeout.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use shared::QueryState;
use tokio::sync::RwLock;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// The views served by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    ItemHistory,
    IssueSummary,
    PurchaseProjection,
}

/// Proof that a query was started; compared against the controller on completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryTicket {
    generation: u64,
}

impl QueryTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

struct ControllerState {
    phase: QueryState<()>,
    last_used: Instant,
}

pub struct ViewController {
    kind: ViewKind,
    generation: AtomicU64,
    state: Mutex<ControllerState>,
    query_timeout: Duration,
    debounce: Duration,
}

impl ViewController {
    pub fn new(kind: ViewKind, query_timeout: Duration, debounce: Duration) -> Self {
        Self {
            kind,
            generation: AtomicU64::new(0),
            state: Mutex::new(ControllerState {
                phase: QueryState::Idle,
                last_used: Instant::now(),
            }),
            query_timeout,
            debounce,
        }
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ControllerState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    /// Start a new query, superseding any in flight
    pub fn begin(&self) -> QueryTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.with_state(|state| {
            state.phase = QueryState::Loading;
            state.last_used = Instant::now();
        });
        QueryTicket { generation }
    }

    pub fn is_current(&self, ticket: &QueryTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.generation
    }

    /// Current phase name
    pub fn phase(&self) -> &'static str {
        self.with_state(|state| state.phase.phase())
    }

    pub fn is_loading(&self) -> bool {
        self.with_state(|state| state.phase.is_loading())
    }

    fn idle_for(&self) -> Duration {
        self.with_state(|state| state.last_used.elapsed())
    }

    /// Wait out the debounce window; fails if a newer query arrived meanwhile
    pub async fn debounce(&self, ticket: &QueryTicket) -> AppResult<()> {
        if !self.debounce.is_zero() {
            tokio::time::sleep(self.debounce).await;
        }
        if self.is_current(ticket) {
            Ok(())
        } else {
            Err(AppError::Superseded)
        }
    }

    /// Run `query` under the timeout and settle the view.
    ///
    /// A result that arrives after a newer query started is discarded and
    /// reported as [`AppError::Superseded`] without touching the view phase.
    pub async fn run<T, F>(
        &self,
        ticket: &QueryTicket,
        query: F,
        is_empty: impl FnOnce(&T) -> bool,
    ) -> AppResult<QueryState<T>>
    where
        F: Future<Output = AppResult<T>>,
    {
        let query_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "query",
            %query_id,
            view = ?self.kind,
            generation = ticket.generation
        );

        let outcome = match tokio::time::timeout(self.query_timeout, query.instrument(span)).await
        {
            Ok(result) => result,
            Err(_) => Err(AppError::QueryTimeout(self.query_timeout.as_secs())),
        };

        if !self.is_current(ticket) {
            tracing::debug!(%query_id, view = ?self.kind, "Discarding superseded result");
            return Err(AppError::Superseded);
        }

        match outcome {
            Ok(value) => {
                let empty = is_empty(&value);
                self.with_state(|state| {
                    state.phase = if empty {
                        QueryState::Empty
                    } else {
                        QueryState::Success(())
                    };
                    state.last_used = Instant::now();
                });
                Ok(QueryState::finished(value, empty))
            }
            Err(e) => {
                self.with_state(|state| {
                    state.phase = QueryState::Error(e.to_string());
                    state.last_used = Instant::now();
                });
                Err(e)
            }
        }
    }
}

/// Controllers per `(session, view)`
pub struct ViewRegistry {
    controllers: RwLock<HashMap<(String, ViewKind), Arc<ViewController>>>,
    max_sessions: usize,
    query_timeout: Duration,
    debounce: Duration,
}

impl ViewRegistry {
    pub fn new(max_sessions: usize, query_timeout: Duration, debounce: Duration) -> Self {
        Self {
            controllers: RwLock::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
            query_timeout,
            debounce,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.views.max_sessions,
            Duration::from_secs(config.store.query_timeout_secs),
            Duration::from_millis(config.views.debounce_ms),
        )
    }

    /// Controller not tied to any session, for callers that do not identify one.
    ///
    /// Nothing can supersede it, so it does not debounce.
    pub fn detached(&self, kind: ViewKind) -> Arc<ViewController> {
        Arc::new(ViewController::new(kind, self.query_timeout, Duration::ZERO))
    }

    /// Controller for a view session, created on first use
    pub async fn controller(&self, session: Option<&str>, kind: ViewKind) -> Arc<ViewController> {
        let Some(session) = session.map(str::trim).filter(|s| !s.is_empty()) else {
            return self.detached(kind);
        };
        let key = (session.to_string(), kind);

        if let Some(existing) = self.controllers.read().await.get(&key) {
            return existing.clone();
        }

        let mut controllers = self.controllers.write().await;
        if let Some(existing) = controllers.get(&key) {
            return existing.clone();
        }
        if controllers.len() >= self.max_sessions {
            Self::prune(&mut controllers, self.max_sessions - 1);
        }
        if controllers.len() >= self.max_sessions {
            tracing::warn!(
                sessions = controllers.len(),
                "Every view session is loading, serving the request detached"
            );
            return self.detached(kind);
        }
        let controller = Arc::new(ViewController::new(kind, self.query_timeout, self.debounce));
        controllers.insert(key, controller.clone());
        controller
    }

    /// Drop the longest-idle controllers that are not loading
    fn prune(controllers: &mut HashMap<(String, ViewKind), Arc<ViewController>>, keep: usize) {
        let mut idle: Vec<((String, ViewKind), Duration)> = controllers
            .iter()
            .filter(|(_, c)| !c.is_loading())
            .map(|(k, c)| (k.clone(), c.idle_for()))
            .collect();
        idle.sort_by(|a, b| b.1.cmp(&a.1));

        let excess = controllers.len().saturating_sub(keep);
        for (key, _) in idle.into_iter().take(excess) {
            controllers.remove(&key);
        }
        tracing::debug!(remaining = controllers.len(), "Pruned idle view sessions");
    }

    pub async fn session_count(&self) -> usize {
        self.controllers.read().await.len()
    }
}
