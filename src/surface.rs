use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::render::Report;

pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::from_secs(180);

pub type ReportProducer = Arc<dyn Fn() -> BoxFuture<'static, Report> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Refreshed(Report),
    NotOwner,
    Expired,
    Dismissed,
}

/// Identity-bound refresh capability attached to a rendered report. Only
/// the original requester may trigger it; a trigger re-runs the bound
/// producer (the full aggregation pipeline, never a cached replay) and
/// atomically replaces the held rendered content. Expiry is absolute from
/// creation and is never reset by use. Concurrent triggers serialize, so
/// no two reports are mid-construction for the same binding at once.
pub struct RefreshBinding {
    owner_actor_id: u64,
    producer: ReportProducer,
    deadline: Instant,
    rendered: Mutex<Report>,
    gate: Mutex<()>,
    dismissed: CancellationToken,
}

impl RefreshBinding {
    pub fn new(owner_actor_id: u64, initial: Report, producer: ReportProducer) -> Self {
        Self::with_window(owner_actor_id, initial, producer, DEFAULT_REFRESH_WINDOW)
    }

    pub fn with_window(
        owner_actor_id: u64,
        initial: Report,
        producer: ReportProducer,
        window: Duration,
    ) -> Self {
        Self {
            owner_actor_id,
            producer,
            deadline: Instant::now() + window,
            rendered: Mutex::new(initial),
            gate: Mutex::new(()),
            dismissed: CancellationToken::new(),
        }
    }

    pub fn owner_actor_id(&self) -> u64 {
        self.owner_actor_id
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Marks the surface as destroyed by the host. An in-flight refresh is
    /// allowed to finish, but its result is discarded.
    pub fn dismiss(&self) {
        self.dismissed.cancel();
    }

    pub fn is_dismissed(&self) -> bool {
        self.dismissed.is_cancelled()
    }

    pub async fn current(&self) -> Report {
        self.rendered.lock().await.clone()
    }

    pub async fn trigger(&self, actor_id: u64) -> TriggerOutcome {
        if actor_id != self.owner_actor_id {
            return TriggerOutcome::NotOwner;
        }
        if self.dismissed.is_cancelled() {
            return TriggerOutcome::Dismissed;
        }
        if self.is_expired() {
            return TriggerOutcome::Expired;
        }

        let _serialized = self.gate.lock().await;
        // A trigger that waited out the window behind an earlier refresh is
        // rejected rather than run against an expired surface.
        if self.is_expired() {
            return TriggerOutcome::Expired;
        }

        let report = (self.producer)().await;
        if self.dismissed.is_cancelled() {
            return TriggerOutcome::Dismissed;
        }

        *self.rendered.lock().await = report.clone();
        TriggerOutcome::Refreshed(report)
    }
}
