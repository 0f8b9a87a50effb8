//! Alert lifecycle state machine
//!
//! `Idle → Active (rendered) → Cooldown → Idle`, with a FIFO queue for
//! requests that arrive while an alert is showing. The single
//! active-alert slot is protected by the scheduler's own state mutex;
//! the state machine object is passed by reference to all producers
//! rather than living in implicit module state. Severity styles the
//! overlay; it never reorders the queue and never bypasses cooldown.

use super::overlay::{Overlay, OverlayHost};
use super::{AlertOutcome, AlertRequest};
use crate::signals::{AlertContext, ContextSignal, SignalHub};
use crate::stats::StatsSink;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Scheduler timing configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How long an unattended alert stays visible
    pub auto_dismiss: Duration,
    /// Quiet interval after a dismissal before the next alert renders
    pub cooldown: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            auto_dismiss: Duration::from_secs(10),
            cooldown: Duration::from_secs(1),
        }
    }
}

/// Lifecycle phase of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// No alert visible, queue empty or draining
    Idle,
    /// One alert rendered, awaiting user action or auto-dismiss
    Active,
    /// Post-dismissal quiet interval
    Cooldown,
}

struct ActiveAlert {
    request: AlertRequest,
    epoch: u64,
}

struct SchedulerState {
    phase: SchedulerPhase,
    active: Option<ActiveAlert>,
    queue: VecDeque<AlertRequest>,
    /// Bumped on every activation so stale timer callbacks are inert
    epoch: u64,
    timer: Option<JoinHandle<()>>,
}

/// Renders at most one alert at a time, queueing the rest FIFO.
pub struct AlertScheduler {
    state: Mutex<SchedulerState>,
    overlay: Arc<dyn OverlayHost>,
    stats: Arc<dyn StatsSink>,
    signals: SignalHub,
    config: SchedulerConfig,
}

impl AlertScheduler {
    /// Create a scheduler over the given rendering and stats seams.
    pub fn new(
        overlay: Arc<dyn OverlayHost>,
        stats: Arc<dyn StatsSink>,
        signals: SignalHub,
        config: SchedulerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SchedulerState {
                phase: SchedulerPhase::Idle,
                active: None,
                queue: VecDeque::new(),
                epoch: 0,
                timer: None,
            }),
            overlay,
            stats,
            signals,
            config,
        })
    }

    /// Submit an alert request.
    ///
    /// Renders immediately when idle; otherwise appends to the FIFO
    /// queue and returns without rendering.
    pub async fn request(self: &Arc<Self>, request: AlertRequest) {
        let mut state = self.state.lock().await;
        if state.phase == SchedulerPhase::Idle {
            self.activate_locked(&mut state, request);
        } else {
            state.queue.push_back(request);
        }
    }

    /// Dismiss the active alert with the given outcome.
    ///
    /// Returns false when nothing is active. Edit and continue outcomes
    /// are broadcast to the context signal channel; the blocked action
    /// behind a form-submission alert may proceed only on an explicit
    /// continue, never automatically.
    pub async fn resolve(self: &Arc<Self>, outcome: AlertOutcome) -> bool {
        self.dismiss(outcome, None).await
    }

    /// Current lifecycle phase.
    pub async fn phase(&self) -> SchedulerPhase {
        self.state.lock().await.phase
    }

    /// Number of queued (not yet rendered) requests.
    pub async fn queue_len(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    /// The request currently rendered, if any.
    pub async fn active_request(&self) -> Option<AlertRequest> {
        self.state
            .lock()
            .await
            .active
            .as_ref()
            .map(|a| a.request.clone())
    }

    /// Render a request, falling through the queue past any that fail
    /// to render. Alerts are best-effort: a failed render drops the
    /// request without retry.
    fn activate_locked(self: &Arc<Self>, state: &mut SchedulerState, request: AlertRequest) {
        let mut next = Some(request);
        while let Some(request) = next.take() {
            state.epoch += 1;
            let epoch = state.epoch;
            match self.overlay.render(Overlay::from_request(&request)) {
                Ok(()) => {
                    let stats = Arc::clone(&self.stats);
                    let findings = request.finding_count();
                    tokio::spawn(async move {
                        // Fire-and-forget telemetry; delivery failure is
                        // non-critical.
                        if let Err(e) = stats.report_alert_shown(findings).await {
                            tracing::debug!(error = %e, "Stats report failed, ignoring");
                        }
                    });
                    state.timer = Some(self.spawn_auto_dismiss(epoch));
                    state.active = Some(ActiveAlert { request, epoch });
                    state.phase = SchedulerPhase::Active;
                    return;
                }
                Err(e) => {
                    tracing::warn!(alert = %request.id, error = %e, "Overlay render failed, dropping alert");
                    next = state.queue.pop_front();
                }
            }
        }
        state.active = None;
        state.phase = SchedulerPhase::Idle;
    }

    async fn dismiss(self: &Arc<Self>, outcome: AlertOutcome, epoch: Option<u64>) -> bool {
        let mut state = self.state.lock().await;
        if state.phase != SchedulerPhase::Active {
            return false;
        }
        if let Some(expected) = epoch {
            // A stale auto-dismiss must never kill a newer alert.
            match &state.active {
                Some(active) if active.epoch == expected => {}
                _ => return false,
            }
        }
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        self.overlay.clear();
        if let Some(active) = state.active.take() {
            match outcome {
                AlertOutcome::EditRequested => {
                    if let Some(surface) = active.request.source {
                        self.signals.emit(ContextSignal::EditRequested { surface });
                    }
                }
                AlertOutcome::ContinueAllowed => {
                    self.signals.emit(ContextSignal::ContinueAllowed {
                        context: AlertContext {
                            kind: active.request.kind,
                            source: active.request.source,
                        },
                    });
                }
                AlertOutcome::Acknowledged | AlertOutcome::Expired => {}
            }
            tracing::debug!(alert = %active.request.id, outcome = ?outcome, "Alert dismissed");
        }
        state.phase = SchedulerPhase::Cooldown;
        state.timer = Some(self.spawn_cooldown(state.epoch));
        true
    }

    fn spawn_auto_dismiss(self: &Arc<Self>, epoch: u64) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        let delay = self.config.auto_dismiss;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = scheduler.dismiss(AlertOutcome::Expired, Some(epoch)).await;
        })
    }

    fn spawn_cooldown(self: &Arc<Self>, epoch: u64) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        let delay = self.config.cooldown;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = scheduler.state.lock().await;
            if state.phase != SchedulerPhase::Cooldown || state.epoch != epoch {
                return;
            }
            match state.queue.pop_front() {
                Some(next) => scheduler.activate_locked(&mut state, next),
                None => state.phase = SchedulerPhase::Idle,
            }
        })
    }
}
