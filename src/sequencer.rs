//! Debounced event sequencing
//!
//! Collapses a burst of raw events on one surface into exactly one
//! analysis trigger after the input stream goes quiet. Timers are
//! cancellable scheduled tasks keyed by surface identity: a newly
//! scheduled debounce on the same surface always aborts the prior one
//! (last-write-wins), so superseded snapshots are discarded and never
//! queued for classification.

use crate::dom::NodeId;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Settle delay after a paste, letting the field's value update before
/// it is read.
pub const PASTE_SETTLE: Duration = Duration::from_millis(100);

/// A coalesced request for one classification pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// Surface the burst originated from
    pub surface: NodeId,
    /// Snapshot taken at schedule time; `None` means the current
    /// element text should be read instead (paste settle path)
    pub text: Option<String>,
}

/// Per-surface debounce timers feeding the analysis channel.
pub struct DebounceSequencer {
    pending: Mutex<HashMap<NodeId, JoinHandle<()>>>,
    tx: mpsc::UnboundedSender<AnalysisRequest>,
    paste_settle: Duration,
}

impl DebounceSequencer {
    /// Create a sequencer and the analysis stream it feeds.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AnalysisRequest>) {
        Self::with_settle(PASTE_SETTLE)
    }

    /// Create a sequencer with a custom paste settle delay.
    pub fn with_settle(
        paste_settle: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<AnalysisRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                pending: Mutex::new(HashMap::new()),
                tx,
                paste_settle,
            },
            rx,
        )
    }

    /// Schedule analysis of `snapshot` after the quiet period.
    ///
    /// Any prior pending timer for the surface is cancelled first, so
    /// only the last snapshot before quiet reaches the classifier.
    pub fn schedule(&self, surface: NodeId, snapshot: String, quiet: Duration) {
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            let _ = tx.send(AnalysisRequest {
                surface,
                text: Some(snapshot),
            });
        });
        self.replace(surface, handle);
    }

    /// Schedule a paste settle: after the fixed delay the monitor reads
    /// the element's current text, so the pasted value is observed.
    pub fn schedule_settle(&self, surface: NodeId) {
        let tx = self.tx.clone();
        let settle = self.paste_settle;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(settle).await;
            let _ = tx.send(AnalysisRequest {
                surface,
                text: None,
            });
        });
        self.replace(surface, handle);
    }

    /// Cancel the pending timer for a surface, if any. Never an error:
    /// cancelling an unknown surface is a no-op.
    pub fn cancel(&self, surface: NodeId) {
        if let Some(handle) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&surface)
        {
            handle.abort();
        }
    }

    /// Number of timers still pending.
    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|h| !h.is_finished())
            .count()
    }

    fn replace(&self, surface: NodeId, handle: JoinHandle<()>) {
        if let Some(prev) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(surface, handle)
        {
            prev.abort();
        }
    }
}
