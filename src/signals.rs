//! Outbound context signals
//!
//! Broadcast notifications to the host page and sibling components.
//! Signals are fan-out, not targeted RPC: any number of listeners may
//! observe them, including none.

use crate::alert::AlertKind;
use crate::dom::NodeId;
use tokio::sync::broadcast;

/// Context attached to a continue-allowed signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertContext {
    /// Kind of the alert the user continued past
    pub kind: AlertKind,
    /// Surface the alert originated from, when known
    pub source: Option<NodeId>,
}

/// A signal broadcast by the core.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextSignal {
    /// The user chose to edit: the originating surface should regain focus.
    EditRequested { surface: NodeId },
    /// The user explicitly allowed the blocked action to proceed.
    ContinueAllowed { context: AlertContext },
    /// Enhanced monitoring became active for a recognized context.
    EnhancedMonitoringEnabled { context: String },
}

/// Broadcast hub for context signals.
#[derive(Clone)]
pub struct SignalHub {
    tx: broadcast::Sender<ContextSignal>,
}

impl SignalHub {
    /// Create a hub with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Broadcast a signal. Having no listeners is not an error.
    pub fn emit(&self, signal: ContextSignal) {
        let _ = self.tx.send(signal);
    }

    /// Subscribe to the signal stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ContextSignal> {
        self.tx.subscribe()
    }
}

impl Default for SignalHub {
    fn default() -> Self {
        Self::new(64)
    }
}
