//! Stats collaborator seam
//!
//! Alert counters live in an external store; the core only reports
//! fire-and-forget increments. Delivery failure is non-critical
//! telemetry and is silently ignored.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// The external statistics collaborator.
#[async_trait::async_trait]
pub trait StatsSink: Send + Sync {
    /// Record that an alert was shown covering `finding_count` findings.
    async fn report_alert_shown(&self, finding_count: usize) -> Result<()>;
}

/// In-memory stats sink for single-process use and tests.
#[derive(Default)]
pub struct MemoryStatsSink {
    alerts_shown: AtomicU64,
    data_protected: AtomicU64,
    unavailable: AtomicBool,
}

impl MemoryStatsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of alerts reported so far.
    pub fn alerts_shown(&self) -> u64 {
        self.alerts_shown.load(Ordering::Acquire)
    }

    /// Total findings covered by reported alerts.
    pub fn data_protected(&self) -> u64 {
        self.data_protected.load(Ordering::Acquire)
    }

    /// Simulate a collaborator outage: reports fail until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Release);
    }
}

#[async_trait::async_trait]
impl StatsSink for MemoryStatsSink {
    async fn report_alert_shown(&self, finding_count: usize) -> Result<()> {
        if self.unavailable.load(Ordering::Acquire) {
            return Err(Error::Stats("stats sink unavailable".to_string()));
        }
        self.alerts_shown.fetch_add(1, Ordering::AcqRel);
        self.data_protected
            .fetch_add(finding_count.max(1) as u64, Ordering::AcqRel);
        Ok(())
    }
}
