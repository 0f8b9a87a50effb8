//! # safepost
//!
//! Real-time sensitive-data detection and alert sequencing for
//! user-authored content.
//!
//! ## Overview
//!
//! `safepost` watches text surfaces and file selections across a
//! mutating page, classifies snapshots as sensitive (financial,
//! contact, credential, location data) or oversharing (contextual
//! phrases implying risk), and surfaces a single, rate-limited warning
//! before the user submits or posts.
//!
//! ## Architecture
//!
//! Five components composed as a pipeline driven by page events:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                         Page model (dom)                           │
//! │   element arena · mutation batches · input/paste/file events      │
//! └───────────────────────────────┬───────────────────────────────────┘
//!                                 │ PageEvent stream
//! ┌───────────────────────────────▼───────────────────────────────────┐
//! │                          PostMonitor                               │
//! │  ┌──────────────────┐   ┌────────────────────────────────────┐   │
//! │  │ Surface Registry │──▶│ Debounced Event Sequencer          │   │
//! │  │ weak refs, lazy  │   │ per-surface cancellable timers,    │   │
//! │  │ reconciliation   │   │ last-write-wins snapshots          │   │
//! │  └──────────────────┘   └─────────────────┬──────────────────┘   │
//! │                                           │ AnalysisRequest       │
//! │  ┌────────────────────────────────────────▼──────────────────┐   │
//! │  │ Classifier                                                 │   │
//! │  │ gated detection rules + unconditional oversharing rules   │   │
//! │  └────────────────────────────────────────┬──────────────────┘   │
//! │                                           │ ClassificationResult  │
//! │  ┌──────────────────┐   ┌─────────────────▼──────────────────┐   │
//! │  │ File Upload      │──▶│ Alert Scheduler                    │   │
//! │  │ Watcher          │   │ Idle → Active → Cooldown, FIFO     │   │
//! │  └──────────────────┘   └─────────────────┬──────────────────┘   │
//! └───────────────────────────────────────────┼──────────────────────┘
//!                                             │
//!                 overlay host · stats sink · context signals
//! ```
//!
//! External collaborators (the settings store, the stats sink, and the
//! overlay rendering surface) are trait seams with in-memory
//! implementations for single-process use and tests.
//!
//! ## Quick Start
//!
//! ```rust
//! use safepost::{
//!     Document, MemoryOverlayHost, MemorySettingsStore, MemoryStatsSink, MonitorConfig,
//!     PostMonitor,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let (document, events) = Document::new("example.com");
//! let (monitor, _loop) = PostMonitor::start(
//!     Arc::clone(&document),
//!     events,
//!     Arc::new(MemorySettingsStore::default()),
//!     Arc::new(MemoryOverlayHost::new()),
//!     Arc::new(MemoryStatsSink::new()),
//!     MonitorConfig::default(),
//! )
//! .await;
//!
//! let input = document.create_element_with("input", &[("type", "text")]);
//! document.append(document.root(), &input);
//! document.input(&input, "call me at 555-123-4567");
//! // After the quiet period, the scheduler renders a privacy alert.
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`dom`]: observed page model (element arena, mutation events)
//! - [`registry`]: surface discovery and weak-reference tracking
//! - [`sequencer`]: per-surface debounce timers
//! - [`classifier`]: multi-category classification with severity ranking
//! - [`rules`]: fixed detection and oversharing rule sets
//! - [`alert`]: alert requests, overlay seam, and the one-at-a-time scheduler
//! - [`uploads`]: file-upload sibling path
//! - [`monitor`]: pipeline composition and the event loop
//! - [`settings`]: cached settings snapshot and collaborator seam
//! - [`stats`]: fire-and-forget stats collaborator seam
//! - [`signals`]: outbound context signal broadcast

pub mod alert;
pub mod classifier;
pub mod dom;
pub mod error;
pub mod monitor;
pub mod registry;
pub mod rules;
pub mod sequencer;
pub mod settings;
pub mod signals;
pub mod stats;
pub mod uploads;

// Re-export core types
pub use alert::{
    AlertKind, AlertOutcome, AlertRequest, AlertScheduler, MemoryOverlayHost, Overlay,
    OverlayHost, SchedulerConfig, SchedulerPhase, OVERLAY_ELEMENT_ID,
};
pub use classifier::{ClassificationResult, Classifier, Finding, OversharingFinding};
pub use dom::{Document, Element, FileMeta, MutationBatch, NodeId, PageEvent};
pub use error::{Error, Result};
pub use monitor::{MonitorConfig, PostMonitor};
pub use registry::{match_surface, Surface, SurfaceKind, SurfaceRegistry};
pub use rules::{
    default_detection_rules, default_oversharing_rules, DetectionRule, OversharingRule, RuleSet,
    Severity,
};
pub use sequencer::{AnalysisRequest, DebounceSequencer};
pub use settings::{
    default_detection_toggles, MemorySettingsStore, SensitivityLevel, Settings, SettingsHandle,
    SettingsStore,
};
pub use signals::{AlertContext, ContextSignal, SignalHub};
pub use stats::{MemoryStatsSink, StatsSink};
pub use uploads::FileUploadWatcher;
