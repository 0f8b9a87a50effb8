//! Pipeline composition and the page event loop
//!
//! `PostMonitor` wires the registry, sequencer, classifier, scheduler,
//! and upload watcher together and drives them from the document's
//! event stream. One select loop consumes page events and coalesced
//! analysis requests, so per-surface ordering is preserved while
//! analyses across surfaces stay independent.

use crate::alert::{AlertRequest, AlertScheduler, OverlayHost, SchedulerConfig};
use crate::classifier::Classifier;
use crate::dom::{collect_subtree, Document, Element, NodeId, PageEvent};
use crate::registry::{match_surface, SurfaceKind, SurfaceRegistry};
use crate::sequencer::{AnalysisRequest, DebounceSequencer, PASTE_SETTLE};
use crate::settings::{SettingsHandle, SettingsStore};
use crate::signals::{ContextSignal, SignalHub};
use crate::stats::StatsSink;
use crate::uploads::FileUploadWatcher;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Hosts on which enhanced monitoring is enabled at startup.
fn default_social_hosts() -> Vec<String> {
    [
        "facebook.com",
        "instagram.com",
        "twitter.com",
        "x.com",
        "linkedin.com",
        "tiktok.com",
        "snapchat.com",
        "discord.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Monitor configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Alert scheduler timing
    pub scheduler: SchedulerConfig,
    /// Settle delay after a paste before the field is read
    pub paste_settle: Duration,
    /// Hosts treated as social platforms
    pub social_hosts: Vec<String>,
    /// Context signal channel capacity
    pub signal_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            paste_settle: PASTE_SETTLE,
            social_hosts: default_social_hosts(),
            signal_capacity: 64,
        }
    }
}

/// The composed detection-and-alert pipeline for one document.
pub struct PostMonitor {
    document: Arc<Document>,
    registry: SurfaceRegistry,
    sequencer: Arc<DebounceSequencer>,
    classifier: Classifier,
    scheduler: Arc<AlertScheduler>,
    uploads: FileUploadWatcher,
    settings: Arc<SettingsHandle>,
    signals: SignalHub,
    enhanced: AtomicBool,
    analyses: AtomicU64,
}

impl PostMonitor {
    /// Compose the pipeline over a document and start the event loop.
    ///
    /// Performs the initial settings fetch and surface scan, enables
    /// enhanced monitoring when the host is a recognized social
    /// platform, and returns the monitor together with the loop handle.
    pub async fn start(
        document: Arc<Document>,
        events: mpsc::UnboundedReceiver<PageEvent>,
        store: Arc<dyn SettingsStore>,
        overlay: Arc<dyn OverlayHost>,
        stats: Arc<dyn StatsSink>,
        config: MonitorConfig,
    ) -> (Arc<Self>, JoinHandle<()>) {
        let signals = SignalHub::new(config.signal_capacity);
        let settings = SettingsHandle::new(store);
        settings.refresh().await;
        let _ = settings.spawn_watcher();

        let (sequencer, analyses_rx) = DebounceSequencer::with_settle(config.paste_settle);
        let sequencer = Arc::new(sequencer);
        let registry = SurfaceRegistry::new(Arc::clone(&sequencer));
        let scheduler =
            AlertScheduler::new(overlay, stats, signals.clone(), config.scheduler.clone());
        let uploads = FileUploadWatcher::new(Arc::clone(&scheduler));
        let classifier = Classifier::with_defaults();

        let toggles = settings.current().await.detection_toggles;
        let unreachable = classifier.rules().unreachable_categories(&toggles);
        if !unreachable.is_empty() {
            tracing::warn!(
                categories = ?unreachable,
                "Detection categories without a settings toggle can never be enabled"
            );
        }

        let monitor = Arc::new(Self {
            document,
            registry,
            sequencer,
            classifier,
            scheduler,
            uploads,
            settings,
            signals: signals.clone(),
            enhanced: AtomicBool::new(false),
            analyses: AtomicU64::new(0),
        });

        let discovered = monitor.registry.scan_subtree(monitor.document.root());
        tracing::debug!(surfaces = discovered, host = monitor.document.host(), "Initial surface scan");

        if config
            .social_hosts
            .iter()
            .any(|h| monitor.document.host().contains(h.as_str()))
        {
            monitor.enhanced.store(true, Ordering::Release);
            signals.emit(ContextSignal::EnhancedMonitoringEnabled {
                context: "social_media".to_string(),
            });
        }

        let handle = tokio::spawn(Arc::clone(&monitor).run(events, analyses_rx));
        (monitor, handle)
    }

    /// The alert scheduler, for dismissing alerts and inspecting state.
    pub fn scheduler(&self) -> &Arc<AlertScheduler> {
        &self.scheduler
    }

    /// The surface registry.
    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    /// The cached settings view.
    pub fn settings(&self) -> &Arc<SettingsHandle> {
        &self.settings
    }

    /// The outbound context signal hub.
    pub fn signals(&self) -> SignalHub {
        self.signals.clone()
    }

    /// Number of classification passes run so far.
    pub fn analyses_run(&self) -> u64 {
        self.analyses.load(Ordering::Acquire)
    }

    /// Whether enhanced monitoring is active.
    pub fn enhanced_monitoring(&self) -> bool {
        self.enhanced.load(Ordering::Acquire)
    }

    /// Classify every text-bearing field of a form before it submits.
    ///
    /// Returns true when submission may proceed. A blocked form raises
    /// a form-submission alert; the host must re-attempt only on the
    /// continue-allowed signal, never automatically.
    pub async fn check_submission(&self, form: &Arc<Element>) -> bool {
        if !self.monitoring_allowed().await {
            return true;
        }
        let settings = self.settings.current().await;
        for el in collect_subtree(form) {
            if match_surface(&el).is_none() {
                continue;
            }
            let value = el.text();
            if value.is_empty() {
                continue;
            }
            let result = self.classifier.classify(&value, &settings);
            if !result.findings.is_empty() {
                tracing::debug!(form = %form.id(), "Blocking form submission with sensitive fields");
                self.scheduler
                    .request(AlertRequest::form_submission(result, form.id()))
                    .await;
                return false;
            }
        }
        true
    }

    async fn run(
        self: Arc<Self>,
        mut events: mpsc::UnboundedReceiver<PageEvent>,
        mut analyses: mpsc::UnboundedReceiver<AnalysisRequest>,
    ) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_page_event(event).await,
                    None => break,
                },
                request = analyses.recv() => match request {
                    Some(request) => self.run_analysis(request).await,
                    None => break,
                },
            }
        }
        tracing::debug!("Page event stream closed, monitor stopping");
    }

    async fn handle_page_event(&self, event: PageEvent) {
        match event {
            PageEvent::Mutation(batch) => self.registry.on_document_mutated(&batch),
            PageEvent::Input { node } => self.schedule_analysis(node, false),
            PageEvent::KeyUp { node } => self.schedule_analysis(node, true),
            PageEvent::Paste { node } => {
                if self.registry.surface(node).is_some() {
                    self.sequencer.schedule_settle(node);
                }
            }
            PageEvent::FilesSelected { node, files } => {
                if self.monitoring_allowed().await {
                    self.uploads.on_files(Some(node), &files).await;
                }
            }
            PageEvent::FilesDropped { files } => {
                if self.monitoring_allowed().await {
                    self.uploads.on_files(None, &files).await;
                }
            }
            PageEvent::SubmitAttempt { form } => {
                if let Some(form) = self.document.get(form) {
                    let _ = self.check_submission(&form).await;
                }
            }
        }
    }

    fn schedule_analysis(&self, node: NodeId, keyup: bool) {
        let Some(surface) = self.registry.surface(node) else {
            return;
        };
        // Plain inputs are covered by their input events; keyup matters
        // only for editable regions and composers.
        if keyup && surface.kind() == SurfaceKind::PlainInput {
            return;
        }
        let Some(el) = surface.upgrade() else {
            return;
        };
        self.sequencer
            .schedule(node, el.text(), surface.kind().quiet_period());
    }

    async fn run_analysis(&self, request: AnalysisRequest) {
        // A surface removed before its timer fired is never reported on.
        let Some(surface) = self.registry.surface(request.surface) else {
            return;
        };
        let Some(el) = surface.upgrade() else {
            return;
        };
        let text = match request.text {
            Some(text) => text,
            None => el.text(),
        };
        if text.chars().count() < surface.kind().min_text_len() {
            return;
        }
        if surface.already_analyzed(&text) {
            return;
        }
        if !self.monitoring_allowed().await {
            return;
        }

        let settings = self.settings.current().await;
        let result = self.classifier.classify(&text, &settings);
        surface.mark_analyzed(text);
        self.analyses.fetch_add(1, Ordering::AcqRel);
        if self.enhanced_monitoring() {
            tracing::debug!(surface = %surface.id(), "Analyzed under enhanced monitoring");
        }

        match surface.kind() {
            SurfaceKind::Composer => {
                if !result.is_clean() {
                    self.scheduler
                        .request(AlertRequest::social_media_post(result, surface.id()))
                        .await;
                }
            }
            SurfaceKind::PlainInput | SurfaceKind::Editable => {
                if !result.findings.is_empty() {
                    self.scheduler
                        .request(AlertRequest::sensitive_data(result, surface.id()))
                        .await;
                }
            }
        }
    }

    async fn monitoring_allowed(&self) -> bool {
        let settings = self.settings.current().await;
        settings.enabled && !settings.is_whitelisted(self.document.host())
    }
}
