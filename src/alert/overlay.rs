//! Alert overlay model and rendering seam
//!
//! The scheduler emits one overlay into the page per active alert. The
//! overlay carries a fixed element id, so rendering while one is
//! already visible replaces it, so a second call can never create a
//! duplicate, and removal is always complete.

use super::{AlertKind, AlertRequest};
use crate::error::{Error, Result};
use crate::rules::{category_label, Severity};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Element id of the injected overlay; unique per page.
pub const OVERLAY_ELEMENT_ID: &str = "safepost-alert";

/// The rendered representation of an active alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overlay {
    /// Fixed element id (see [`OVERLAY_ELEMENT_ID`])
    pub element_id: String,
    /// Overlay title
    pub title: String,
    /// Icon for the alert kind
    pub icon: String,
    /// Display class derived from the worst finding's severity
    pub severity_class: String,
    /// Headline
    pub message: String,
    /// Actionable suggestion
    pub suggestion: String,
    /// Detail lines (detected categories, or file name/size)
    pub details: Vec<String>,
}

impl Overlay {
    /// Build the overlay for an alert request.
    pub fn from_request(request: &AlertRequest) -> Self {
        let mut details = Vec::new();
        if let Some(result) = &request.result {
            for finding in &result.findings {
                details.push(format!("{} detected", category_label(&finding.category)));
            }
            for finding in &result.oversharing {
                details.push(format!("Oversharing: {}", finding.category));
            }
        }
        if let Some(file) = &request.file {
            details.push(format!("File: {}", file.name));
            details.push(format!("Size: {}", format_file_size(file.size)));
        }

        Self {
            element_id: OVERLAY_ELEMENT_ID.to_string(),
            title: "Privacy Alert".to_string(),
            icon: kind_icon(request.kind).to_string(),
            severity_class: severity_class(request.max_severity()).to_string(),
            message: request.message.clone(),
            suggestion: request.suggestion.clone(),
            details,
        }
    }
}

fn kind_icon(kind: AlertKind) -> &'static str {
    match kind {
        AlertKind::SensitiveData => "🛡️",
        AlertKind::SocialMediaPost => "📱",
        AlertKind::PhotoUpload => "📸",
        AlertKind::FormSubmission => "📋",
    }
}

/// Map the worst severity to the overlay display class. Severity styles
/// the overlay only; it never affects scheduling.
pub fn severity_class(severity: Option<Severity>) -> &'static str {
    match severity {
        Some(Severity::Critical) => "severity-critical",
        Some(Severity::High) => "severity-high",
        Some(Severity::Medium) => "severity-medium",
        Some(Severity::Low) => "severity-low",
        // Alerts without findings (photo uploads) render at medium urgency.
        None => "severity-medium",
    }
}

/// Human-readable file size, matching the host page's formatting.
pub fn format_file_size(bytes: u64) -> String {
    const SIZES: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let exponent = ((bytes as f64).ln() / 1024_f64.ln()).floor() as usize;
    let exponent = exponent.min(SIZES.len() - 1);
    let value = bytes as f64 / 1024_f64.powi(exponent as i32);
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, SIZES[exponent])
}

/// The page-side rendering surface the scheduler draws on.
pub trait OverlayHost: Send + Sync {
    /// Inject the overlay, replacing any overlay already visible.
    fn render(&self, overlay: Overlay) -> Result<()>;

    /// Remove the visible overlay, if any. Removal is complete: no
    /// leaked overlay nodes remain, even under rapid cycles.
    fn clear(&self);
}

/// In-memory overlay host for single-process use and tests.
///
/// Records every render and tracks the single visible overlay.
#[derive(Default)]
pub struct MemoryOverlayHost {
    visible: Mutex<Option<Overlay>>,
    history: Mutex<Vec<Overlay>>,
    unavailable: AtomicBool,
}

impl MemoryOverlayHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// The overlay currently visible, if any.
    pub fn visible(&self) -> Option<Overlay> {
        self.visible
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every overlay rendered so far, in order.
    pub fn history(&self) -> Vec<Overlay> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Simulate a page with no attachable root: renders fail until
    /// cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Release);
    }
}

impl OverlayHost for MemoryOverlayHost {
    fn render(&self, overlay: Overlay) -> Result<()> {
        if self.unavailable.load(Ordering::Acquire) {
            return Err(Error::Render("no attachable overlay root".to_string()));
        }
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(overlay.clone());
        // Same element id: a render replaces, never duplicates.
        *self.visible.lock().unwrap_or_else(PoisonError::into_inner) = Some(overlay);
        Ok(())
    }

    fn clear(&self) {
        *self.visible.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::dom::{Document, FileMeta};
    use crate::settings::Settings;

    fn phone_request() -> AlertRequest {
        let (doc, _rx) = Document::new("example.com");
        let el = doc.create_element("input");
        doc.append(doc.root(), &el);
        let result =
            Classifier::with_defaults().classify("call me at 555-123-4567", &Settings::default());
        AlertRequest::sensitive_data(result, el.id())
    }

    #[test]
    fn test_overlay_from_phone_request() {
        let overlay = Overlay::from_request(&phone_request());
        assert_eq!(overlay.element_id, OVERLAY_ELEMENT_ID);
        assert_eq!(overlay.title, "Privacy Alert");
        assert_eq!(overlay.severity_class, "severity-high");
        assert_eq!(overlay.message, "Think twice before sharing this information!");
        assert!(overlay.details.iter().any(|d| d.contains("Phone Number")));
    }

    #[test]
    fn test_photo_overlay_details() {
        let request = AlertRequest::photo_upload(
            FileMeta::new("holiday.png", 2_621_440, "image/png"),
            None,
        );
        let overlay = Overlay::from_request(&request);
        assert_eq!(overlay.severity_class, "severity-medium");
        assert!(overlay.details.contains(&"File: holiday.png".to_string()));
        assert!(overlay.details.contains(&"Size: 2.5 MB".to_string()));
    }

    #[test]
    fn test_severity_classes() {
        assert_eq!(severity_class(Some(Severity::Critical)), "severity-critical");
        assert_eq!(severity_class(Some(Severity::Low)), "severity-low");
        assert_eq!(severity_class(None), "severity-medium");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(2048), "2 KB");
        assert_eq!(format_file_size(2_621_440), "2.5 MB");
    }

    #[test]
    fn test_memory_host_replaces_never_duplicates() {
        let host = MemoryOverlayHost::new();
        host.render(Overlay::from_request(&phone_request())).unwrap();
        host.render(Overlay::from_request(&phone_request())).unwrap();

        assert!(host.visible().is_some());
        assert_eq!(host.history().len(), 2);
        host.clear();
        assert!(host.visible().is_none());
    }

    #[test]
    fn test_unavailable_host_fails_render() {
        let host = MemoryOverlayHost::new();
        host.set_unavailable(true);
        let err = host.render(Overlay::from_request(&phone_request()));
        assert!(err.is_err());
        assert!(host.visible().is_none());
    }
}
