//! Alert types, overlay rendering seam, and the alert scheduler
//!
//! At most one alert overlay is visible system-wide at any instant.
//! Requests beyond the active one queue FIFO and are drained one at a
//! time, separated by a cooldown.

mod overlay;
mod scheduler;

pub use overlay::{
    format_file_size, MemoryOverlayHost, Overlay, OverlayHost, OVERLAY_ELEMENT_ID,
};
pub use scheduler::{AlertScheduler, SchedulerConfig, SchedulerPhase};

use crate::classifier::ClassificationResult;
use crate::dom::{FileMeta, NodeId};
use crate::rules::{category_suggestion, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of user action an alert interrupts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    SensitiveData,
    SocialMediaPost,
    PhotoUpload,
    FormSubmission,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SensitiveData => "sensitive_data",
            Self::SocialMediaPost => "social_media_post",
            Self::PhotoUpload => "photo_upload",
            Self::FormSubmission => "form_submission",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an active alert was dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertOutcome {
    /// User acknowledged the warning (dismiss only)
    Acknowledged,
    /// User chose to edit: the originating surface regains focus
    EditRequested,
    /// User explicitly allowed the blocked action to proceed
    ContinueAllowed,
    /// The auto-dismiss timer elapsed
    Expired,
}

/// A transient request for one alert. Either displayed immediately or
/// queued; never persisted.
#[derive(Debug, Clone)]
pub struct AlertRequest {
    /// Request identifier (alr-<uuid>)
    pub id: String,
    /// Kind of interrupted action
    pub kind: AlertKind,
    /// Classification that triggered the alert, when text was involved
    pub result: Option<ClassificationResult>,
    /// Surface the alert originated from, when known
    pub source: Option<NodeId>,
    /// File metadata for upload alerts
    pub file: Option<FileMeta>,
    /// Headline shown to the user
    pub message: String,
    /// Actionable suggestion shown below the headline
    pub suggestion: String,
    /// When the request was created
    pub created_at: DateTime<Utc>,
}

impl AlertRequest {
    fn new(kind: AlertKind, message: &str, suggestion: &str) -> Self {
        Self {
            id: format!("alr-{}", uuid::Uuid::new_v4()),
            kind,
            result: None,
            source: None,
            file: None,
            message: message.to_string(),
            suggestion: suggestion.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Alert for sensitive data typed into a plain input or editable
    /// region.
    pub fn sensitive_data(result: ClassificationResult, source: NodeId) -> Self {
        let suggestion = result
            .findings
            .first()
            .map(|f| category_suggestion(&f.category))
            .unwrap_or("Be cautious about sharing personal information online.");
        let mut request = Self::new(
            AlertKind::SensitiveData,
            "Think twice before sharing this information!",
            suggestion,
        );
        request.result = Some(result);
        request.source = Some(source);
        request
    }

    /// Alert for a risky social/post composer draft.
    pub fn social_media_post(result: ClassificationResult, source: NodeId) -> Self {
        let mut request = Self::new(
            AlertKind::SocialMediaPost,
            "Your post might reveal too much personal information.",
            "Consider removing specific details and keeping your post more general.",
        );
        request.result = Some(result);
        request.source = Some(source);
        request
    }

    /// Alert for an image about to be uploaded. File content is never
    /// inspected; only declared metadata travels with the request.
    pub fn photo_upload(file: FileMeta, source: Option<NodeId>) -> Self {
        let mut request = Self::new(
            AlertKind::PhotoUpload,
            "You're about to share a photo.",
            "Make sure it doesn't contain personal information like documents, addresses, or private spaces.",
        );
        request.file = Some(file);
        request.source = source;
        request
    }

    /// Alert blocking a form submission that carries sensitive data.
    pub fn form_submission(result: ClassificationResult, form: NodeId) -> Self {
        let mut request = Self::new(
            AlertKind::FormSubmission,
            "Hold on! This form contains sensitive information.",
            "Double-check that you trust this website before submitting personal data.",
        );
        request.result = Some(result);
        request.source = Some(form);
        request
    }

    /// Worst severity among the request's findings.
    pub fn max_severity(&self) -> Option<Severity> {
        self.result.as_ref().and_then(|r| r.max_severity)
    }

    /// Number of findings covered by this alert.
    pub fn finding_count(&self) -> usize {
        self.result.as_ref().map_or(0, |r| r.finding_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::settings::Settings;

    fn some_node() -> NodeId {
        let (doc, _rx) = crate::dom::Document::new("example.com");
        let el = doc.create_element("input");
        doc.append(doc.root(), &el);
        el.id()
    }

    #[test]
    fn test_sensitive_data_request_carries_category_suggestion() {
        let result =
            Classifier::with_defaults().classify("call me at 555-123-4567", &Settings::default());
        let request = AlertRequest::sensitive_data(result, some_node());
        assert!(request.id.starts_with("alr-"));
        assert_eq!(request.kind, AlertKind::SensitiveData);
        assert_eq!(request.message, "Think twice before sharing this information!");
        assert!(request.suggestion.contains("phone number"));
        assert_eq!(request.max_severity(), Some(Severity::High));
    }

    #[test]
    fn test_photo_upload_request_has_no_result() {
        let request =
            AlertRequest::photo_upload(FileMeta::new("pic.png", 2048, "image/png"), None);
        assert_eq!(request.kind, AlertKind::PhotoUpload);
        assert!(request.result.is_none());
        assert_eq!(request.finding_count(), 0);
        assert_eq!(request.max_severity(), None);
    }

    #[test]
    fn test_alert_kind_serialization() {
        let json = serde_json::to_string(&AlertKind::SocialMediaPost).unwrap();
        assert_eq!(json, "\"social_media_post\"");
        let parsed: AlertKind = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, AlertKind::SocialMediaPost);
    }
}
