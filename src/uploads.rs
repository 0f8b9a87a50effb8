//! File upload watching
//!
//! A simpler sibling of the text path: file-input changes and drag-drop
//! file drops are inspected by declared type only. Image files raise a
//! photo-upload alert through the same scheduler, under the same
//! queueing and cooldown discipline. File content is never read.

use crate::alert::{AlertRequest, AlertScheduler};
use crate::dom::{FileMeta, NodeId};
use std::sync::Arc;

/// Watches file selections and feeds the alert scheduler.
pub struct FileUploadWatcher {
    scheduler: Arc<AlertScheduler>,
}

impl FileUploadWatcher {
    /// Create a watcher feeding the given scheduler.
    pub fn new(scheduler: Arc<AlertScheduler>) -> Self {
        Self { scheduler }
    }

    /// Handle a file selection or drop.
    ///
    /// One alert request per image file; other types pass silently.
    pub async fn on_files(&self, source: Option<NodeId>, files: &[FileMeta]) {
        for file in files {
            if !file.is_image() {
                continue;
            }
            tracing::debug!(file = %file.name, size = file.size, "Image selected for upload");
            self.scheduler
                .request(AlertRequest::photo_upload(file.clone(), source))
                .await;
        }
    }
}
