//! Surface discovery and tracking
//!
//! Maintains the live set of text-bearing elements across a mutating
//! document without double-registering and without holding elements
//! alive after removal. Surfaces are keyed by element identity and hold
//! only weak references; detached elements are reconciled lazily on the
//! next mutation pass, cancelling any pending debounce timer.

use crate::dom::{collect_subtree, Element, MutationBatch, NodeId};
use crate::sequencer::DebounceSequencer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;

/// The kind of text surface an element presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    /// Plain text input or textarea
    PlainInput,
    /// Editable region (contenteditable)
    Editable,
    /// Recognized social/post composer
    Composer,
}

impl SurfaceKind {
    /// Quiet period before a burst on this surface is analyzed.
    pub fn quiet_period(&self) -> Duration {
        match self {
            Self::PlainInput | Self::Editable => Duration::from_millis(300),
            Self::Composer => Duration::from_millis(500),
        }
    }

    /// Minimum text length worth classifying; shorter snapshots are
    /// fast-rejected.
    pub fn min_text_len(&self) -> usize {
        match self {
            Self::PlainInput | Self::Editable => 3,
            Self::Composer => 10,
        }
    }
}

/// Decide whether an element is a trackable text surface.
///
/// Composer recognition is attribute-driven (post boxes, comment and
/// caption fields); plain inputs and editable regions are recognized
/// structurally.
pub fn match_surface(el: &Element) -> Option<SurfaceKind> {
    if has_composer_hint(el) {
        return Some(SurfaceKind::Composer);
    }
    match el.tag() {
        "input" => match el.attribute("type").as_deref() {
            None | Some("text") | Some("email") | Some("tel") => Some(SurfaceKind::PlainInput),
            _ => None,
        },
        "textarea" => Some(SurfaceKind::PlainInput),
        _ if is_editable(el) => Some(SurfaceKind::Editable),
        _ => None,
    }
}

fn is_editable(el: &Element) -> bool {
    el.attribute("contenteditable").as_deref() == Some("true")
}

fn has_composer_hint(el: &Element) -> bool {
    if let Some(testid) = el.attribute("data-testid") {
        if matches!(
            testid.as_str(),
            "tweetTextarea_0" | "caption-input" | "media-upload-caption"
        ) {
            return true;
        }
    }
    if let Some(label) = el.attribute("aria-label") {
        if label.contains("Add a comment") || label.contains("Write a caption") {
            return true;
        }
    }
    if let Some(placeholder) = el.attribute("placeholder") {
        if placeholder.contains("What's on your mind") {
            return true;
        }
    }
    is_editable(el) && el.attribute("role").as_deref() == Some("textbox")
}

/// A tracked text surface.
///
/// Never owns its element: the document does. The debounce timer for a
/// surface lives in the sequencer, keyed by this surface's id.
pub struct Surface {
    id: NodeId,
    element: Weak<Element>,
    kind: SurfaceKind,
    last_analyzed: Mutex<Option<String>>,
}

impl Surface {
    fn new(el: &Arc<Element>, kind: SurfaceKind) -> Arc<Self> {
        Arc::new(Self {
            id: el.id(),
            element: Arc::downgrade(el),
            kind,
            last_analyzed: Mutex::new(None),
        })
    }

    /// Surface identity (element identity).
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Surface kind.
    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    /// The element, if it is still alive and attached.
    pub fn upgrade(&self) -> Option<Arc<Element>> {
        self.element.upgrade().filter(|el| el.is_attached())
    }

    /// Whether this exact text was already analyzed on this surface.
    pub fn already_analyzed(&self, text: &str) -> bool {
        self.last_analyzed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_deref()
            == Some(text)
    }

    /// Remember the snapshot that was just analyzed.
    pub fn mark_analyzed(&self, text: String) {
        *self
            .last_analyzed
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(text);
    }

    fn last_analyzed_snapshot(&self) -> Option<String> {
        self.last_analyzed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Registry of all tracked surfaces in a document.
pub struct SurfaceRegistry {
    surfaces: RwLock<HashMap<NodeId, Arc<Surface>>>,
    sequencer: Arc<DebounceSequencer>,
}

impl SurfaceRegistry {
    /// Create a registry that cancels debounce timers on the given
    /// sequencer when surfaces disappear.
    pub fn new(sequencer: Arc<DebounceSequencer>) -> Self {
        Self {
            surfaces: RwLock::new(HashMap::new()),
            sequencer,
        }
    }

    /// Find and register every matching surface in a subtree.
    ///
    /// Idempotent per element: re-scanning an already-registered
    /// element is a no-op. Returns the number of newly registered
    /// surfaces; finding none is not an error.
    pub fn scan_subtree(&self, root: &Arc<Element>) -> usize {
        let mut registered = 0;
        for el in collect_subtree(root) {
            if !el.is_attached() {
                continue;
            }
            if let Some(kind) = match_surface(&el) {
                if self.register(&el, kind) {
                    registered += 1;
                }
            }
        }
        registered
    }

    /// Apply a batch of document mutations.
    ///
    /// Added subtrees are scanned; attribute changes re-evaluate the
    /// element in place; detached surfaces are pruned and their pending
    /// debounce timers cancelled.
    pub fn on_document_mutated(&self, batch: &MutationBatch) {
        for root in &batch.added {
            self.scan_subtree(root);
        }
        for el in &batch.attributes_changed {
            self.rescan(el);
        }
        self.prune_detached();
    }

    /// Look up a tracked surface by id.
    pub fn surface(&self, id: NodeId) -> Option<Arc<Surface>> {
        self.surfaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Number of tracked surfaces.
    pub fn len(&self) -> usize {
        self.surfaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn register(&self, el: &Arc<Element>, kind: SurfaceKind) -> bool {
        let mut surfaces = self
            .surfaces
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match surfaces.get(&el.id()).cloned() {
            Some(existing) if existing.kind() == kind => false,
            Some(existing) => {
                // Kind changed under us (attribute rescan): replace the
                // entry, keep the analysis memory, drop the stale timer.
                let replacement = Surface::new(el, kind);
                if let Some(prev) = existing.last_analyzed_snapshot() {
                    replacement.mark_analyzed(prev);
                }
                surfaces.insert(el.id(), replacement);
                drop(surfaces);
                self.sequencer.cancel(el.id());
                false
            }
            None => {
                surfaces.insert(el.id(), Surface::new(el, kind));
                true
            }
        }
    }

    fn rescan(&self, el: &Arc<Element>) {
        if !el.is_attached() {
            return;
        }
        match match_surface(el) {
            Some(kind) => {
                self.register(el, kind);
            }
            None => self.deregister(el.id()),
        }
    }

    fn deregister(&self, id: NodeId) {
        let removed = self
            .surfaces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if removed.is_some() {
            self.sequencer.cancel(id);
        }
    }

    fn prune_detached(&self) {
        let stale: Vec<NodeId> = {
            let surfaces = self
                .surfaces
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            surfaces
                .values()
                .filter(|s| s.upgrade().is_none())
                .map(|s| s.id())
                .collect()
        };
        for id in stale {
            self.deregister(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn registry() -> SurfaceRegistry {
        let (sequencer, _rx) = DebounceSequencer::new();
        SurfaceRegistry::new(Arc::new(sequencer))
    }

    #[tokio::test]
    async fn test_scan_registers_each_surface_once() {
        let (doc, _rx) = Document::new("example.com");
        let input = doc.create_element_with("input", &[("type", "text")]);
        let textarea = doc.create_element("textarea");
        let editable = doc.create_element_with("div", &[("contenteditable", "true")]);
        let button = doc.create_element("button");
        for el in [&input, &textarea, &editable, &button] {
            doc.append(doc.root(), el);
        }

        let reg = registry();
        assert_eq!(reg.scan_subtree(doc.root()), 3);
        // Second scan of the same subtree registers nothing new.
        assert_eq!(reg.scan_subtree(doc.root()), 0);
        assert_eq!(reg.len(), 3);
    }

    #[tokio::test]
    async fn test_non_text_inputs_ignored() {
        let (doc, _rx) = Document::new("example.com");
        let file = doc.create_element_with("input", &[("type", "file")]);
        let checkbox = doc.create_element_with("input", &[("type", "checkbox")]);
        doc.append(doc.root(), &file);
        doc.append(doc.root(), &checkbox);

        let reg = registry();
        assert_eq!(reg.scan_subtree(doc.root()), 0);
        assert!(reg.is_empty());
    }

    #[tokio::test]
    async fn test_composer_recognized_by_attributes() {
        let (doc, _rx) = Document::new("instagram.com");
        let comment = doc.create_element_with(
            "div",
            &[("contenteditable", "true"), ("aria-label", "Add a comment…")],
        );
        let caption = doc.create_element_with("textarea", &[("data-testid", "caption-input")]);
        let dm = doc.create_element_with(
            "div",
            &[("contenteditable", "true"), ("role", "textbox")],
        );
        for el in [&comment, &caption, &dm] {
            doc.append(doc.root(), el);
        }

        let reg = registry();
        reg.scan_subtree(doc.root());
        for el in [&comment, &caption, &dm] {
            assert_eq!(
                reg.surface(el.id()).unwrap().kind(),
                SurfaceKind::Composer
            );
        }
    }

    #[tokio::test]
    async fn test_mutation_scans_added_nodes() {
        let (doc, mut rx) = Document::new("example.com");
        let reg = registry();
        reg.scan_subtree(doc.root());
        assert!(reg.is_empty());

        let wrapper = doc.create_element("div");
        let input = doc.create_element("textarea");
        doc.append(&wrapper, &input);
        doc.append(doc.root(), &wrapper);

        if let Some(crate::dom::PageEvent::Mutation(batch)) = rx.recv().await {
            reg.on_document_mutated(&batch);
        }
        assert_eq!(reg.len(), 1);
        assert!(reg.surface(input.id()).is_some());
    }

    #[tokio::test]
    async fn test_attribute_change_promotes_to_composer() {
        let (doc, mut rx) = Document::new("instagram.com");
        let div = doc.create_element_with("div", &[("contenteditable", "true")]);
        doc.append(doc.root(), &div);

        let reg = registry();
        reg.scan_subtree(doc.root());
        assert_eq!(reg.surface(div.id()).unwrap().kind(), SurfaceKind::Editable);
        let _ = rx.recv().await;

        doc.set_attribute(&div, "aria-label", "Write a caption for your post");
        if let Some(crate::dom::PageEvent::Mutation(batch)) = rx.recv().await {
            reg.on_document_mutated(&batch);
        }
        assert_eq!(reg.surface(div.id()).unwrap().kind(), SurfaceKind::Composer);
        // Analysis memory survives the promotion.
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_surface_pruned_and_timer_cancelled() {
        let (doc, mut rx) = Document::new("example.com");
        let input = doc.create_element("input");
        doc.append(doc.root(), &input);

        let (sequencer, mut analyses) = DebounceSequencer::new();
        let sequencer = Arc::new(sequencer);
        let reg = SurfaceRegistry::new(Arc::clone(&sequencer));
        reg.scan_subtree(doc.root());
        let _ = rx.recv().await;

        sequencer.schedule(
            input.id(),
            "pending".to_string(),
            Duration::from_millis(300),
        );

        doc.remove(&input);
        if let Some(crate::dom::PageEvent::Mutation(batch)) = rx.recv().await {
            reg.on_document_mutated(&batch);
        }

        assert!(reg.surface(input.id()).is_none());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(analyses.try_recv().is_err(), "cancelled timer must not fire");
    }

    #[tokio::test]
    async fn test_surface_upgrade_fails_after_detach() {
        let (doc, _rx) = Document::new("example.com");
        let input = doc.create_element("input");
        doc.append(doc.root(), &input);

        let reg = registry();
        reg.scan_subtree(doc.root());
        let surface = reg.surface(input.id()).unwrap();
        assert!(surface.upgrade().is_some());

        doc.remove(&input);
        assert!(surface.upgrade().is_none());
    }

    #[tokio::test]
    async fn test_already_analyzed_tracking() {
        let (doc, _rx) = Document::new("example.com");
        let input = doc.create_element("input");
        doc.append(doc.root(), &input);

        let reg = registry();
        reg.scan_subtree(doc.root());
        let surface = reg.surface(input.id()).unwrap();

        assert!(!surface.already_analyzed("hello"));
        surface.mark_analyzed("hello".to_string());
        assert!(surface.already_analyzed("hello"));
        assert!(!surface.already_analyzed("hello!"));
    }
}
