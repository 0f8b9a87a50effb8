//! In-process page model
//!
//! Rust has no browser DOM, so the pipeline observes an arena of
//! reference-counted elements that mirrors the host page. The embedder
//! mutates the arena through [`Document`] and every mutation or user
//! interaction is pushed into an event channel the monitor consumes.
//!
//! Ownership follows the document, never the observers: trackers hold
//! [`std::sync::Weak`] references, and a removed subtree is reconciled
//! lazily on the next mutation pass.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tokio::sync::mpsc;

/// Stable identifier of an element in the page arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Declared metadata of a selected or dropped file.
///
/// File content is never read; only the declared name, size, and MIME
/// type travel through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    /// File name as reported by the host
    pub name: String,
    /// Declared size in bytes
    pub size: u64,
    /// Declared MIME type (e.g. "image/png")
    pub mime: String,
}

impl FileMeta {
    /// Create file metadata.
    pub fn new(name: impl Into<String>, size: u64, mime: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            mime: mime.into(),
        }
    }

    /// Whether the declared type indicates an image.
    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

/// One element in the page arena.
///
/// Interior mutability uses short-lived sync locks; none is ever held
/// across an await point. Lock poisoning is recovered, not propagated.
pub struct Element {
    id: NodeId,
    tag: String,
    attributes: RwLock<HashMap<String, String>>,
    text: RwLock<String>,
    children: RwLock<Vec<Arc<Element>>>,
    parent: RwLock<Weak<Element>>,
    attached: AtomicBool,
}

impl Element {
    fn new(id: NodeId, tag: &str) -> Arc<Self> {
        Arc::new(Self {
            id,
            tag: tag.to_ascii_lowercase(),
            attributes: RwLock::new(HashMap::new()),
            text: RwLock::new(String::new()),
            children: RwLock::new(Vec::new()),
            parent: RwLock::new(Weak::new()),
            attached: AtomicBool::new(false),
        })
    }

    /// Stable identifier of this element.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Lowercased tag name ("input", "textarea", "div", ...).
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Look up an attribute value.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.attributes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Current text value of the element.
    pub fn text(&self) -> String {
        self.text
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether the element is still part of the document.
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    /// Snapshot of the element's direct children.
    pub fn children(&self) -> Vec<Arc<Element>> {
        self.children
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_text(&self, value: &str) {
        *self.text.write().unwrap_or_else(PoisonError::into_inner) = value.to_string();
    }

    fn set_attribute(&self, name: &str, value: &str) {
        self.attributes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value.to_string());
    }

    /// Clear the attached flag on this element and its whole subtree.
    fn detach_subtree(self: &Arc<Self>) {
        self.attached.store(false, Ordering::Release);
        for child in self.children() {
            child.detach_subtree();
        }
    }

    fn attach_subtree(self: &Arc<Self>) {
        self.attached.store(true, Ordering::Release);
        for child in self.children() {
            child.attach_subtree();
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("id", &self.id)
            .field("tag", &self.tag)
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Collect an element and all its descendants, depth-first.
pub fn collect_subtree(root: &Arc<Element>) -> Vec<Arc<Element>> {
    let mut out = Vec::new();
    let mut stack = vec![Arc::clone(root)];
    while let Some(el) = stack.pop() {
        stack.extend(el.children());
        out.push(el);
    }
    out
}

/// A batch of structural/attribute changes to the document.
#[derive(Debug, Clone, Default)]
pub struct MutationBatch {
    /// Subtree roots newly inserted into the document
    pub added: Vec<Arc<Element>>,
    /// Subtree roots removed from the document
    pub removed: Vec<NodeId>,
    /// Elements whose attributes changed in place
    pub attributes_changed: Vec<Arc<Element>>,
}

impl MutationBatch {
    /// Batch describing a single inserted subtree.
    pub fn added(root: Arc<Element>) -> Self {
        Self {
            added: vec![root],
            ..Self::default()
        }
    }

    /// Batch describing a single removed subtree.
    pub fn removed(root: NodeId) -> Self {
        Self {
            removed: vec![root],
            ..Self::default()
        }
    }

    /// Batch describing a single in-place attribute change.
    pub fn attributes_changed(el: Arc<Element>) -> Self {
        Self {
            attributes_changed: vec![el],
            ..Self::default()
        }
    }
}

/// An event observed on the page, in document order.
#[derive(Debug, Clone)]
pub enum PageEvent {
    /// The document subtree changed
    Mutation(MutationBatch),
    /// Direct typed input updated an element's value
    Input { node: NodeId },
    /// Key released inside an editable region
    KeyUp { node: NodeId },
    /// Clipboard paste into an element (value settles shortly after)
    Paste { node: NodeId },
    /// Files chosen through a file input
    FilesSelected { node: NodeId, files: Vec<FileMeta> },
    /// Files dropped onto the page
    FilesDropped { files: Vec<FileMeta> },
    /// A form submission was attempted
    SubmitAttempt { form: NodeId },
}

/// The observed document: arena root, id allocator, and event emitter.
///
/// All mutations go through this type so observers see a consistent
/// event stream. Dropping the event receiver silently disables
/// observation; mutations still apply.
pub struct Document {
    root: Arc<Element>,
    host: String,
    next_id: AtomicU64,
    index: RwLock<HashMap<NodeId, Weak<Element>>>,
    events: mpsc::UnboundedSender<PageEvent>,
}

impl Document {
    /// Create a document for the given host domain, returning the
    /// document and the page-event stream.
    pub fn new(host: impl Into<String>) -> (Arc<Self>, mpsc::UnboundedReceiver<PageEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let root = Element::new(NodeId(0), "body");
        root.attached.store(true, Ordering::Release);
        let doc = Arc::new(Self {
            root: Arc::clone(&root),
            host: host.into(),
            next_id: AtomicU64::new(1),
            index: RwLock::new(HashMap::new()),
            events: tx,
        });
        doc.index_element(&root);
        (doc, rx)
    }

    /// Root element of the document.
    pub fn root(&self) -> &Arc<Element> {
        &self.root
    }

    /// Host domain this document belongs to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Look up a live element by id.
    pub fn get(&self, id: NodeId) -> Option<Arc<Element>> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .and_then(Weak::upgrade)
    }

    /// Create a detached element. It joins the document via [`Self::append`].
    pub fn create_element(&self, tag: &str) -> Arc<Element> {
        let id = NodeId(self.next_id.fetch_add(1, Ordering::Relaxed));
        Element::new(id, tag)
    }

    /// Create a detached element with initial attributes.
    pub fn create_element_with(&self, tag: &str, attrs: &[(&str, &str)]) -> Arc<Element> {
        let el = self.create_element(tag);
        for (name, value) in attrs {
            el.set_attribute(name, value);
        }
        el
    }

    /// Insert a subtree under `parent`.
    ///
    /// A mutation is reported only when the subtree actually joins the
    /// document; edits inside a detached subtree are not observable.
    pub fn append(&self, parent: &Arc<Element>, child: &Arc<Element>) {
        parent
            .children
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(child));
        *child
            .parent
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::downgrade(parent);
        for el in collect_subtree(child) {
            self.index_element(&el);
        }
        if parent.is_attached() {
            child.attach_subtree();
            self.emit(PageEvent::Mutation(MutationBatch::added(Arc::clone(child))));
        }
    }

    /// Remove a subtree from the document and report the mutation.
    ///
    /// The subtree is detached immediately; observers reconcile their
    /// own bookkeeping lazily from the mutation event.
    pub fn remove(&self, node: &Arc<Element>) {
        let was_attached = node.is_attached();
        if let Some(parent) = node
            .parent
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .upgrade()
        {
            parent
                .children
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|c| c.id() != node.id());
        }
        node.detach_subtree();
        let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);
        for el in collect_subtree(node) {
            index.remove(&el.id());
        }
        drop(index);
        if was_attached {
            self.emit(PageEvent::Mutation(MutationBatch::removed(node.id())));
        }
    }

    /// Change an attribute in place and report the mutation.
    pub fn set_attribute(&self, node: &Arc<Element>, name: &str, value: &str) {
        node.set_attribute(name, value);
        if node.is_attached() {
            self.emit(PageEvent::Mutation(MutationBatch::attributes_changed(
                Arc::clone(node),
            )));
        }
    }

    /// Update an element's value without an input event (programmatic set).
    pub fn set_text(&self, node: &Arc<Element>, text: &str) {
        node.set_text(text);
    }

    /// Typed input: update the value and report an input event.
    pub fn input(&self, node: &Arc<Element>, text: &str) {
        node.set_text(text);
        self.emit(PageEvent::Input { node: node.id() });
    }

    /// Key released inside an editable region.
    pub fn keyup(&self, node: &Arc<Element>) {
        self.emit(PageEvent::KeyUp { node: node.id() });
    }

    /// Clipboard paste: the value lands before the event so observers
    /// reading after the settle delay see the pasted content.
    pub fn paste(&self, node: &Arc<Element>, text: &str) {
        node.set_text(text);
        self.emit(PageEvent::Paste { node: node.id() });
    }

    /// Files chosen through a file input.
    pub fn select_files(&self, node: &Arc<Element>, files: Vec<FileMeta>) {
        self.emit(PageEvent::FilesSelected {
            node: node.id(),
            files,
        });
    }

    /// Files dropped onto the page.
    pub fn drop_files(&self, files: Vec<FileMeta>) {
        self.emit(PageEvent::FilesDropped { files });
    }

    /// Report a form submission attempt.
    pub fn submit(&self, form: &Arc<Element>) {
        self.emit(PageEvent::SubmitAttempt { form: form.id() });
    }

    fn index_element(&self, el: &Arc<Element>) {
        self.index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(el.id(), Arc::downgrade(el));
    }

    fn emit(&self, event: PageEvent) {
        // No receiver means nobody is observing; mutations still apply.
        let _ = self.events.send(event);
    }
}
