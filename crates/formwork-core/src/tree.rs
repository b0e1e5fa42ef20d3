//! Host form tree: an arena of controls addressable by structural path.
//!
//! Controls form a tree of groups (keyed children), lists (ordered
//! children) and leaves (plain values). Each control carries the state the
//! validation layer attaches: error and warning lists, a pending flag, and
//! an enabled/disabled flag. The tree is the single shared mutable
//! resource: the host writes values, the orchestrator writes validation
//! state. That split is a usage discipline, not a lock.
//!
//! Value writes notify subscribers with the changed control's path;
//! validation-state writes do not, which is what lets the orchestrator
//! annotate controls without looking like a user edit.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tokio::sync::mpsc;

use formwork_model::{FieldPath, Segment};

use crate::error::{Result, TreeError};
use crate::transcode;

/// Handle to a control in a [`FormTree`] arena.
///
/// Ids are only meaningful for the tree that produced them; handing one to
/// another tree is a programming error. Replacing a structural value via
/// [`FormTree::set_value`] orphans the ids inside the replaced subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlId(usize);

#[derive(Debug, Clone)]
enum ControlKind {
    Leaf(Value),
    Group(BTreeMap<String, ControlId>),
    List(Vec<ControlId>),
}

#[derive(Debug, Clone)]
struct Control {
    kind: ControlKind,
    parent: Option<ControlId>,
    disabled: bool,
    pending: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Control {
    fn new(kind: ControlKind, parent: Option<ControlId>) -> Self {
        Self {
            kind,
            parent,
            disabled: false,
            pending: false,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// A mutable tree of form controls.
pub struct FormTree {
    arena: Vec<Control>,
    root: ControlId,
    watchers: Vec<mpsc::UnboundedSender<FieldPath>>,
}

impl FormTree {
    /// Build a tree mirroring `model`: objects become groups, arrays become
    /// lists, everything else a leaf.
    pub fn from_model(model: &Value) -> Self {
        let mut tree = FormTree {
            arena: Vec::new(),
            root: ControlId(0),
            watchers: Vec::new(),
        };
        tree.root = tree.build_node(model, None);
        tree
    }

    /// Build a tree from a map-only host representation, restoring the
    /// declared `list_keys` to ordered lists first.
    pub fn from_form_value(value: &Value, list_keys: &[&str]) -> Self {
        Self::from_model(&transcode::object_to_array(value, list_keys))
    }

    /// The root control.
    pub fn root(&self) -> ControlId {
        self.root
    }

    /// Assemble the full model snapshot.
    pub fn value(&self) -> Value {
        self.value_of(self.root)
    }

    /// Assemble the value rooted at `id`.
    pub fn value_of(&self, id: ControlId) -> Value {
        match &self.arena[id.0].kind {
            ControlKind::Leaf(value) => value.clone(),
            ControlKind::Group(children) => {
                let mut map = Map::new();
                for (key, child) in children {
                    map.insert(key.clone(), self.value_of(*child));
                }
                Value::Object(map)
            }
            ControlKind::List(children) => Value::Array(
                children
                    .iter()
                    .map(|child| self.value_of(*child))
                    .collect(),
            ),
        }
    }

    /// The model as the map-only host representation: every list rendered
    /// as a numeric-keyed map.
    pub fn form_value(&self) -> Value {
        transcode::deep_array_to_object(&self.value())
    }

    /// Locate the control at `path`.
    ///
    /// An index segment also resolves a group child keyed by the digit
    /// string, so paths parsed from a map-only host representation land on
    /// the same controls.
    pub fn resolve(&self, path: &FieldPath) -> Option<ControlId> {
        let mut current = self.root;
        for segment in path.segments() {
            current = match (&self.arena[current.0].kind, segment) {
                (ControlKind::Group(children), Segment::Key(key)) => *children.get(key)?,
                (ControlKind::Group(children), Segment::Index(index)) => {
                    *children.get(&index.to_string())?
                }
                (ControlKind::List(children), Segment::Index(index)) => *children.get(*index)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// The structural path of `id` within this tree.
    pub fn path_of(&self, id: ControlId) -> FieldPath {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(parent) = self.arena[current.0].parent {
            segments.push(self.segment_in_parent(parent, current));
            current = parent;
        }
        segments.reverse();
        FieldPath::from(segments)
    }

    fn segment_in_parent(&self, parent: ControlId, child: ControlId) -> Segment {
        match &self.arena[parent.0].kind {
            ControlKind::Group(children) => children
                .iter()
                .find(|(_, id)| **id == child)
                .map(|(key, _)| Segment::key(key.clone()))
                .unwrap_or_else(|| unreachable!("child not registered in its parent group")),
            ControlKind::List(children) => children
                .iter()
                .position(|id| *id == child)
                .map(Segment::index)
                .unwrap_or_else(|| unreachable!("child not registered in its parent list")),
            ControlKind::Leaf(_) => unreachable!("leaf controls have no children"),
        }
    }

    /// Write a new value at `path`, rebuilding the subtree for structural
    /// values, and notify subscribers.
    pub fn set_value(&mut self, path: &FieldPath, value: &Value) -> Result<()> {
        let id = self.resolve(path).ok_or_else(|| TreeError::PathNotFound {
            path: path.to_string(),
        })?;
        self.replace_kind(id, value);
        tracing::debug!("value changed at '{}'", path);
        self.notify(path);
        Ok(())
    }

    /// Subscribe to value-change notifications.
    ///
    /// Each write through [`set_value`](Self::set_value) sends the changed
    /// path. Dropped receivers are pruned on the next notification.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<FieldPath> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.watchers.push(sender);
        receiver
    }

    /// Error messages attached to `id`.
    pub fn errors(&self, id: ControlId) -> &[String] {
        &self.arena[id.0].errors
    }

    /// Warning messages attached to `id`.
    pub fn warnings(&self, id: ControlId) -> &[String] {
        &self.arena[id.0].warnings
    }

    pub fn is_pending(&self, id: ControlId) -> bool {
        self.arena[id.0].pending
    }

    pub fn is_disabled(&self, id: ControlId) -> bool {
        self.arena[id.0].disabled
    }

    pub fn set_errors(&mut self, id: ControlId, errors: Vec<String>) {
        self.arena[id.0].errors = errors;
    }

    pub fn set_warnings(&mut self, id: ControlId, warnings: Vec<String>) {
        self.arena[id.0].warnings = warnings;
    }

    pub fn set_pending(&mut self, id: ControlId, pending: bool) {
        self.arena[id.0].pending = pending;
    }

    /// Enable or disable a control. Disabled controls keep their value but
    /// drop out of aggregation and validity.
    pub fn set_disabled(&mut self, id: ControlId, disabled: bool) {
        self.arena[id.0].disabled = disabled;
    }

    /// Children of `id` with the segment each contributes to its path:
    /// numeric segments under lists, key segments under groups.
    pub fn children(&self, id: ControlId) -> Vec<(Segment, ControlId)> {
        match &self.arena[id.0].kind {
            ControlKind::Leaf(_) => Vec::new(),
            ControlKind::Group(children) => children
                .iter()
                .map(|(key, child)| (Segment::key(key.clone()), *child))
                .collect(),
            ControlKind::List(children) => children
                .iter()
                .enumerate()
                .map(|(index, child)| (Segment::index(index), *child))
                .collect(),
        }
    }

    /// Drop every error and warning in the tree. Used before a whole-model
    /// validation pass reapplies fresh results.
    pub fn clear_validation_state(&mut self) {
        for control in &mut self.arena {
            control.errors.clear();
            control.warnings.clear();
        }
    }

    /// Whether no enabled control carries an error. Warnings and disabled
    /// subtrees are ignored.
    pub fn is_valid(&self) -> bool {
        self.subtree_valid(self.root)
    }

    fn subtree_valid(&self, id: ControlId) -> bool {
        let control = &self.arena[id.0];
        if control.disabled {
            return true;
        }
        if !control.errors.is_empty() {
            return false;
        }
        self.children(id)
            .iter()
            .all(|(_, child)| self.subtree_valid(*child))
    }

    fn build_node(&mut self, value: &Value, parent: Option<ControlId>) -> ControlId {
        let id = ControlId(self.arena.len());
        self.arena
            .push(Control::new(ControlKind::Leaf(Value::Null), parent));
        self.replace_kind(id, value);
        id
    }

    fn replace_kind(&mut self, id: ControlId, value: &Value) {
        let kind = match value {
            Value::Object(entries) => {
                let mut children = BTreeMap::new();
                for (key, entry) in entries {
                    let child = self.build_node(entry, Some(id));
                    children.insert(key.clone(), child);
                }
                ControlKind::Group(children)
            }
            Value::Array(items) => ControlKind::List(
                items
                    .iter()
                    .map(|item| self.build_node(item, Some(id)))
                    .collect(),
            ),
            other => ControlKind::Leaf(other.clone()),
        };
        self.arena[id.0].kind = kind;
    }

    fn notify(&mut self, path: &FieldPath) {
        self.watchers
            .retain(|watcher| watcher.send(path.clone()).is_ok());
    }
}
