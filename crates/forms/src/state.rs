//! Form runtime state and the pure reducer driving it.
//!
//! Addressing rules:
//!   * Change and list paths address the whole form: the first segment is
//!     `dataToSubmit` or `providerOptions`.
//!   * Validation error keys address `dataToSubmit` directly
//!     (`config.port`, `domains.1`), which is what validators see.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::change::{Change, apply_change};
use crate::error::FormError;
use crate::list::{add_element, remove_element};
use crate::node::Node;
use crate::path::{self, Path, Segment};
use crate::provider::ProviderRegistry;

pub const DATA_ROOT: &str = "dataToSubmit";
pub const OPTIONS_ROOT: &str = "providerOptions";

/// Error marker for one path: a plain flag for scalar widgets, or the
/// indices of the invalid elements for list widgets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorMarker {
    Flag(bool),
    Indices(Vec<usize>),
}

impl ErrorMarker {
    pub fn is_error(&self) -> bool {
        match self {
            ErrorMarker::Flag(flag) => *flag,
            ErrorMarker::Indices(indices) => !indices.is_empty(),
        }
    }

    /// Whether element `index` of a list field is marked invalid.
    pub fn marks_index(&self, index: usize) -> bool {
        match self {
            ErrorMarker::Flag(flag) => *flag,
            ErrorMarker::Indices(indices) => indices.contains(&index),
        }
    }
}

/// Path-keyed validation errors. Keys are relative to `dataToSubmit`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorMap(BTreeMap<Path, ErrorMarker>);

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(&mut self, path: Path) {
        self.0.insert(path, ErrorMarker::Flag(true));
    }

    /// Record invalid element indices; an empty list records nothing.
    pub fn indices(&mut self, path: Path, indices: Vec<usize>) {
        if !indices.is_empty() {
            self.0.insert(path, ErrorMarker::Indices(indices));
        }
    }

    pub fn insert(&mut self, path: Path, marker: ErrorMarker) {
        self.0.insert(path, marker);
    }

    pub fn get(&self, path: &Path) -> Option<&ErrorMarker> {
        self.0.get(path)
    }

    pub fn has_error(&self, path: &Path) -> bool {
        self.get(path).is_some_and(ErrorMarker::is_error)
    }

    pub fn remove(&mut self, path: &Path) -> Option<ErrorMarker> {
        self.0.remove(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &ErrorMarker)> {
        self.0.iter()
    }

    /// Overlay `other`; its markers win on equal keys.
    pub fn merge(&mut self, other: ErrorMap) {
        self.0.extend(other.0);
    }

    /// Drop markers that do not signal an error.
    pub fn retain_errors(&mut self) {
        self.0.retain(|_, marker| marker.is_error());
    }
}

impl FromIterator<(Path, ErrorMarker)> for ErrorMap {
    fn from_iter<T: IntoIterator<Item = (Path, ErrorMarker)>>(iter: T) -> Self {
        ErrorMap(iter.into_iter().collect())
    }
}

impl IntoIterator for ErrorMap {
    type Item = (Path, ErrorMarker);
    type IntoIter = std::collections::btree_map::IntoIter<Path, ErrorMarker>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// State of one form screen. Created when the screen mounts, discarded on
/// navigation away.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    pub data_to_submit: Node,
    #[serde(default)]
    pub validation_errors: ErrorMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_options: Option<Node>,
}

impl FormState {
    pub fn new(data_to_submit: Node) -> Self {
        Self {
            data_to_submit,
            validation_errors: ErrorMap::new(),
            provider_options: None,
        }
    }

    pub fn with_errors(mut self, errors: ErrorMap) -> Self {
        self.validation_errors = errors;
        self
    }

    /// Read a value relative to `dataToSubmit`.
    pub fn data(&self, path: &Path) -> Option<&Node> {
        path::get(&self.data_to_submit, path)
    }

    /// Read a value relative to `providerOptions`.
    pub fn option(&self, path: &Path) -> Option<&Node> {
        self.provider_options
            .as_ref()
            .and_then(|options| path::get(options, path))
    }

    /// The selected provider id (`dataToSubmit.type`).
    pub fn provider_id(&self) -> Option<&str> {
        self.data_to_submit.get("type").and_then(Node::as_str)
    }

    /// Read a value by form-rooted path.
    pub fn get(&self, path: &Path) -> Option<&Node> {
        match split_root(path).ok()? {
            (Root::Data, rest) => self.data(&rest),
            (Root::Options, rest) => self.option(&rest),
        }
    }

    /// Store (or with `None` unset) a value by form-rooted path.
    pub fn set(&self, path: &Path, value: Option<Node>) -> Result<FormState, FormError> {
        let mut next = self.clone();
        match split_root(path)? {
            (Root::Data, rest) => {
                next.data_to_submit = path::set(&self.data_to_submit, &rest, value)?;
            }
            (Root::Options, rest) => {
                let options = self.provider_options.clone().unwrap_or_else(Node::empty_object);
                next.provider_options = Some(path::set(&options, &rest, value)?);
            }
        }
        Ok(next)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Root {
    Data,
    Options,
}

/// Split a form-rooted path into its root and the remainder.
pub(crate) fn split_root(path: &Path) -> Result<(Root, Path), FormError> {
    let root = match path.first() {
        Some(Segment::Key(k)) if k == DATA_ROOT => Root::Data,
        Some(Segment::Key(k)) if k == OPTIONS_ROOT => Root::Options,
        Some(other) => return Err(FormError::UnknownRoot(other.to_string())),
        None => return Err(FormError::EmptyPath(path.clone())),
    };
    Ok((root, Path::new(&path.segments()[1..])))
}

/// Form-rooted path for a `dataToSubmit`-relative one.
pub fn data_path(relative: &Path) -> Path {
    Path::root().key(DATA_ROOT).join(relative)
}

/// Form-rooted path for a `providerOptions`-relative one.
pub fn options_path(relative: &Path) -> Path {
    Path::root().key(OPTIONS_ROOT).join(relative)
}

/// Every edit a form screen can make.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FormAction {
    AddElement {
        #[serde(rename = "add")]
        path: Path,
        template: Node,
    },
    RemoveElement {
        #[serde(rename = "remove")]
        path: Path,
        index: usize,
        #[serde(default, rename = "min")]
        min_elements: usize,
    },
    SetField(Change),
}

/// Apply one action and return the next state. Pure: `state` is untouched.
pub fn reduce(
    registry: &ProviderRegistry,
    state: &FormState,
    action: FormAction,
) -> Result<FormState, FormError> {
    match action {
        FormAction::SetField(change) => apply_change(registry, state, change),
        FormAction::AddElement { path, template } => add_element(state, &path, template),
        FormAction::RemoveElement {
            path,
            index,
            min_elements,
        } => remove_element(state, &path, index, min_elements),
    }
}
