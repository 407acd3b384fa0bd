//! List editor for array-valued sub-forms.
//!
//! Appending never invalidates existing error keys. Removing element `i`
//! shifts every later element down by one, so error keys that embed an
//! element index are renumbered:
//!
//! | key shape                 | index < i | index == i | index > i |
//! |---------------------------|-----------|------------|-----------|
//! | `<list>.<n>`              | keep      | drop       | `n - 1`   |
//! | `<list>.<n>.<field>`      | keep      | drop       | `n - 1`   |
//! | `<list>` (index marker)   | keep      | drop       | `n - 1`   |
//!
//! Any other key is copied unchanged.

use std::sync::Arc;

use tracing::debug;

use crate::error::FormError;
use crate::node::Node;
use crate::path::{Path, Segment};
use crate::state::{ErrorMap, ErrorMarker, FormState, Root, split_root};

/// What a list widget should render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ListView<'a> {
    /// The list does not exist yet (provider not initialised, data loading).
    Loading,
    Empty,
    Elements(&'a [Node]),
}

pub fn list_view<'a>(state: &'a FormState, path: &Path) -> ListView<'a> {
    match state.get(path).and_then(Node::as_array) {
        None => ListView::Loading,
        Some([]) => ListView::Empty,
        Some(items) => ListView::Elements(items),
    }
}

/// Whether the remove action may be offered for the list at `path`.
pub fn can_remove(state: &FormState, path: &Path, min_elements: usize) -> bool {
    state
        .get(path)
        .and_then(Node::as_array)
        .is_some_and(|items| items.len() > min_elements)
}

/// Append `template` (`""` for scalar lists, a prototype record for object
/// lists) to the array at `path`.
pub fn add_element(state: &FormState, path: &Path, template: Node) -> Result<FormState, FormError> {
    let items = array_at(state, path)?;
    let mut next = items.to_vec();
    next.push(template);
    debug!(%path, len = next.len(), "list element added");
    state.set(path, Some(Node::Array(Arc::new(next))))
}

/// Remove element `index` from the array at `path` and renumber the error
/// keys that point into it. Removal below `min_elements` is refused.
pub fn remove_element(
    state: &FormState,
    path: &Path,
    index: usize,
    min_elements: usize,
) -> Result<FormState, FormError> {
    let items = array_at(state, path)?;
    if index >= items.len() {
        return Err(FormError::IndexOutOfRange {
            path: path.clone(),
            index,
            len: items.len(),
        });
    }
    if items.len() <= min_elements {
        return Err(FormError::BelowMinimum {
            path: path.clone(),
            index,
            min_elements,
        });
    }

    let mut remaining = items.to_vec();
    remaining.remove(index);
    let mut next = state.set(path, Some(Node::Array(Arc::new(remaining))))?;

    if let (Root::Data, relative) = split_root(path)? {
        next.validation_errors = renumber_errors(&state.validation_errors, &relative, index);
    }
    debug!(%path, index, "list element removed");
    Ok(next)
}

fn array_at<'a>(state: &'a FormState, path: &Path) -> Result<&'a [Node], FormError> {
    state
        .get(path)
        .and_then(Node::as_array)
        .ok_or_else(|| FormError::NotAList(path.clone()))
}

/// Renumber error keys after element `removed` of `list` was deleted.
/// `list` is relative to `dataToSubmit`, like the error keys.
pub fn renumber_errors(errors: &ErrorMap, list: &Path, removed: usize) -> ErrorMap {
    let depth = list.len();
    let mut out = ErrorMap::new();

    for (key, marker) in errors.iter() {
        if key == list {
            if let ErrorMarker::Indices(indices) = marker {
                out.indices(key.clone(), shift_indices(indices, removed));
                continue;
            }
        }

        let element_key =
            key.starts_with(list) && (key.len() == depth + 1 || key.len() == depth + 2);
        let embedded = match key.segments().get(depth) {
            Some(Segment::Index(n)) if element_key => Some(*n),
            _ => None,
        };
        let field_ok = key.len() == depth + 1 || matches!(key.last(), Some(Segment::Key(_)));

        match embedded {
            Some(n) if field_ok => {
                if n < removed {
                    out.insert(key.clone(), marker.clone());
                } else if n > removed {
                    out.insert(key.with_segment(depth, Segment::Index(n - 1)), marker.clone());
                }
            }
            _ => out.insert(key.clone(), marker.clone()),
        }
    }
    out
}

fn shift_indices(indices: &[usize], removed: usize) -> Vec<usize> {
    indices
        .iter()
        .filter(|&&i| i != removed)
        .map(|&i| if i > removed { i - 1 } else { i })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn p(s: &str) -> Path {
        s.parse().unwrap()
    }

    fn errors(value: serde_json::Value) -> ErrorMap {
        serde_json::from_value(value).unwrap()
    }

    fn resources_state() -> FormState {
        FormState::new(Node::from(json!({
            "resources": [
                { "username": "a", "password": "1" },
                { "username": "b", "password": "2" },
                { "username": "c", "password": "3" }
            ]
        })))
        .with_errors(errors(json!({
            "resources.0.username": true,
            "resources.1.password": true,
            "resources.2": true
        })))
    }

    #[test]
    fn remove_shifts_and_drops_error_keys() {
        let state = resources_state();
        let next = remove_element(&state, &p("dataToSubmit.resources"), 1, 0).unwrap();

        assert_eq!(
            next.validation_errors,
            errors(json!({ "resources.0.username": true, "resources.1": true }))
        );
        assert_eq!(
            next.data(&p("resources")).unwrap().to_value(),
            json!([{ "username": "a", "password": "1" }, { "username": "c", "password": "3" }])
        );
        // Input untouched.
        assert_eq!(state.validation_errors.len(), 3);
    }

    #[test]
    fn unrelated_and_deeper_keys_are_copied() {
        let map = errors(json!({
            "resources.3.nested.field": true,
            "resources_extra.4": true,
            "domains.2": true,
            "config.port": true
        }));
        let out = renumber_errors(&map, &p("resources"), 1);
        assert_eq!(out, map);
    }

    #[test]
    fn index_markers_on_the_list_are_shifted() {
        let map = errors(json!({ "config.environment": [0, 1, 3] }));
        let out = renumber_errors(&map, &p("config.environment"), 1);
        assert_eq!(out, errors(json!({ "config.environment": [0, 2] })));

        let only_removed = errors(json!({ "config.environment": [1] }));
        assert!(renumber_errors(&only_removed, &p("config.environment"), 1).is_empty());
    }

    #[test]
    fn removal_below_minimum_is_refused() {
        let state = FormState::new(Node::from(json!({ "domains": ["only.example.com"] })));
        let path = p("dataToSubmit.domains");
        assert!(!can_remove(&state, &path, 1));
        let err = remove_element(&state, &path, 0, 1).unwrap_err();
        assert!(matches!(err, FormError::BelowMinimum { min_elements: 1, .. }));
    }

    #[test]
    fn removing_last_element_leaves_empty_array() {
        let state = FormState::new(Node::from(json!({ "domains": ["x.example.com"] })));
        let path = p("dataToSubmit.domains");
        assert!(can_remove(&state, &path, 0));
        let next = remove_element(&state, &path, 0, 0).unwrap();
        assert_eq!(next.data(&p("domains")), Some(&Node::array([])));
        assert_eq!(list_view(&next, &path), ListView::Empty);
    }

    #[test]
    fn add_appends_template() {
        let state = FormState::new(Node::from(json!({ "config": { "resources": [] } })))
            .with_errors(errors(json!({ "config.resources": true })));
        let template = Node::from(json!({ "username": "", "password": "" }));
        let next =
            add_element(&state, &p("dataToSubmit.config.resources"), template.clone()).unwrap();
        assert_eq!(next.data(&p("config.resources.0")), Some(&template));
        assert_eq!(next.validation_errors, state.validation_errors);
    }

    #[test]
    fn list_view_distinguishes_loading() {
        let state = FormState::new(Node::empty_object());
        assert_eq!(list_view(&state, &p("dataToSubmit.domains")), ListView::Loading);
        assert!(add_element(&state, &p("dataToSubmit.domains"), "".into()).is_err());
    }

    #[test]
    fn out_of_range_removal_fails() {
        let state = resources_state();
        let err = remove_element(&state, &p("dataToSubmit.resources"), 3, 0).unwrap_err();
        assert!(matches!(err, FormError::IndexOutOfRange { index: 3, len: 3, .. }));
    }
}
