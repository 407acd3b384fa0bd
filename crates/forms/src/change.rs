//! Synthetic change adapter.
//!
//! Every widget (text box, checkbox, number field, select, one list element)
//! reports edits as a [`Change`]: a form-rooted path, the raw widget value
//! and how to coerce it. [`apply_change`] turns that into the next state:
//! coerce, primary `set`, then the auxiliary resets of a matching selector
//! option in declaration order.

use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::debug;

use crate::error::FormError;
use crate::node::Node;
use crate::path::Path;
use crate::provider::ProviderRegistry;
use crate::state::FormState;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ValueKind {
    #[default]
    Text,
    Number,
    Checkbox,
    Unchanged,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub path: Path,
    pub value: Node,
    #[serde(default)]
    pub kind: ValueKind,
}

impl Change {
    pub fn new(path: Path, value: impl Into<Node>, kind: ValueKind) -> Self {
        Self {
            path,
            value: value.into(),
            kind,
        }
    }

    pub fn text(path: Path, value: impl Into<String>) -> Self {
        Self::new(path, Node::String(value.into()), ValueKind::Text)
    }

    pub fn number(path: Path, raw: impl Into<String>) -> Self {
        Self::new(path, Node::String(raw.into()), ValueKind::Number)
    }

    pub fn checkbox(path: Path, checked: bool) -> Self {
        Self::new(path, Node::Bool(checked), ValueKind::Checkbox)
    }
}

/// Coerce a raw widget value.
///
/// `Number` parses an integer; text that does not parse is kept as text so
/// validation can flag it. `Checkbox` yields a boolean. Everything else
/// passes through.
pub fn coerce(value: Node, kind: ValueKind) -> Node {
    match kind {
        ValueKind::Number => match &value {
            Node::String(raw) => match raw.trim().parse::<i64>() {
                Ok(n) => Node::int(n),
                Err(_) => value,
            },
            _ => value,
        },
        ValueKind::Checkbox => match &value {
            Node::Bool(_) => value,
            Node::String(raw) => Node::Bool(matches!(raw.as_str(), "true" | "on" | "1")),
            Node::Number(n) => Node::Bool(n.as_f64().is_some_and(|f| f != 0.0)),
            _ => Node::Bool(false),
        },
        ValueKind::Text | ValueKind::Unchanged => value,
    }
}

/// Apply one widget change to `state`.
///
/// A change of the provider type field is a provider selection and resets the
/// provider sub-tree, errors and options. A change of any selector the active
/// provider declares is followed by that option's auxiliary resets.
pub fn apply_change(
    registry: &ProviderRegistry,
    state: &FormState,
    change: Change,
) -> Result<FormState, FormError> {
    let value = coerce(change.value, change.kind);
    debug!(path = %change.path, kind = %change.kind, "form change");

    if change.path == registry.type_selector_path() {
        let id = value.to_option_value().unwrap_or_default();
        return registry.select_provider(state, &id);
    }

    let mut next = state.set(&change.path, Some(value.clone()))?;

    let provider = registry.active(state);
    if let Some(selector) = provider.selector_at(&change.path) {
        if let Some(option) = value
            .to_option_value()
            .and_then(|v| selector.option(&v))
        {
            for reset in &option.also_set {
                debug!(path = %reset.path, "auxiliary reset");
                next = next.set(&reset.path, reset.value.clone())?;
            }
        }
    }

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn number_coercion() {
        assert_eq!(coerce("4060".into(), ValueKind::Number), Node::int(4060));
        assert_eq!(coerce(" 80 ".into(), ValueKind::Number), Node::int(80));
        assert_eq!(coerce("80a".into(), ValueKind::Number), Node::from("80a"));
        assert_eq!(coerce(Node::int(3), ValueKind::Number), Node::int(3));
    }

    #[test]
    fn checkbox_coercion() {
        assert_eq!(coerce(Node::Bool(true), ValueKind::Checkbox), Node::Bool(true));
        assert_eq!(coerce("on".into(), ValueKind::Checkbox), Node::Bool(true));
        assert_eq!(coerce("false".into(), ValueKind::Checkbox), Node::Bool(false));
        assert_eq!(coerce(Node::int(0), ValueKind::Checkbox), Node::Bool(false));
    }

    #[test]
    fn text_and_unchanged_pass_through() {
        let obj = Node::from(json!({ "a": 1 }));
        assert_eq!(coerce(obj.clone(), ValueKind::Unchanged), obj);
        assert_eq!(coerce("80".into(), ValueKind::Text), Node::from("80"));
    }

    #[test]
    fn kind_defaults_to_text_when_absent() {
        let change: Change =
            serde_json::from_value(json!({ "path": "dataToSubmit.domains.0", "value": "x" }))
                .unwrap();
        assert_eq!(change.kind, ValueKind::Text);
    }
}
