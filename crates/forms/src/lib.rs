//! Generic form state engine for the admin console.
//!
//! Every form screen keeps one [`FormState`]: the JSON document that will be
//! submitted, a path-keyed validation error map, and optional UI-only provider
//! options. Widgets never touch the document directly; they emit a [`Change`]
//! which is coerced, applied through the path mutator and followed by any
//! auxiliary resets the active [`ProviderDescriptor`] declares.
//!
//! Modules:
//!   - `node`       : immutable JSON-like tree with structural sharing
//!   - `path`       : typed dot-paths plus `get` / `set`
//!   - `change`     : widget change contract and value coercion
//!   - `list`       : add/remove for array sub-forms, error key renumbering
//!   - `state`      : `FormState`, error markers, reducer
//!   - `provider`   : descriptor registry and the built-in provider plugins
//!   - `validation` : aggregator (generic checks + provider rules)
//!   - `submit`     : hand-off to the network-send collaborator

mod error;

pub mod change;
pub mod list;
pub mod node;
pub mod path;
pub mod provider;
pub mod state;
pub mod submit;
pub mod validation;

pub use change::{Change, ValueKind, apply_change};
pub use error::FormError;
pub use list::{ListView, add_element, can_remove, list_view, remove_element};
pub use node::Node;
pub use path::{Path, Segment, get, set};
pub use provider::{
    AuxiliaryReset, OptionSelector, ProviderDescriptor, ProviderRegistry, SelectOption,
};
pub use state::{ErrorMap, ErrorMarker, FormAction, FormState, reduce};
pub use submit::{Method, SendError, Sender, SubmitOutcome, SubmitRequest, submit};
pub use validation::validate;
