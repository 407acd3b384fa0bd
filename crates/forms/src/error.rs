use thiserror::Error;

use crate::path::Path;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("invalid path {input:?}: {reason}")]
    InvalidPath { input: String, reason: &'static str },

    #[error("path {0} must not be empty for this operation")]
    EmptyPath(Path),

    #[error("index {index} out of range at {path} (len {len})")]
    IndexOutOfRange { path: Path, index: usize, len: usize },

    #[error("cannot descend into {found} at {path}")]
    NotAContainer { path: Path, found: &'static str },

    #[error("cannot unset array element at {0}; use remove_element")]
    UnsetArrayElement(Path),

    #[error("unknown form root {0:?} (expected dataToSubmit or providerOptions)")]
    UnknownRoot(String),

    #[error("no array at {0}")]
    NotAList(Path),

    #[error("removing index {index} from {path} would leave fewer than {min_elements} elements")]
    BelowMinimum {
        path: Path,
        index: usize,
        min_elements: usize,
    },

    #[error("provider {0:?} is already registered")]
    DuplicateProvider(String),
}
