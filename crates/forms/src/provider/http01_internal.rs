use crate::node::Node;
use crate::path::Path;
use crate::state::{ErrorMap, FormState};

use super::ProviderDescriptor;

pub const ID: &str = "http01internal";
const DEFAULT_PORT: i64 = 4060;

pub(super) fn descriptor() -> ProviderDescriptor {
    ProviderDescriptor::new(
        ID,
        "HTTP-01 Internal Server",
        Node::object([("port", Node::int(DEFAULT_PORT))]),
    )
    .validator(validate)
}

fn validate(state: &FormState) -> ErrorMap {
    let mut errors = ErrorMap::new();
    let port = Path::root().key("config").key("port");
    let valid = state
        .data(&port)
        .and_then(Node::as_i64)
        .is_some_and(|p| (1..=65535).contains(&p));
    if !valid {
        errors.flag(port);
    }
    errors
}
