use crate::node::Node;
use crate::path::Path;
use crate::state::{ErrorMap, FormState};
use crate::validation::{is_domain, is_http_url};

use super::ProviderDescriptor;

pub const ID: &str = "dns01acmedns";

/// Prototype record appended by the resource list's add action.
pub fn resource_template() -> Node {
    Node::object([
        ("real_domain", Node::from("")),
        ("full_domain", Node::from("")),
        ("username", Node::from("")),
        ("password", Node::from("")),
    ])
}

pub(super) fn descriptor() -> ProviderDescriptor {
    ProviderDescriptor::new(
        ID,
        "DNS-01 acme-dns",
        Node::object([
            ("acme_dns_address", Node::from("")),
            ("resources", Node::array([resource_template()])),
        ]),
    )
    .validator(validate)
}

fn validate(state: &FormState) -> ErrorMap {
    let config = Path::root().key("config");
    let mut errors = ErrorMap::new();

    let address = config.clone().key("acme_dns_address");
    if !state.data(&address).and_then(Node::as_str).is_some_and(is_http_url) {
        errors.flag(address);
    }

    let list = config.key("resources");
    let resources = state.data(&list).and_then(Node::as_array).unwrap_or_default();
    if resources.is_empty() {
        errors.flag(list.clone());
    }
    for (i, resource) in resources.iter().enumerate() {
        for name in ["real_domain", "full_domain"] {
            if !is_domain(field(resource, name)) {
                errors.flag(list.clone().index(i).key(name));
            }
        }
        for name in ["username", "password"] {
            if field(resource, name).trim().is_empty() {
                errors.flag(list.clone().index(i).key(name));
            }
        }
    }
    errors
}

fn field<'a>(record: &'a Node, name: &str) -> &'a str {
    record.get(name).and_then(Node::as_str).unwrap_or_default()
}
