use crate::node::Node;
use crate::path::Path;
use crate::state::{ErrorMap, FormState};
use crate::validation::{check_environment, require_text};

use super::ProviderDescriptor;

pub const ID: &str = "dns01goacme";

pub(super) fn descriptor() -> ProviderDescriptor {
    ProviderDescriptor::new(
        ID,
        "DNS-01 go-acme",
        Node::object([
            ("dns_provider_name", Node::from("")),
            ("environment", Node::array([Node::from("")])),
        ]),
    )
    .validator(validate)
}

fn validate(state: &FormState) -> ErrorMap {
    let config = Path::root().key("config");
    let mut errors = ErrorMap::new();
    require_text(state, &config.clone().key("dns_provider_name"), &mut errors);
    check_environment(state, &config.key("environment"), &mut errors);
    errors
}
