use crate::node::Node;
use crate::path::Path;
use crate::state::{ErrorMap, FormState};
use crate::validation::{check_environment, require_text};

use super::ProviderDescriptor;

pub const ID: &str = "dns01acmesh";

// acme.sh is a shell script; the server cannot run it on Windows.
pub(super) fn descriptor() -> ProviderDescriptor {
    ProviderDescriptor::new(
        ID,
        "DNS-01 acme.sh",
        Node::object([
            ("acme_sh_path", Node::from("")),
            ("dns_hook", Node::from("")),
            ("environment", Node::array([Node::from("")])),
        ]),
    )
    .windows(false)
    .validator(validate)
}

fn validate(state: &FormState) -> ErrorMap {
    let config = Path::root().key("config");
    let mut errors = ErrorMap::new();
    require_text(state, &config.clone().key("acme_sh_path"), &mut errors);
    require_text(state, &config.clone().key("dns_hook"), &mut errors);
    check_environment(state, &config.key("environment"), &mut errors);
    errors
}
