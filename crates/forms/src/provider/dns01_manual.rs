use crate::node::Node;
use crate::path::Path;
use crate::state::{ErrorMap, FormState};
use crate::validation::{check_environment, require_text};

use super::ProviderDescriptor;

pub const ID: &str = "dns01manual";

pub(super) fn descriptor() -> ProviderDescriptor {
    ProviderDescriptor::new(
        ID,
        "DNS-01 Manual Script",
        Node::object([
            ("environment", Node::array([Node::from("")])),
            ("create_script", Node::from("")),
            ("delete_script", Node::from("")),
        ]),
    )
    .validator(validate)
}

fn validate(state: &FormState) -> ErrorMap {
    let config = Path::root().key("config");
    let mut errors = ErrorMap::new();
    require_text(state, &config.clone().key("create_script"), &mut errors);
    require_text(state, &config.clone().key("delete_script"), &mut errors);
    check_environment(state, &config.key("environment"), &mut errors);
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn scripts_and_environment() {
        let state = FormState::new(Node::from(json!({
            "type": ID,
            "config": {
                "environment": ["TOKEN=abc", "", "1BAD=x", "novalue"],
                "create_script": "/opt/dns/create.sh",
                "delete_script": "  "
            }
        })));
        let errors = validate(&state);
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({ "config.delete_script": true, "config.environment": [2, 3] })
        );
    }
}
