use forms::provider::acme_dns_resource_template;
use forms::{
    Change, ErrorMap, FormAction, FormState, ListView, Node, Path, ProviderRegistry, get, list_view,
    reduce, set, validate,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn p(s: &str) -> Path {
    s.parse().unwrap()
}

fn run(registry: &ProviderRegistry, state: FormState, actions: Vec<FormAction>) -> FormState {
    actions
        .into_iter()
        .fold(state, |state, action| reduce(registry, &state, action).unwrap())
}

#[test]
fn set_then_get_returns_value_and_keeps_siblings_shared() {
    let tree = Node::from(json!({
        "config": {
            "resources": [{ "username": "a" }, { "username": "b" }],
            "acme_dns_address": "https://auth.example.com"
        },
        "domains": ["example.com"]
    }));
    for (path, value) in [
        ("config.resources.1.username", Node::from("z")),
        ("config.acme_dns_address", Node::int(1)),
        ("config.new.deeper.still", Node::Bool(true)),
    ] {
        let next = set(&tree, &p(path), Some(value.clone())).unwrap();
        assert_eq!(get(&next, &p(path)), Some(&value));
        assert!(get(&next, &p("domains")).unwrap().ptr_eq(get(&tree, &p("domains")).unwrap()));
    }
    assert_eq!(get(&tree, &p("config.resources.1.username")), Some(&Node::from("b")));

    let unset = set(&tree, &p("config.acme_dns_address"), None).unwrap();
    assert!(!get(&unset, &p("config")).unwrap().contains_key("acme_dns_address"));
}

#[test]
fn acme_dns_session_with_list_edits() {
    let registry = ProviderRegistry::builtin();
    let state = registry.blank_form("http01internal").unwrap();
    let resources = p("dataToSubmit.config.resources");

    let state = run(
        &registry,
        state,
        vec![
            FormAction::SetField(Change::text(p("dataToSubmit.type"), "dns01acmedns")),
            FormAction::SetField(Change::text(p("dataToSubmit.domains.0"), "example.com")),
            FormAction::SetField(Change::text(
                p("dataToSubmit.config.acme_dns_address"),
                "https://auth.acme-dns.io",
            )),
            FormAction::AddElement {
                path: resources.clone(),
                template: acme_dns_resource_template(),
            },
            FormAction::AddElement {
                path: resources.clone(),
                template: acme_dns_resource_template(),
            },
            FormAction::SetField(Change::text(
                p("dataToSubmit.config.resources.2.real_domain"),
                "example.com",
            )),
        ],
    );

    let errors = validate(&registry, &state);
    assert!(errors.has_error(&p("config.resources.0.username")));
    assert!(errors.has_error(&p("config.resources.2.password")));
    assert!(!errors.has_error(&p("config.resources.2.real_domain")));

    let state = reduce(
        &registry,
        &state.with_errors(errors),
        FormAction::RemoveElement {
            path: resources.clone(),
            index: 0,
            min_elements: 1,
        },
    )
    .unwrap();
    // Former element 2 is now element 1 and keeps its (shifted) markers.
    assert!(state.validation_errors.has_error(&p("config.resources.1.password")));
    assert!(!state.validation_errors.has_error(&p("config.resources.1.real_domain")));
    assert!(!state.validation_errors.has_error(&p("config.resources.2.password")));
    assert!(matches!(list_view(&state, &resources), ListView::Elements(items) if items.len() == 2));
}

#[test]
fn switching_providers_resets_config_and_errors() {
    let registry = ProviderRegistry::builtin();
    let state = registry.blank_form("dns01manual").unwrap();
    let errors = validate(&registry, &state);
    assert!(errors.has_error(&p("config.create_script")));
    let state = state.with_errors(errors);

    let state = reduce(
        &registry,
        &state,
        FormAction::SetField(Change::text(p("dataToSubmit.type"), "http01internal")),
    )
    .unwrap();
    assert_eq!(state.validation_errors, ErrorMap::new());
    assert_eq!(state.data(&p("config")).unwrap().to_value(), json!({ "port": 4060 }));
}

#[test]
fn unknown_provider_never_fails() {
    let registry = ProviderRegistry::builtin();
    let state = FormState::new(Node::from(json!({
        "type": "unknown-type",
        "domains": ["example.com"],
        "config": { "anything": [1, 2, 3] }
    })));
    assert!(registry.get("unknown-type").validate(&state).is_empty());
    assert!(validate(&registry, &state).is_empty());
    let edit = registry.edit_form(Some(&state.data_to_submit)).unwrap();
    assert_eq!(edit.provider_options, None);
}

#[test]
fn edit_form_reconstructs_cloudflare_selector() {
    let registry = ProviderRegistry::builtin();
    let persisted = Node::from(json!({
        "type": "dns01cloudflare",
        "domains": ["*.example.com"],
        "config": { "account": { "email": "ops@example.com", "global_api_key": "key" } }
    }));
    let state = registry.edit_form(Some(&persisted)).unwrap();
    assert_eq!(state.option(&p("cloudflare_auth")), Some(&Node::from("account")));
    assert!(validate(&registry, &state).is_empty());
}

#[test]
fn wildcard_only_domain_list_is_exempt() {
    let registry = ProviderRegistry::builtin();
    let state = registry.blank_form("dns01goacme").unwrap();
    let state = run(
        &registry,
        state,
        vec![
            FormAction::SetField(Change::text(p("dataToSubmit.domains.0"), "*")),
            FormAction::SetField(Change::text(
                p("dataToSubmit.config.dns_provider_name"),
                "route53",
            )),
        ],
    );
    assert!(validate(&registry, &state).is_empty());
}
