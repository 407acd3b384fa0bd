//! Validation aggregator.
//!
//! `validate` = generic cross-field checks overlaid by the active provider's
//! own rules. Provider markers win on equal keys. Validation is syntactic
//! only and never touches the network.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::node::Node;
use crate::path::Path;
use crate::provider::ProviderRegistry;
use crate::state::{ErrorMap, FormState};

static DOMAIN_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").expect("DOMAIN_LABEL failed")
});
static ENV_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("ENV_NAME failed"));
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("EMAIL failed"));

/// Full error map for `state`. Empty means the form may be submitted.
pub fn validate(registry: &ProviderRegistry, state: &FormState) -> ErrorMap {
    let mut errors = generic_checks(state);
    let provider = registry.active(state);
    errors.merge(provider.validate(state));
    errors.retain_errors();
    debug!(provider = %provider.id, errors = errors.len(), "form validated");
    errors
}

/// Checks shared by every provider type.
pub fn generic_checks(state: &FormState) -> ErrorMap {
    let mut errors = ErrorMap::new();
    check_domains(state, &mut errors);
    errors
}

fn check_domains(state: &FormState, errors: &mut ErrorMap) {
    let list = Path::root().key("domains");
    let Some(domains) = state.data(&list).and_then(Node::as_array) else {
        errors.flag(list);
        return;
    };
    match domains {
        [] => errors.flag(list),
        [only] if only.as_str() == Some("*") => {}
        _ => {
            for (i, domain) in domains.iter().enumerate() {
                if !domain.as_str().is_some_and(is_domain) {
                    errors.flag(list.clone().index(i));
                }
            }
        }
    }
}

/// Domain name with at least two labels and an optional `*.` prefix.
pub fn is_domain(input: &str) -> bool {
    let name = input.strip_prefix("*.").unwrap_or(input);
    let labels: Vec<&str> = name.split('.').collect();
    name.len() <= 253 && labels.len() >= 2 && labels.iter().all(|l| DOMAIN_LABEL.is_match(l))
}

pub fn is_http_url(input: &str) -> bool {
    let rest = input
        .strip_prefix("https://")
        .or_else(|| input.strip_prefix("http://"));
    rest.is_some_and(|r| !r.is_empty() && !r.chars().any(char::is_whitespace))
}

pub fn is_email(input: &str) -> bool {
    EMAIL.is_match(input)
}

/// `NAME=value`, `NAME` a shell-safe variable name.
pub fn is_env_assignment(input: &str) -> bool {
    input
        .split_once('=')
        .is_some_and(|(name, _)| ENV_NAME.is_match(name))
}

/// Flag `path` (relative to `dataToSubmit`) when its text is blank.
pub(crate) fn require_text(state: &FormState, path: &Path, errors: &mut ErrorMap) {
    let blank = state
        .data(path)
        .and_then(Node::as_str)
        .is_none_or(|s| s.trim().is_empty());
    if blank {
        errors.flag(path.clone());
    }
}

/// Mark invalid non-empty entries of an environment list as an index marker.
pub(crate) fn check_environment(state: &FormState, path: &Path, errors: &mut ErrorMap) {
    let Some(entries) = state.data(path).and_then(Node::as_array) else {
        return;
    };
    let invalid = entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| match entry.as_str() {
            Some("") => false,
            Some(s) => !is_env_assignment(s),
            None => true,
        })
        .map(|(i, _)| i)
        .collect();
    errors.indices(path.clone(), invalid);
}
