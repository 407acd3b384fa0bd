//! Cloudflare DNS-01. Two mutually exclusive credential shapes, chosen in the
//! UI by the `providerOptions.cloudflare_auth` selector.

use serde::{Deserialize, Serialize};

use crate::node::Node;
use crate::path::Path;
use crate::state::{ErrorMap, FormState, data_path, options_path};
use crate::validation::{is_email, require_text};

use super::{AuxiliaryReset, OptionSelector, ProviderDescriptor, SelectOption};

pub const ID: &str = "dns01cloudflare";
pub const AUTH_TOKEN: &str = "token";
pub const AUTH_ACCOUNT: &str = "account";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudflareAccount {
    pub email: String,
    pub global_api_key: String,
}

/// The persisted `config` of a Cloudflare provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CloudflareCredential {
    ApiToken { api_token: String },
    Account { account: CloudflareAccount },
}

impl CloudflareCredential {
    pub fn from_config(config: &Node) -> Option<Self> {
        serde_json::from_value(config.to_value()).ok()
    }

    /// Selector value matching this shape.
    pub fn auth_mode(&self) -> &'static str {
        match self {
            CloudflareCredential::ApiToken { .. } => AUTH_TOKEN,
            CloudflareCredential::Account { .. } => AUTH_ACCOUNT,
        }
    }
}

fn config() -> Path {
    Path::root().key("config")
}

fn auth_selector() -> OptionSelector {
    let token = SelectOption::new(AUTH_TOKEN, "API Token")
        .also_set(AuxiliaryReset::unset(data_path(&config().key("account"))))
        .also_set(AuxiliaryReset::set(data_path(&config().key("api_token")), ""));
    let account = SelectOption::new(AUTH_ACCOUNT, "Account Email + Global API Key")
        .also_set(AuxiliaryReset::unset(data_path(&config().key("api_token"))))
        .also_set(AuxiliaryReset::set(
            data_path(&config().key("account")),
            Node::object([("email", Node::from("")), ("global_api_key", Node::from(""))]),
        ));
    OptionSelector::new(
        options_path(&Path::root().key("cloudflare_auth")),
        vec![token, account],
    )
}

pub(super) fn descriptor() -> ProviderDescriptor {
    ProviderDescriptor::new(
        ID,
        "DNS-01 Cloudflare",
        Node::object([("api_token", Node::from(""))]),
    )
    .also_set(AuxiliaryReset::set(
        options_path(&Path::root().key("cloudflare_auth")),
        AUTH_TOKEN,
    ))
    .selector(auth_selector())
    .validator(validate)
    .edit_transform(edit_transform)
}

fn validate(state: &FormState) -> ErrorMap {
    let mut errors = ErrorMap::new();
    let credential = state.data(&config()).and_then(CloudflareCredential::from_config);
    match credential {
        Some(CloudflareCredential::ApiToken { .. }) => {
            require_text(state, &config().key("api_token"), &mut errors);
        }
        Some(CloudflareCredential::Account { account }) => {
            if !is_email(&account.email) {
                errors.flag(config().key("account").key("email"));
            }
            require_text(state, &config().key("account").key("global_api_key"), &mut errors);
        }
        None => errors.flag(config().key("api_token")),
    }
    errors
}

fn edit_transform(config: &Node) -> Option<Node> {
    let credential = CloudflareCredential::from_config(config)?;
    Some(Node::object([(
        "cloudflare_auth",
        Node::from(credential.auth_mode()),
    )]))
}
