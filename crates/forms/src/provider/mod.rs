//! Provider plugin registry.
//!
//! A provider type (HTTP server, DNS API integration, ...) is described
//! declaratively by a [`ProviderDescriptor`]: the default `config` sub-tree,
//! auxiliary resets applied on selection, option selectors with their own
//! resets, a validator and an optional edit transform. The registry is total:
//! an unknown or blank id resolves to an inert dummy descriptor.
//!
//! Usage:
//! ```ignore
//! let registry = ProviderRegistry::builtin();
//! let form = registry.blank_form("dns01cloudflare")?;
//! let errors = registry.get("dns01cloudflare").validate(&form);
//! ```

mod dns01_acme_dns;
mod dns01_acme_sh;
mod dns01_cloudflare;
mod dns01_go_acme;
mod dns01_manual;
mod http01_internal;

use tracing::{debug, warn};

use crate::error::FormError;
use crate::node::Node;
use crate::path::Path;
use crate::state::{ErrorMap, FormState, data_path};

pub use dns01_acme_dns::resource_template as acme_dns_resource_template;
pub use dns01_cloudflare::{CloudflareAccount, CloudflareCredential};

type ValidateFn = Box<dyn Fn(&FormState) -> ErrorMap + Send + Sync>;
type EditTransformFn = Box<dyn Fn(&Node) -> Option<Node> + Send + Sync>;

/// "Selecting X also sets G to V". `value: None` unsets `path`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuxiliaryReset {
    pub path: Path,
    pub value: Option<Node>,
}

impl AuxiliaryReset {
    pub fn set(path: Path, value: impl Into<Node>) -> Self {
        Self {
            path,
            value: Some(value.into()),
        }
    }

    pub fn unset(path: Path) -> Self {
        Self { path, value: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectOption {
    pub value: String,
    pub name: String,
    pub also_set: Vec<AuxiliaryReset>,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            name: name.into(),
            also_set: Vec::new(),
        }
    }

    pub fn also_set(mut self, reset: AuxiliaryReset) -> Self {
        self.also_set.push(reset);
        self
    }
}

/// A select widget at a form-rooted path whose options carry resets.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSelector {
    pub path: Path,
    pub options: Vec<SelectOption>,
}

impl OptionSelector {
    pub fn new(path: Path, options: Vec<SelectOption>) -> Self {
        Self { path, options }
    }

    pub fn option(&self, value: &str) -> Option<&SelectOption> {
        self.options.iter().find(|o| o.value == value)
    }

    /// Selected option value; falls back to the first option when unset.
    pub fn current<'a>(&'a self, state: &'a FormState) -> Option<&'a str> {
        state
            .get(&self.path)
            .and_then(Node::as_str)
            .filter(|v| self.option(v).is_some())
            .or_else(|| self.options.first().map(|o| o.value.as_str()))
    }
}

pub struct ProviderDescriptor {
    pub id: String,
    pub display_name: String,
    /// Shape of `dataToSubmit.config` right after selection.
    pub default_subtree: Node,
    pub auxiliary_resets: Vec<AuxiliaryReset>,
    pub selectors: Vec<OptionSelector>,
    pub supports_windows: bool,
    validate: Option<ValidateFn>,
    edit_transform: Option<EditTransformFn>,
}

impl ProviderDescriptor {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        default_subtree: Node,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            default_subtree,
            auxiliary_resets: Vec::new(),
            selectors: Vec::new(),
            supports_windows: true,
            validate: None,
            edit_transform: None,
        }
    }

    /// Inert descriptor for unknown or not-yet-selected ids.
    pub fn dummy() -> Self {
        Self::new("", "Unknown provider", Node::empty_object())
    }

    pub fn also_set(mut self, reset: AuxiliaryReset) -> Self {
        self.auxiliary_resets.push(reset);
        self
    }

    pub fn selector(mut self, selector: OptionSelector) -> Self {
        self.selectors.push(selector);
        self
    }

    pub fn windows(mut self, supported: bool) -> Self {
        self.supports_windows = supported;
        self
    }

    pub fn validator(
        mut self,
        f: impl Fn(&FormState) -> ErrorMap + Send + Sync + 'static,
    ) -> Self {
        self.validate = Some(Box::new(f));
        self
    }

    pub fn edit_transform(
        mut self,
        f: impl Fn(&Node) -> Option<Node> + Send + Sync + 'static,
    ) -> Self {
        self.edit_transform = Some(Box::new(f));
        self
    }

    pub fn is_dummy(&self) -> bool {
        self.id.is_empty()
    }

    pub fn validate(&self, state: &FormState) -> ErrorMap {
        self.validate.as_ref().map(|f| f(state)).unwrap_or_default()
    }

    /// Derive UI-only provider options from a persisted `config`.
    /// `None` (not loaded yet) always yields `None`.
    pub fn transform_for_edit(&self, persisted_config: Option<&Node>) -> Option<Node> {
        let config = persisted_config?;
        self.edit_transform.as_ref().and_then(|f| f(config))
    }

    pub fn selector_at(&self, path: &Path) -> Option<&OptionSelector> {
        self.selectors.iter().find(|s| &s.path == path)
    }
}

impl std::fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("default_subtree", &self.default_subtree)
            .field("auxiliary_resets", &self.auxiliary_resets)
            .field("selectors", &self.selectors)
            .field("supports_windows", &self.supports_windows)
            .finish_non_exhaustive()
    }
}

pub struct ProviderRegistry {
    providers: Vec<ProviderDescriptor>,
    dummy: ProviderDescriptor,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            dummy: ProviderDescriptor::dummy(),
        }
    }

    /// Registry with every built-in provider type.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for descriptor in [
            http01_internal::descriptor(),
            dns01_manual::descriptor(),
            dns01_acme_dns::descriptor(),
            dns01_acme_sh::descriptor(),
            dns01_cloudflare::descriptor(),
            dns01_go_acme::descriptor(),
        ] {
            let registered = registry.register(descriptor);
            debug_assert!(registered.is_ok(), "duplicate built-in provider: {registered:?}");
        }
        registry
    }

    pub fn register(&mut self, descriptor: ProviderDescriptor) -> Result<(), FormError> {
        if descriptor.is_dummy() || self.contains(&descriptor.id) {
            return Err(FormError::DuplicateProvider(descriptor.id));
        }
        self.providers.push(descriptor);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.providers.iter().any(|d| d.id == id)
    }

    /// Descriptor for `id`, or the dummy for unknown / blank ids.
    pub fn get(&self, id: &str) -> &ProviderDescriptor {
        self.providers
            .iter()
            .find(|d| d.id == id)
            .unwrap_or(&self.dummy)
    }

    pub fn active(&self, state: &FormState) -> &ProviderDescriptor {
        self.get(state.provider_id().unwrap_or_default())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderDescriptor> {
        self.providers.iter()
    }

    pub fn type_selector_path(&self) -> Path {
        data_path(&Path::root().key("type"))
    }

    /// The provider type select widget, one option per registered provider.
    pub fn type_selector(&self) -> OptionSelector {
        OptionSelector::new(
            self.type_selector_path(),
            self.providers
                .iter()
                .map(|d| SelectOption::new(d.id.clone(), d.display_name.clone()))
                .collect(),
        )
    }

    /// Fresh form for a new provider of type `id`: one empty domain, then
    /// the same reset as selecting `id` in the type selector.
    pub fn blank_form(&self, id: &str) -> Result<FormState, FormError> {
        let data = Node::object([
            ("type", Node::from("")),
            ("domains", Node::array([Node::from("")])),
            ("config", Node::empty_object()),
        ]);
        self.select_provider(&FormState::new(data), id)
    }

    /// Switch the form to provider `id`: the `config` sub-tree becomes the
    /// descriptor's default, validation errors and provider options are
    /// cleared, then the descriptor's auxiliary resets are applied.
    pub fn select_provider(&self, state: &FormState, id: &str) -> Result<FormState, FormError> {
        let descriptor = self.get(id);
        if descriptor.is_dummy() {
            warn!(id, "selected unknown provider type");
        }
        debug!(id, "provider selected");

        let mut next = state
            .set(&self.type_selector_path(), Some(Node::from(id)))?
            .set(
                &data_path(&Path::root().key("config")),
                Some(descriptor.default_subtree.clone()),
            )?;
        next.validation_errors = ErrorMap::new();
        next.provider_options = None;
        // Resets may seed provider options.
        for reset in &descriptor.auxiliary_resets {
            next = next.set(&reset.path, reset.value.clone())?;
        }
        Ok(next)
    }

    /// Form for editing a persisted provider record. `None` while the record
    /// is still loading.
    pub fn edit_form(&self, persisted: Option<&Node>) -> Option<FormState> {
        let record = persisted?;
        let descriptor = self.get(record.get("type").and_then(Node::as_str).unwrap_or_default());
        let mut state = FormState::new(record.clone());
        state.provider_options = descriptor.transform_for_edit(record.get("config"));
        Some(state)
    }
}
