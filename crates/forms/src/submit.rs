//! Submission hand-off to the network-send collaborator.
//!
//! The form engine never speaks HTTP itself: it validates, then hands
//! `(method, url, body)` to a [`Sender`] and relays the response body or a
//! [`SendError`]. Status codes are not inspected beyond success/failure.

use serde_json::Value;
use strum::{Display, EnumString};
use thiserror::Error;
use tracing::{info, warn};

use crate::provider::ProviderRegistry;
use crate::state::{ErrorMap, FormState};
use crate::validation::validate;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// Where a validated form goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitRequest {
    pub method: Method,
    pub url: String,
}

impl SubmitRequest {
    /// POST for a new entity, PUT to `<collection>/<id>` for an existing one.
    pub fn for_entity(collection_url: &str, id: Option<u64>) -> Self {
        let base = collection_url.trim_end_matches('/');
        match id {
            Some(id) => Self {
                method: Method::Put,
                url: format!("{base}/{id}"),
            },
            None => Self {
                method: Method::Post,
                url: base.to_string(),
            },
        }
    }
}

/// Failure reported by the network-send collaborator. Rendered as one
/// generic message followed by the raw status and detail text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("request failed{}", describe(.status, .detail))]
pub struct SendError {
    pub status: Option<u16>,
    pub detail: Option<String>,
}

impl SendError {
    pub fn new(status: Option<u16>, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            status,
            detail: (!detail.is_empty()).then_some(detail),
        }
    }
}

fn describe(status: &Option<u16>, detail: &Option<String>) -> String {
    let mut out = String::new();
    if let Some(status) = status {
        out.push_str(&format!(" (status {status})"));
    }
    if let Some(detail) = detail {
        out.push_str(&format!(": {detail}"));
    }
    out
}

#[async_trait::async_trait]
pub trait Sender: Send + Sync {
    async fn send(&self, method: Method, url: &str, body: Value) -> Result<Value, SendError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Validation failed; nothing was sent.
    Invalid(ErrorMap),
    /// The collaborator accepted the body and returned this response.
    Accepted(Value),
}

/// Validate `state` and, when clean, send `dataToSubmit` as the body.
pub async fn submit<S>(
    registry: &ProviderRegistry,
    state: &FormState,
    sender: &S,
    request: &SubmitRequest,
) -> Result<SubmitOutcome, SendError>
where
    S: Sender + ?Sized,
{
    let errors = validate(registry, state);
    if !errors.is_empty() {
        info!(errors = errors.len(), "submission blocked by validation");
        return Ok(SubmitOutcome::Invalid(errors));
    }

    let body = state.data_to_submit.to_value();
    match sender.send(request.method, &request.url, body).await {
        Ok(response) => {
            info!(method = %request.method, url = %request.url, "form submitted");
            Ok(SubmitOutcome::Accepted(response))
        }
        Err(err) => {
            warn!(method = %request.method, url = %request.url, "{err}");
            Err(err)
        }
    }
}
