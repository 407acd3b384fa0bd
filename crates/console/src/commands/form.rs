use std::fs;
use std::path::Path as FsPath;

use color_eyre::{Result, eyre::WrapErr, eyre::bail, eyre::eyre};
use forms::{
    FormAction, FormState, Node, Path, ProviderRegistry, SubmitOutcome, SubmitRequest, reduce,
    submit, validate,
};
use paths::PathContext;
use tracing::{info, warn};

use super::print_json;
use crate::cli::FormCmd;
use crate::config::Config;
use crate::sender::HttpSender;

pub async fn run(cmd: FormCmd, config: &Config, paths: &PathContext) -> Result<()> {
    let registry = ProviderRegistry::builtin();
    match cmd {
        FormCmd::New { provider, changes } => {
            warn_unknown(&registry, &provider);
            let state = registry.blank_form(&provider)?;
            let state = apply_file(&registry, state, changes.as_deref())?;
            print_json(&state)
        }
        FormCmd::Edit {
            provider,
            persisted,
            changes,
        } => {
            warn_unknown(&registry, &provider);
            let record = read_node(&persisted)?;
            let record = forms::set(
                &record,
                &Path::root().key("type"),
                Some(Node::from(provider.as_str())),
            )?;
            let state = registry
                .edit_form(Some(&record))
                .ok_or_else(|| eyre!("no persisted record loaded"))?;
            let state = apply_file(&registry, state, changes.as_deref())?;
            print_json(&state)
        }
        FormCmd::Validate { input } => {
            let state = FormState::new(read_node(&input)?);
            let errors = validate(&registry, &state);
            print_json(&errors)?;
            if !errors.is_empty() {
                bail!("{} invalid field(s)", errors.len());
            }
            Ok(())
        }
        FormCmd::Submit { input, id } => {
            let state = FormState::new(read_node(&input)?);
            let session = super::session::open(paths);
            session.restore()?;
            let Some(auth) = session.authorization() else {
                bail!("not logged in; run `console session login` first");
            };
            let sender = HttpSender::new(Some(auth.access_token), config.accept_invalid_certs)?;
            let request = SubmitRequest::for_entity(&config.providers_url(), id);

            match submit(&registry, &state, &sender, &request).await? {
                SubmitOutcome::Invalid(errors) => {
                    print_json(&errors)?;
                    bail!("{} invalid field(s), nothing sent", errors.len());
                }
                SubmitOutcome::Accepted(response) => {
                    info!(method = %request.method, url = %request.url, "provider saved");
                    print_json(&response)
                }
            }
        }
    }
}

fn warn_unknown(registry: &ProviderRegistry, id: &str) {
    if !registry.contains(id) {
        warn!(id, "unknown provider type, using an empty form");
    }
}

fn read_node(path: &FsPath) -> Result<Node> {
    let data = fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&data).wrap_err_with(|| format!("parsing {}", path.display()))?;
    Ok(Node::from(value))
}

/// Parse a JSON-lines event file. Blank lines and `#` comments are skipped.
fn read_actions(path: &FsPath) -> Result<Vec<(usize, FormAction)>> {
    let data = fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))?;
    data.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(n, line)| {
            serde_json::from_str(line)
                .map(|action| (n, action))
                .wrap_err_with(|| format!("{}:{n}: not a form event", path.display()))
        })
        .collect()
}

fn apply_file(
    registry: &ProviderRegistry,
    state: FormState,
    file: Option<&FsPath>,
) -> Result<FormState> {
    let Some(file) = file else {
        return Ok(state);
    };
    read_actions(file)?
        .into_iter()
        .try_fold(state, |state, (n, action)| {
            reduce(registry, &state, action).wrap_err_with(|| format!("{}:{n}", file.display()))
        })
}
