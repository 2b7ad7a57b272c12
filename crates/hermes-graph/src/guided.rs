//! Interactive seeding of the guided walk, behind a capability.
//!
//! The walker itself is headless; everything a human decides — which scope
//! to start from, which send site, which message instance when propagation
//! came up empty — goes through [`Prompter`]. The binary wires a stdin
//! implementation, tests use scripted ones.

use eyre::{bail, eyre};
use hermes_types::{ir::ModuleSet, CancelToken, MessageMap, SitePair};
use itertools::Itertools;
use tracing::{debug, info};

use crate::walker::walk_message_path;

/// The interactive surface of the guided mode.
pub trait Prompter {
    /// Picks a starting scope out of the candidates.
    fn choose_scope(&mut self, candidates: &[&str]) -> Option<String>;
    /// Picks a send site by index out of the presented choices.
    fn choose_send(&mut self, choices: &[SendChoice<'_>]) -> Option<usize>;
    /// Supplies a message instance when no constant was propagated (or the
    /// caller asked to ignore it).
    fn choose_instance(&mut self) -> Option<i64>;
}

/// What a user sees when picking a send site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendChoice<'a> {
    pub line:         Option<u32>,
    pub carried_type: &'a str,
}

#[derive(Debug, Clone, Default)]
pub struct GuidedConfig {
    /// starting scope, matched exactly first and as a substring second
    pub scope:              Option<String>,
    /// starting send site, by source line
    pub line:               Option<u32>,
    /// discard the propagated constant and ask for an instance instead
    pub ignore_known_value: bool,
}

/// Seeds and runs the guided walk. The chosen pair leads the returned path.
pub fn run_guided<'a>(
    set: &'a ModuleSet,
    mmap: &MessageMap<'a>,
    config: &GuidedConfig,
    prompter: &mut dyn Prompter,
    cancel: &CancelToken,
) -> eyre::Result<Vec<SitePair<'a>>> {
    let scope = select_scope(mmap, config.scope.as_deref(), prompter)
        .ok_or_else(|| eyre!("no starting scope chosen"))?;
    let bucket = mmap.get(&scope).ok_or_else(|| eyre!("scope `{scope}` has no send sites"))?;
    if bucket.is_empty() {
        bail!("scope `{scope}` only receives; nothing to start from");
    }
    info!(%scope, sends = bucket.len(), "guided walk seed");

    let start = select_send(set, bucket, config.line, prompter)
        .ok_or_else(|| eyre!("no starting send chosen"))?;

    let override_value = if start.0.assignment().is_none() || config.ignore_known_value {
        prompter.choose_instance()
    } else {
        None
    };
    debug!(
        carried = %start.0.carried_type,
        assignment = ?start.0.assignment(),
        ?override_value,
        "walking from chosen send"
    );

    Ok(walk_message_path(set, mmap, start, override_value, cancel))
}

/// Exact key match first; otherwise a unique substring match stands on its
/// own and anything else goes back to the prompter alongside the candidates.
fn select_scope(
    mmap: &MessageMap<'_>,
    wanted: Option<&str>,
    prompter: &mut dyn Prompter,
) -> Option<String> {
    if let Some(wanted) = wanted {
        if mmap.contains_key(wanted) {
            return Some(wanted.to_string())
        }
        let candidates: Vec<&str> =
            mmap.keys().map(String::as_str).filter(|key| key.contains(wanted)).collect();
        if let [only] = candidates.as_slice() {
            return Some(only.to_string())
        }
        return prompter.choose_scope(&candidates)
    }
    let all: Vec<&str> = mmap.keys().map(String::as_str).collect();
    prompter.choose_scope(&all)
}

fn select_send<'a, 'b>(
    set: &ModuleSet,
    bucket: &'b [SitePair<'a>],
    line: Option<u32>,
    prompter: &mut dyn Prompter,
) -> Option<SitePair<'a>>
where
    'a: 'b,
{
    if let Some(line) = line {
        return bucket.iter().find(|(send, _)| send.line(set) == Some(line)).copied()
    }
    let choices: Vec<SendChoice<'_>> = bucket
        .iter()
        .map(|(send, _)| SendChoice { line: send.line(set), carried_type: &send.carried_type })
        .collect();
    let picked = prompter.choose_send(&choices)?;
    bucket.get(picked).copied()
}

/// Scopes worth offering as starting points, in map order.
pub fn sending_scopes<'m>(mmap: &'m MessageMap<'_>) -> Vec<&'m str> {
    mmap.iter()
        .filter(|(_, bucket)| !bucket.is_empty())
        .map(|(scope, _)| scope.as_str())
        .unique()
        .collect()
}
