//! Candidate disambiguation.

use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::factory::Factory;
use crate::key::Key;

/// Picks the single factory that satisfies `key` among `candidates`.
///
/// Rules, applied in order, each only when more than one candidate remains:
///
/// 1. a mock always wins
/// 2. when primaries exist, only primaries stay; a single one wins
/// 3. when non-alternatives exist, only non-alternatives stay; a single one wins
/// 4. the unique lowest priority value wins
///
/// Anything still tied is [`DiError::ManyCandidatesFound`].
pub(crate) fn select(key: Key, candidates: &[Arc<Factory>]) -> DiResult<Arc<Factory>> {
    match candidates {
        [] => return Err(DiError::CandidateNotFound(key.display_name())),
        [only] => return Ok(only.clone()),
        _ => {}
    }

    if let Some(mock) = candidates.iter().find(|f| f.is_mock()) {
        return Ok(mock.clone());
    }

    let mut remaining: Vec<&Arc<Factory>> = candidates.iter().collect();

    narrow(&mut remaining, |f| f.is_primary());
    if let [winner] = remaining.as_slice() {
        return Ok((*winner).clone());
    }

    narrow(&mut remaining, |f| !f.is_alternative());
    if let [winner] = remaining.as_slice() {
        return Ok((*winner).clone());
    }

    let lowest = remaining.iter().map(|f| f.priority()).min().unwrap_or_default();
    let mut best = remaining.iter().filter(|f| f.priority() == lowest);
    match (best.next(), best.next()) {
        (Some(winner), None) => Ok((*winner).clone()),
        _ => Err(DiError::ManyCandidatesFound(key.display_name())),
    }
}

/// Keeps the factories matching `keep`, unless none do.
fn narrow(remaining: &mut Vec<&Arc<Factory>>, keep: impl Fn(&Factory) -> bool) {
    if remaining.iter().any(|f| keep(f)) {
        remaining.retain(|f| keep(f));
    }
}
