//! Regeneration history.

use crate::model::GenerationId;
use crate::recorder::GenerationLookup;
use std::collections::HashSet;

/// Reconstructs the version chain ending at `generation_id`, oldest first.
///
/// Returns an empty list when the generation is not a regeneration (or cannot be loaded).
/// Otherwise the list ends with `generation_id` itself and is preceded by every ancestor that
/// could be resolved. A missing ancestor, a lookup error, a repeated id or reaching
/// `max_depth` ancestors ends the walk; whatever was resolved so far is returned.
pub fn build_history(
    generation_id: &GenerationId,
    lookup: &dyn GenerationLookup,
    max_depth: usize,
) -> Vec<GenerationId> {
    let start = match lookup.find_generation(generation_id) {
        Ok(Some(record)) => record,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!("history: failed to load generation {}: {}", generation_id, e);
            return Vec::new();
        }
    };
    let Some(mut next) = start.previous_version_id else {
        return Vec::new();
    };

    let mut chain = vec![generation_id.clone()];
    let mut visited: HashSet<GenerationId> = HashSet::from([generation_id.clone()]);

    loop {
        if chain.len() > max_depth {
            tracing::warn!(
                "history: chain for {} truncated at {} ancestors",
                generation_id,
                max_depth
            );
            break;
        }
        if !visited.insert(next.clone()) {
            tracing::warn!("history: cycle detected at generation {}", next);
            break;
        }
        match lookup.find_generation(&next) {
            Ok(Some(record)) => {
                chain.push(record.id);
                match record.previous_version_id {
                    Some(previous) => next = previous,
                    None => break,
                }
            }
            Ok(None) => {
                tracing::warn!("history: ancestor {} not found", next);
                break;
            }
            Err(e) => {
                tracing::warn!("history: failed to load ancestor {}: {}", next, e);
                break;
            }
        }
    }

    chain.reverse();
    chain
}
