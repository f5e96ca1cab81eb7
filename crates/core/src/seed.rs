//! Seed selection for LLM sampling.
//!
//! The model is sampled deterministically from a seed, so a regeneration must use a different
//! seed to get a different draft while staying reproducible.

use crate::model::GenerationId;
use crate::recorder::GenerationLookup;

/// The parts of a request that influence seed choice.
#[derive(Clone, Copy, Debug, Default)]
pub struct SeedRequest<'a> {
    pub seed_override: Option<i64>,
    pub is_regeneration: bool,
    pub previous_version_id: Option<&'a GenerationId>,
}

/// Which rule produced a seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeedSource {
    Override,
    PreviousSeed,
    RegenerationDefault,
    Default,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedChoice {
    pub seed: i64,
    pub source: SeedSource,
}

/// Picks the seed for a generation.
///
/// In priority order: an explicit override; the previous generation's seed plus one; the
/// default plus one for a regeneration whose previous seed cannot be found; the default.
///
/// A previous generation that is missing, has no seed, or cannot be read falls through to the
/// default-plus-one rule. Lookups never fail the generation.
pub fn choose_seed(
    request: &SeedRequest<'_>,
    default_seed: i64,
    lookup: &dyn GenerationLookup,
) -> SeedChoice {
    if let Some(seed) = request.seed_override {
        return SeedChoice {
            seed,
            source: SeedSource::Override,
        };
    }

    if !request.is_regeneration {
        tracing::info!("new generation: using initial seed {}", default_seed);
        return SeedChoice {
            seed: default_seed,
            source: SeedSource::Default,
        };
    }

    if let Some(previous_id) = request.previous_version_id {
        match lookup.find_generation(previous_id) {
            Ok(Some(previous)) => {
                if let Some(previous_seed) = previous.seed {
                    let seed = previous_seed.wrapping_add(1);
                    tracing::info!(
                        "regeneration: incrementing seed from {} to {}",
                        previous_seed,
                        seed
                    );
                    return SeedChoice {
                        seed,
                        source: SeedSource::PreviousSeed,
                    };
                }
                tracing::warn!("regeneration: previous generation {} has no seed", previous_id);
            }
            Ok(None) => {
                tracing::warn!("regeneration: previous generation {} not found", previous_id);
            }
            Err(e) => {
                tracing::warn!(
                    "regeneration: failed to load previous generation {}: {}",
                    previous_id,
                    e
                );
            }
        }
    }

    let seed = default_seed.wrapping_add(1);
    tracing::info!("regeneration without previous seed: using default + 1: {}", seed);
    SeedChoice {
        seed,
        source: SeedSource::RegenerationDefault,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GenerationRecord;
    use crate::store::test_support::generation;
    use crate::store::{AuditStore, MemoryStore};
    use crate::{AuditError, AuditResult};

    struct FailingLookup;

    impl GenerationLookup for FailingLookup {
        fn find_generation(&self, _: &GenerationId) -> AuditResult<Option<GenerationRecord>> {
            Err(AuditError::RecordRead(std::io::Error::other("disk unavailable")))
        }
    }

    #[test]
    fn test_override_wins() {
        let store = MemoryStore::new();
        let previous = generation(None, Some(7));
        store.put_generation(&previous).unwrap();

        let choice = choose_seed(
            &SeedRequest {
                seed_override: Some(1234),
                is_regeneration: true,
                previous_version_id: Some(&previous.id),
            },
            42,
            &store,
        );
        assert_eq!(choice.seed, 1234);
        assert_eq!(choice.source, SeedSource::Override);
    }

    #[test]
    fn test_fresh_generation_uses_default() {
        let choice = choose_seed(&SeedRequest::default(), 42, &MemoryStore::new());
        assert_eq!(choice.seed, 42);
        assert_eq!(choice.source, SeedSource::Default);
    }

    #[test]
    fn test_regeneration_increments_previous_seed() {
        let store = MemoryStore::new();
        let previous = generation(None, Some(43));
        store.put_generation(&previous).unwrap();

        let choice = choose_seed(
            &SeedRequest {
                seed_override: None,
                is_regeneration: true,
                previous_version_id: Some(&previous.id),
            },
            42,
            &store,
        );
        assert_eq!(choice.seed, 44);
        assert_eq!(choice.source, SeedSource::PreviousSeed);
    }

    #[test]
    fn test_previous_id_without_regeneration_flag_is_fresh() {
        let store = MemoryStore::new();
        let previous = generation(None, Some(43));
        store.put_generation(&previous).unwrap();

        let choice = choose_seed(
            &SeedRequest {
                seed_override: None,
                is_regeneration: false,
                previous_version_id: Some(&previous.id),
            },
            42,
            &store,
        );
        assert_eq!(choice.seed, 42);
    }

    #[test]
    fn test_unresolvable_previous_falls_back_to_default_plus_one() {
        let store = MemoryStore::new();
        let missing = GenerationId::new();
        let unseeded = generation(None, None);
        store.put_generation(&unseeded).unwrap();

        for previous in [Some(&missing), Some(&unseeded.id), None] {
            let choice = choose_seed(
                &SeedRequest {
                    seed_override: None,
                    is_regeneration: true,
                    previous_version_id: previous,
                },
                42,
                &store,
            );
            assert_eq!(choice.seed, 43);
            assert_eq!(choice.source, SeedSource::RegenerationDefault);
        }

        let choice = choose_seed(
            &SeedRequest {
                seed_override: None,
                is_regeneration: true,
                previous_version_id: Some(&missing),
            },
            42,
            &FailingLookup,
        );
        assert_eq!(choice.seed, 43);
    }
}
