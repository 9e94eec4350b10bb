//! Card-swap generator.
//!
//! For each replacement count `k` the generator pairs every size-`k`
//! combination of target slots with every size-`k` permutation of the
//! candidate cards. The slot set is a combination because only which slots
//! are touched matters; the card order is a permutation because it decides
//! which card lands in which slot.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::catalog::CardCatalog;
use crate::combinatorics::{binomial, permutation_count, Combinations, Permutations};
use crate::error::ValidationError;
use crate::key::Deduplicator;
use crate::loadout::{CardCandidate, Loadout, SlotTarget, CARD_SLOTS, FIXED_SLOTS, MEMORY_SETS};

use super::constraints::{check_swap, Rejection};
use super::{Variant, VariantOrigin, MAX_CARD_CANDIDATES};

/// Raw swap counts above this are rejected before enumeration.
pub const MAX_RAW_SWAP_VARIANTS: u64 = 50_000;

/// Settings for one card-swap generation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSwapSettings {
    /// How many trailing slots of each set are eligible (2..=4).
    pub target_slot_count: usize,
    /// Maximum customized slots per memory set.
    pub customization_limit: usize,
}

impl Default for CardSwapSettings {
    fn default() -> Self {
        Self {
            target_slot_count: 2,
            customization_limit: 1,
        }
    }
}

/// Counters describing one generation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapStats {
    /// Variants enumerated before filtering (baseline excluded).
    pub raw: u64,
    /// Rejected for a duplicate card within a set.
    pub rejected_duplicate: u64,
    /// Rejected for a unique-card collision.
    pub rejected_unique: u64,
    /// Rejected for exceeding the customization budget.
    pub rejected_budget: u64,
    /// Dropped because an equivalent variant was already emitted.
    pub deduplicated: u64,
}

impl SwapStats {
    fn record(&mut self, rejection: &Rejection) {
        match rejection {
            Rejection::DuplicateInSet { .. } => self.rejected_duplicate += 1,
            Rejection::UniqueConflict { .. } => self.rejected_unique += 1,
            Rejection::OverBudget { .. } => self.rejected_budget += 1,
        }
    }
}

/// Output of [`card_swap_variants`].
#[derive(Debug, Clone)]
pub struct CardSwapOutcome {
    /// Baseline first, then surviving swaps in generation order.
    pub variants: Vec<Variant>,
    /// Pass counters.
    pub stats: SwapStats,
}

/// Eligible slots: the last `target_slot_count` replaceable slots of every set.
#[must_use]
pub fn target_slots(target_slot_count: usize) -> Vec<SlotTarget> {
    let count = target_slot_count.min(CARD_SLOTS - FIXED_SLOTS);
    (0..MEMORY_SETS)
        .flat_map(|group| (CARD_SLOTS - count..CARD_SLOTS).map(move |slot| SlotTarget::new(group, slot)))
        .collect()
}

/// Number of raw swaps: sum over k of C(targets, k) * P(candidates, k).
#[must_use]
pub fn raw_swap_count(targets: usize, candidates: usize) -> Option<u64> {
    (1..=targets.min(candidates)).try_fold(0u64, |acc, k| {
        let term = binomial(targets, k)?.checked_mul(permutation_count(candidates, k)?)?;
        acc.checked_add(term)
    })
}

fn validate(settings: &CardSwapSettings, candidates: &[CardCandidate]) -> Result<usize, ValidationError> {
    if !(2..=4).contains(&settings.target_slot_count) {
        return Err(ValidationError::InvalidConfig {
            field: "target_slot_count".to_string(),
            reason: format!("must be 2..=4 (got {})", settings.target_slot_count),
        });
    }
    if candidates.len() > MAX_CARD_CANDIDATES {
        return Err(ValidationError::TooManyCandidates {
            kind: "card".to_string(),
            max: MAX_CARD_CANDIDATES,
            actual: candidates.len(),
        });
    }
    let targets = settings.target_slot_count * MEMORY_SETS;
    let raw = raw_swap_count(targets, candidates.len()).unwrap_or(u64::MAX);
    if raw > MAX_RAW_SWAP_VARIANTS {
        return Err(ValidationError::SearchSpaceTooLarge {
            raw,
            max: MAX_RAW_SWAP_VARIANTS,
        });
    }
    Ok(targets)
}

fn check_base_budget(base: &Loadout, limit: usize) -> Result<(), ValidationError> {
    for (group_index, count) in base.customization_counts().into_iter().enumerate() {
        if count > limit {
            return Err(ValidationError::BaseOverBudget {
                group_index,
                count,
                limit,
            });
        }
    }
    Ok(())
}

/// Generates card-swap variants of `base`.
///
/// The baseline is always the first variant. Swaps failing [`check_swap`]
/// are dropped, as are swaps whose key matches an earlier variant. A base
/// already over the customization budget is rejected up front.
pub fn card_swap_variants(
    base: &Loadout,
    candidates: &[CardCandidate],
    settings: &CardSwapSettings,
    catalog: &dyn CardCatalog,
) -> Result<CardSwapOutcome, ValidationError> {
    validate(settings, candidates)?;
    check_base_budget(base, settings.customization_limit)?;
    let targets = target_slots(settings.target_slot_count);

    let mut stats = SwapStats::default();
    let mut dedup = Deduplicator::new();
    let baseline = Variant::baseline(base);
    dedup.insert(baseline.key);
    let mut variants = vec![baseline];

    for k in 1..=candidates.len().min(targets.len()) {
        for slots in Combinations::new(targets.len(), k) {
            for order in Permutations::new(candidates.len(), k) {
                stats.raw += 1;

                let mut loadout = base.clone();
                let assignments: Vec<(SlotTarget, CardCandidate)> = slots
                    .iter()
                    .zip(&order)
                    .map(|(&s, &c)| (targets[s], candidates[c].clone()))
                    .collect();
                for (target, candidate) in &assignments {
                    loadout.set_card(*target, candidate);
                }

                let written: Vec<SlotTarget> = assignments.iter().map(|(t, _)| *t).collect();
                if let Err(rejection) = check_swap(&loadout, &written, settings.customization_limit, catalog) {
                    stats.record(&rejection);
                    continue;
                }

                let variant = Variant::new(loadout, VariantOrigin::Swap { assignments });
                if !dedup.insert(variant.key) {
                    stats.deduplicated += 1;
                    continue;
                }
                variants.push(variant);
            }
        }
    }

    debug!(
        "card swaps: raw={} kept={} duplicate={} unique={} budget={} dedup={}",
        stats.raw,
        variants.len() - 1,
        stats.rejected_duplicate,
        stats.rejected_unique,
        stats.rejected_budget,
        stats.deduplicated
    );

    Ok(CardSwapOutcome { variants, stats })
}
