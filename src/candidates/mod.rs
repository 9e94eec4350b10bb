//! Candidate generation.
//!
//! Two independent generators produce the variants a session scores:
//! - [`items`]: item-slot combinations around a fixed first item.
//! - [`cards`]: card swaps into trailing memory-set slots, filtered by the
//!   rules in [`constraints`].

pub mod cards;
pub mod constraints;
pub mod items;

pub use cards::{card_swap_variants, raw_swap_count, target_slots, CardSwapOutcome, CardSwapSettings, SwapStats};
pub use constraints::{check_swap, Rejection};
pub use items::{item_combinations, item_variants, ITEM_VARIANT_CAP};

use serde::{Deserialize, Serialize};

use crate::key::VariantKey;
use crate::loadout::{CardCandidate, ItemId, Loadout, SlotTarget};

/// Maximum number of item candidates accepted by the item generator.
pub const MAX_ITEM_CANDIDATES: usize = 3;

/// Maximum number of card candidates accepted by the card-swap generator.
pub const MAX_CARD_CANDIDATES: usize = 3;

/// How a variant was derived from the base loadout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VariantOrigin {
    /// The unmodified base loadout.
    Baseline,
    /// An item-slot assignment, fixed item first.
    Items {
        items: Vec<ItemId>,
    },
    /// Cards written into specific slots.
    Swap {
        assignments: Vec<(SlotTarget, CardCandidate)>,
    },
}

/// A fully materialized loadout pending scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// The materialized loadout.
    pub loadout: Loadout,
    /// Canonical identity of `loadout`.
    pub key: VariantKey,
    /// How the variant was produced.
    pub origin: VariantOrigin,
}

impl Variant {
    /// Wraps a loadout, computing its key.
    #[must_use]
    pub fn new(loadout: Loadout, origin: VariantOrigin) -> Self {
        let key = VariantKey::of(&loadout);
        Self { loadout, key, origin }
    }

    /// The base loadout as a variant.
    #[must_use]
    pub fn baseline(loadout: &Loadout) -> Self {
        Self::new(loadout.clone(), VariantOrigin::Baseline)
    }

    /// True for the unmodified base loadout.
    #[must_use]
    pub const fn is_baseline(&self) -> bool {
        matches!(self.origin, VariantOrigin::Baseline)
    }
}
