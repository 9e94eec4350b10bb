//! Item-mode generator.

use log::debug;

use crate::combinatorics::Combinations;
use crate::loadout::{ItemId, Loadout, ITEM_SLOTS};

use super::{Variant, VariantOrigin};

/// Item variants beyond this many are dropped before scoring.
pub const ITEM_VARIANT_CAP: usize = 64;

/// Enumerates item assignments around the first occupied slot.
///
/// The first non-empty current item is fixed. The remaining current items and
/// the candidates form a deduplicated pool (first appearance order, fixed item
/// excluded). For every size `k` from 0 to `occupied - 1`, each size-`k`
/// combination of the pool yields `[fixed, ..combination]`, for a total of
/// sum over k of C(pool, k) variants. With no current item nothing is produced.
#[must_use]
pub fn item_combinations(current: &[Option<ItemId>], candidates: &[Option<ItemId>]) -> Vec<Vec<ItemId>> {
    let Some(fixed) = current.iter().flatten().next() else {
        return Vec::new();
    };
    let occupied = current.iter().flatten().count();

    let mut usable: Vec<&ItemId> = Vec::new();
    for id in current.iter().flatten().chain(candidates.iter().flatten()) {
        if id != fixed && !usable.contains(&id) {
            usable.push(id);
        }
    }

    let mut results = Vec::new();
    for k in 0..=usable.len().min(occupied - 1) {
        for combo in Combinations::new(usable.len(), k) {
            let mut items = Vec::with_capacity(k + 1);
            items.push(fixed.clone());
            items.extend(combo.into_iter().map(|i| usable[i].clone()));
            results.push(items);
        }
    }
    results
}

/// Item variants of `base`, capped at [`ITEM_VARIANT_CAP`].
///
/// The cap keeps the first variants in generation order.
#[must_use]
pub fn item_variants(base: &Loadout, candidates: &[Option<ItemId>]) -> Vec<Variant> {
    let combos = item_combinations(&base.item_ids, candidates);
    if combos.len() > ITEM_VARIANT_CAP {
        debug!(
            "item combinations truncated from {} to {}",
            combos.len(),
            ITEM_VARIANT_CAP
        );
    }

    combos
        .into_iter()
        .take(ITEM_VARIANT_CAP)
        .map(|items| {
            let mut loadout = base.clone();
            loadout.item_ids = Default::default();
            for (slot, id) in loadout.item_ids.iter_mut().zip(items.iter().take(ITEM_SLOTS)) {
                *slot = Some(id.clone());
            }
            Variant::new(loadout, VariantOrigin::Items { items })
        })
        .collect()
}
