//! Card-swap rejection rules.
//!
//! A swap is checked on the post-write loadout together with the list of
//! slots that were written:
//! - no written card may share its card id with another slot of the same set;
//! - a written unique card may not share its base identity with any other card
//!   of the loadout;
//! - no memory set may hold more customized slots than the budget allows.

use std::fmt;

use crate::catalog::CardCatalog;
use crate::loadout::{CardId, Loadout, SlotTarget};

/// Why a swap was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// A written card already sits in another slot of the same set.
    DuplicateInSet {
        target: SlotTarget,
        card: CardId,
    },
    /// A written unique card collides with another card's base identity.
    UniqueConflict {
        target: SlotTarget,
        base: String,
    },
    /// A memory set exceeds the customization budget.
    OverBudget {
        group_index: usize,
        count: usize,
        limit: usize,
    },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateInSet { target, card } => {
                write!(f, "card {card} at {target} duplicates a card in its set")
            }
            Self::UniqueConflict { target, base } => {
                write!(f, "unique card {base} at {target} appears twice")
            }
            Self::OverBudget {
                group_index,
                count,
                limit,
            } => write!(
                f,
                "set {group_index} has {count} customizations (limit {limit})"
            ),
        }
    }
}

/// Checks a post-write loadout against the swap rules.
pub fn check_swap(
    loadout: &Loadout,
    written: &[SlotTarget],
    customization_limit: usize,
    catalog: &dyn CardCatalog,
) -> Result<(), Rejection> {
    for &target in written {
        let Some(card) = loadout.card(target) else {
            continue;
        };
        let duplicate = loadout.memory_sets[target.group_index]
            .occupied()
            .any(|(slot, other, _)| slot != target.slot_index && other == card);
        if duplicate {
            return Err(Rejection::DuplicateInSet {
                target,
                card: card.clone(),
            });
        }
    }

    for &target in written {
        let Some(card) = loadout.card(target) else {
            continue;
        };
        if !catalog.is_unique(card) {
            continue;
        }
        let base = catalog.base_identity(card);
        let conflict = loadout
            .cards()
            .any(|(at, other)| at != target && catalog.base_identity(other) == base);
        if conflict {
            return Err(Rejection::UniqueConflict {
                target,
                base: base.to_string(),
            });
        }
    }

    for (group_index, set) in loadout.memory_sets.iter().enumerate() {
        let count = set.customization_count();
        if count > customization_limit {
            return Err(Rejection::OverBudget {
                group_index,
                count,
                limit: customization_limit,
            });
        }
    }

    Ok(())
}
