//! Canonical loadout types.
//!
//! A [`Loadout`] is the full equipment/card configuration handed to the
//! simulator: three item slots and two memory sets of six card slots, each
//! card slot paired with its customization record.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Current version of the canonical loadout shape.
pub const LOADOUT_SCHEMA_VERSION: u32 = 2;

/// Number of item slots in a loadout.
pub const ITEM_SLOTS: usize = 3;

/// Number of memory sets in a loadout.
pub const MEMORY_SETS: usize = 2;

/// Number of card slots in each memory set.
pub const CARD_SLOTS: usize = 6;

/// Slots `0..FIXED_SLOTS` of every memory set hold idol/support cards.
///
/// They are never replaced by the card-swap search and never count against
/// the customization budget.
pub const FIXED_SLOTS: usize = 2;

/// Number of loadout parameters (vocal, dance, visual, stamina).
pub const PARAM_COUNT: usize = 4;

/// Identifier of an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Creates an item identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a card.
///
/// A card id may carry a variant suffix: anything after the first `#`, and
/// any trailing `+` upgrade markers. Both are stripped by
/// [`CardId::base_identity`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    /// Creates a card identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the card's identity without any variant suffix.
    ///
    /// ```
    /// use deckexplorer::CardId;
    ///
    /// assert_eq!(CardId::new("sense_ssr_3+").base_identity(), "sense_ssr_3");
    /// assert_eq!(CardId::new("sense_ssr_3#c2").base_identity(), "sense_ssr_3");
    /// assert_eq!(CardId::new("sense_ssr_3").base_identity(), "sense_ssr_3");
    /// ```
    #[must_use]
    pub fn base_identity(&self) -> &str {
        let head = self.0.split('#').next().unwrap_or_default();
        head.trim_end_matches('+')
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structured customization attached to a card slot: attribute name to level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Customization(BTreeMap<String, u32>);

impl Customization {
    /// Creates an empty customization.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with `name` set to `level`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, level: u32) -> Self {
        self.0.insert(name.into(), level);
        self
    }

    /// True when no attribute has a positive level.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(|&level| level == 0)
    }

    /// Attributes with a positive level, in name order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.0
            .iter()
            .filter(|(_, level)| **level > 0)
            .map(|(name, &level)| (name.as_str(), level))
    }

    /// The structural form used for comparison: zero levels removed.
    #[must_use]
    pub fn canonical(&self) -> Self {
        Self(
            self.entries()
                .map(|(name, level)| (name.to_string(), level))
                .collect(),
        )
    }
}

/// Identifies one card slot of a loadout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotTarget {
    /// Memory set index.
    pub group_index: usize,
    /// Card slot index within the set.
    pub slot_index: usize,
}

impl SlotTarget {
    /// Creates a slot target.
    #[must_use]
    pub const fn new(group_index: usize, slot_index: usize) -> Self {
        Self {
            group_index,
            slot_index,
        }
    }
}

impl fmt::Display for SlotTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_index, self.slot_index)
    }
}

/// A user-supplied substitute card for the card-swap search.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardCandidate {
    /// Card to write.
    pub card_id: CardId,
    /// Customization written alongside the card.
    #[serde(default)]
    pub customization: Customization,
}

impl CardCandidate {
    /// Creates a candidate without customization.
    #[must_use]
    pub fn new(card_id: impl Into<String>) -> Self {
        Self {
            card_id: CardId::new(card_id),
            customization: Customization::new(),
        }
    }

    /// Creates a candidate with a customization.
    #[must_use]
    pub fn customized(card_id: impl Into<String>, customization: Customization) -> Self {
        Self {
            card_id: CardId::new(card_id),
            customization,
        }
    }
}

/// One memory set: six card slots and their index-aligned customizations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySet {
    /// Card in each slot.
    pub cards: [Option<CardId>; CARD_SLOTS],
    /// Customization of each slot.
    pub customizations: [Customization; CARD_SLOTS],
}

impl MemorySet {
    /// Builds a set from card ids; `None` marks an empty slot.
    #[must_use]
    pub fn from_cards(cards: [Option<&str>; CARD_SLOTS]) -> Self {
        Self {
            cards: cards.map(|c| c.map(CardId::new)),
            customizations: Default::default(),
        }
    }

    /// Number of customized slots among the replaceable ones.
    #[must_use]
    pub fn customization_count(&self) -> usize {
        self.customizations[FIXED_SLOTS..]
            .iter()
            .filter(|c| !c.is_empty())
            .count()
    }

    /// Occupied slots as `(slot_index, card, customization)`.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &CardId, &Customization)> + '_ {
        self.cards
            .iter()
            .zip(self.customizations.iter())
            .enumerate()
            .filter_map(|(slot, (card, custom))| card.as_ref().map(|card| (slot, card, custom)))
    }
}

/// The canonical, versioned loadout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loadout {
    /// Stage the loadout is tuned for.
    pub stage_id: Option<String>,
    /// Support bonus as a fraction (0.04 = 4%).
    pub support_bonus: f64,
    /// Vocal, dance, visual and stamina values.
    pub params: [u32; PARAM_COUNT],
    /// Item slots.
    pub item_ids: [Option<ItemId>; ITEM_SLOTS],
    /// Memory sets.
    pub memory_sets: [MemorySet; MEMORY_SETS],
}

impl Default for Loadout {
    fn default() -> Self {
        Self {
            stage_id: None,
            support_bonus: 0.0,
            params: [0; PARAM_COUNT],
            item_ids: Default::default(),
            memory_sets: Default::default(),
        }
    }
}

impl Loadout {
    /// Creates an empty loadout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with the given item slots.
    #[must_use]
    pub fn with_items(mut self, items: [Option<&str>; ITEM_SLOTS]) -> Self {
        self.item_ids = items.map(|i| i.map(ItemId::new));
        self
    }

    /// Returns a copy with the given memory set at `index`.
    #[must_use]
    pub fn with_memory_set(mut self, index: usize, set: MemorySet) -> Self {
        if let Some(slot) = self.memory_sets.get_mut(index) {
            *slot = set;
        }
        self
    }

    /// Non-empty item slots in slot order.
    pub fn items(&self) -> impl Iterator<Item = &ItemId> + '_ {
        self.item_ids.iter().flatten()
    }

    /// Card at `target`, if the slot exists and is occupied.
    #[must_use]
    pub fn card(&self, target: SlotTarget) -> Option<&CardId> {
        self.memory_sets
            .get(target.group_index)?
            .cards
            .get(target.slot_index)?
            .as_ref()
    }

    /// Writes a candidate into `target`. Returns false if the slot does not exist.
    pub fn set_card(&mut self, target: SlotTarget, candidate: &CardCandidate) -> bool {
        let Some(set) = self.memory_sets.get_mut(target.group_index) else {
            return false;
        };
        if target.slot_index >= CARD_SLOTS {
            return false;
        }
        set.cards[target.slot_index] = Some(candidate.card_id.clone());
        set.customizations[target.slot_index] = candidate.customization.clone();
        true
    }

    /// Every occupied card slot across all memory sets.
    pub fn cards(&self) -> impl Iterator<Item = (SlotTarget, &CardId)> + '_ {
        self.memory_sets.iter().enumerate().flat_map(|(group, set)| {
            set.occupied()
                .map(move |(slot, card, _)| (SlotTarget::new(group, slot), card))
        })
    }

    /// Customization count of every memory set.
    #[must_use]
    pub fn customization_counts(&self) -> [usize; MEMORY_SETS] {
        [
            self.memory_sets[0].customization_count(),
            self.memory_sets[1].customization_count(),
        ]
    }
}
