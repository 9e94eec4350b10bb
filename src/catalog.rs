//! Card catalog seam.
//!
//! The card database lives outside this crate. The search only needs to know
//! which cards are unique (at most one copy of their base identity per
//! loadout), so that is all the trait asks for.

use std::collections::HashSet;

use crate::loadout::CardId;

/// Card metadata consulted by the card-swap search.
pub trait CardCatalog: Send + Sync {
    /// True if at most one card with this card's base identity may appear in a loadout.
    fn is_unique(&self, card: &CardId) -> bool;

    /// Identity used for the uniqueness rule.
    fn base_identity<'a>(&self, card: &'a CardId) -> &'a str {
        card.base_identity()
    }
}

/// A fixed catalog built from a list of unique base identities.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    unique_bases: HashSet<String>,
    all_unique: bool,
}

impl StaticCatalog {
    /// A catalog in which no card is unique.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog in which every card is unique.
    #[must_use]
    pub fn all_unique() -> Self {
        Self {
            unique_bases: HashSet::new(),
            all_unique: true,
        }
    }

    /// Marks a base identity as unique.
    #[must_use]
    pub fn with_unique(mut self, base: impl Into<String>) -> Self {
        self.unique_bases.insert(base.into());
        self
    }
}

impl FromIterator<String> for StaticCatalog {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            unique_bases: iter.into_iter().collect(),
            all_unique: false,
        }
    }
}

impl CardCatalog for StaticCatalog {
    fn is_unique(&self, card: &CardId) -> bool {
        self.all_unique || self.unique_bases.contains(self.base_identity(card))
    }
}
