//! Canonical variant identity.
//!
//! A [`VariantKey`] hashes, per memory set, the sorted multiset of
//! `(card, customization)` pairs plus the item sequence. Which physical slot
//! a card sits in does not contribute, so two loadouts that differ only by a
//! slot permutation inside a set share a key.

use std::collections::HashSet;
use std::fmt;

use blake3::Hasher;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::loadout::{Customization, Loadout};

/// Stable, order-independent identity of a loadout variant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantKey([u8; 32]);

fn write_str(h: &mut Hasher, s: &str) {
    h.update(&(s.len() as u64).to_le_bytes());
    h.update(s.as_bytes());
}

impl VariantKey {
    /// Computes the key of a loadout.
    #[must_use]
    pub fn of(loadout: &Loadout) -> Self {
        let mut h = Hasher::new();
        h.update(b"deckexplorer/variant/v1");

        for set in &loadout.memory_sets {
            let mut pairs: Vec<(&str, Customization)> = set
                .occupied()
                .map(|(_, card, custom)| (card.as_str(), custom.canonical()))
                .collect();
            pairs.sort();

            h.update(&(pairs.len() as u64).to_le_bytes());
            for (card, custom) in &pairs {
                write_str(&mut h, card);
                let entries: Vec<_> = custom.entries().collect();
                h.update(&(entries.len() as u64).to_le_bytes());
                for (name, level) in entries {
                    write_str(&mut h, name);
                    h.update(&level.to_le_bytes());
                }
            }
        }

        h.update(&(loadout.item_ids.len() as u64).to_le_bytes());
        for item in &loadout.item_ids {
            match item {
                Some(id) => {
                    h.update(&[1]);
                    write_str(&mut h, id.as_str());
                }
                None => {
                    h.update(&[0]);
                }
            }
        }

        Self(*h.finalize().as_bytes())
    }

    /// Raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering (64 chars).
    #[must_use]
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }

    /// Parses a key from its hex rendering.
    pub fn from_hex(s: &str) -> Option<Self> {
        blake3::Hash::from_hex(s).ok().map(|h| Self(*h.as_bytes()))
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VariantKey({})", &self.to_hex()[..12])
    }
}

impl Serialize for VariantKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for VariantKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).ok_or_else(|| de::Error::custom(format!("invalid variant key: {s}")))
    }
}

/// Remembers keys already seen in one generation pass.
#[derive(Debug, Default, Clone)]
pub struct Deduplicator {
    seen: HashSet<VariantKey>,
}

impl Deduplicator {
    /// Creates an empty deduplicator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `key`; returns false if it was already present.
    pub fn insert(&mut self, key: VariantKey) -> bool {
        self.seen.insert(key)
    }

    /// True if `key` was recorded.
    #[must_use]
    pub fn contains(&self, key: &VariantKey) -> bool {
        self.seen.contains(key)
    }

    /// Number of distinct keys recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// True if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Keeps the first item of every key, preserving order.
    pub fn retain_unique<T>(&mut self, items: Vec<T>, key: impl Fn(&T) -> VariantKey) -> Vec<T> {
        items.into_iter().filter(|item| self.insert(key(item))).collect()
    }
}
