//! Loadout records and legacy-shape migration.
//!
//! [`LoadoutRecord`] is the tolerant shape loadouts arrive in (saved records,
//! older clients). Every field is optional; [`normalize`] migrates the legacy
//! `skillCardIdGroups` layout and [`resolve`] turns a record into the canonical
//! [`Loadout`].

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::loadout::{
    CardId, Customization, ItemId, Loadout, MemorySet, CARD_SLOTS, ITEM_SLOTS,
    LOADOUT_SCHEMA_VERSION, MEMORY_SETS, PARAM_COUNT,
};

/// One memory set as stored in a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySetRecord {
    /// Card ids per slot; `null` marks an empty slot.
    #[serde(default)]
    pub cards: Vec<Option<String>>,
}

/// Serialized loadout, possibly in the legacy shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadoutRecord {
    /// Schema version the record was written with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// Stage the loadout was built for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<String>,
    /// Support bonus fraction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_bonus: Option<f64>,
    /// Idol parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<u32>>,
    /// Item slots; `pItemIds` in older records.
    #[serde(default, alias = "pItemIds")]
    pub item_ids: Vec<Option<String>>,
    /// Canonical card layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_sets: Option<Vec<MemorySetRecord>>,
    /// Legacy card layout: one list of card ids per set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_card_id_groups: Option<Vec<Vec<Option<String>>>>,
    /// Customizations, index-aligned with the card slots of each set.
    #[serde(default)]
    pub customization_groups: Vec<Vec<Customization>>,
}

/// Migrates a legacy record to the canonical shape.
///
/// When `memory_sets` is absent and `skill_card_id_groups` is present the
/// sets are built from the groups; any other record is returned unchanged.
/// `normalize(normalize(r)) == normalize(r)` for every record.
#[must_use]
pub fn normalize(mut record: LoadoutRecord) -> LoadoutRecord {
    if record.memory_sets.is_none() {
        if let Some(groups) = &record.skill_card_id_groups {
            record.memory_sets = Some(
                groups
                    .iter()
                    .map(|cards| MemorySetRecord {
                        cards: cards.clone(),
                    })
                    .collect(),
            );
        }
    }
    record
}

/// Converts a record into a [`Loadout`], recovering legacy records.
///
/// A record without memory sets is normalized once and converted again; if
/// that still fails the original error is returned.
pub fn resolve(record: &LoadoutRecord) -> Result<Loadout, ValidationError> {
    match Loadout::try_from(record.clone()) {
        Err(ValidationError::MissingMemorySets) => {
            info!("loadout record has no memory sets, migrating legacy card groups");
            Loadout::try_from(normalize(record.clone()))
        }
        other => other,
    }
}

/// Converts a record for item-only exploration.
///
/// Item mode never touches the card slots, so a record without any card
/// layout resolves to empty memory sets instead of failing.
pub fn resolve_items_only(record: &LoadoutRecord) -> Result<Loadout, ValidationError> {
    match resolve(record) {
        Err(ValidationError::MissingMemorySets) => {
            let mut record = record.clone();
            record.memory_sets = Some(Vec::new());
            Loadout::try_from(record)
        }
        other => other,
    }
}

fn check_len(field: &str, actual: usize, expected: usize) -> Result<(), ValidationError> {
    if actual > expected {
        return Err(ValidationError::SlotCountMismatch {
            field: field.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

fn non_blank(id: Option<&String>) -> Option<&str> {
    id.map(String::as_str).filter(|s| !s.trim().is_empty())
}

impl TryFrom<LoadoutRecord> for Loadout {
    type Error = ValidationError;

    fn try_from(record: LoadoutRecord) -> Result<Self, Self::Error> {
        let sets = record.memory_sets.ok_or(ValidationError::MissingMemorySets)?;
        check_len("memorySets", sets.len(), MEMORY_SETS)?;
        check_len("customizationGroups", record.customization_groups.len(), MEMORY_SETS)?;
        check_len("itemIds", record.item_ids.len(), ITEM_SLOTS)?;

        let mut loadout = Self {
            stage_id: record.stage_id,
            support_bonus: record.support_bonus.unwrap_or_default(),
            ..Self::default()
        };

        if let Some(params) = record.params {
            check_len("params", params.len(), PARAM_COUNT)?;
            for (dst, src) in loadout.params.iter_mut().zip(params) {
                *dst = src;
            }
        }

        for (dst, src) in loadout.item_ids.iter_mut().zip(&record.item_ids) {
            *dst = non_blank(src.as_ref()).map(ItemId::new);
        }

        for (index, set) in sets.iter().enumerate() {
            check_len("memorySets.cards", set.cards.len(), CARD_SLOTS)?;
            let dst = &mut loadout.memory_sets[index];
            for (slot, card) in dst.cards.iter_mut().zip(&set.cards) {
                *slot = non_blank(card.as_ref()).map(CardId::new);
            }
        }

        for (index, group) in record.customization_groups.into_iter().enumerate() {
            check_len("customizationGroups", group.len(), CARD_SLOTS)?;
            let dst = &mut loadout.memory_sets[index];
            for (slot, custom) in dst.customizations.iter_mut().zip(group) {
                *slot = custom;
            }
        }

        Ok(loadout)
    }
}

fn card_ids(set: &MemorySet) -> Vec<Option<String>> {
    set.cards
        .iter()
        .map(|c| c.as_ref().map(|c| c.as_str().to_string()))
        .collect()
}

impl From<&Loadout> for LoadoutRecord {
    fn from(loadout: &Loadout) -> Self {
        let groups: Vec<_> = loadout.memory_sets.iter().map(card_ids).collect();
        Self {
            version: Some(LOADOUT_SCHEMA_VERSION),
            stage_id: loadout.stage_id.clone(),
            support_bonus: Some(loadout.support_bonus),
            params: Some(loadout.params.to_vec()),
            item_ids: loadout
                .item_ids
                .iter()
                .map(|i| i.as_ref().map(|i| i.as_str().to_string()))
                .collect(),
            memory_sets: Some(
                groups
                    .iter()
                    .map(|cards| MemorySetRecord {
                        cards: cards.clone(),
                    })
                    .collect(),
            ),
            skill_card_id_groups: Some(groups),
            customization_groups: loadout
                .memory_sets
                .iter()
                .map(|set| set.customizations.to_vec())
                .collect(),
        }
    }
}
