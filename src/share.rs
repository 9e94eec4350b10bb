//! Share links.
//!
//! A loadout round-trips through URL query parameters:
//!
//! | param            | value                                              |
//! |------------------|----------------------------------------------------|
//! | `stage`          | stage id                                           |
//! | `support_bonus`  | decimal fraction                                   |
//! | `params`         | four comma-separated integers                      |
//! | `items`          | three comma-separated item ids, empty for none     |
//! | `cards`          | sets separated by `;`, slots by `,`, empty for none |
//! | `customizations` | JSON, one list of slot customizations per set      |
//!
//! Parsing never panics: a link missing `stage`, `items` or `cards` is an
//! incomplete configuration, anything unparsable is malformed.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::ShareError;
use crate::loadout::{CardId, Customization, ItemId, Loadout, CARD_SLOTS, ITEM_SLOTS, MEMORY_SETS, PARAM_COUNT};

/// Host used when no base URL is given.
pub const DEFAULT_BASE_URL: &str = "https://gakumas-tools-kokoro.onrender.com";

/// Path of the explorer page.
pub const EXPLORER_PATH: &str = "/deckexplorer";

static TOKEN: OnceLock<Option<Regex>> = OnceLock::new();

fn valid_token(value: &str) -> bool {
    TOKEN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_.:+#-]{1,128}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}

fn malformed(param: &str, value: &str) -> ShareError {
    ShareError::Malformed {
        param: param.to_string(),
        value: value.to_string(),
    }
}

fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

fn decode_component(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes.get(i + 1..i + 3)?;
                if !hex.iter().all(u8::is_ascii_hexdigit) {
                    return None;
                }
                let hex = std::str::from_utf8(hex).ok()?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).ok()
}

fn join_slots(slots: &[Option<&str>]) -> String {
    slots
        .iter()
        .map(|s| s.unwrap_or(""))
        .collect::<Vec<_>>()
        .join(",")
}

/// Query string (without `?`) describing `loadout`.
///
/// `stage` is always written. A loadout without a stage produces `stage=`,
/// which [`loadout_from_query`] reports as incomplete.
#[must_use]
pub fn loadout_to_query(loadout: &Loadout) -> String {
    let mut pairs: Vec<(&str, String)> = Vec::with_capacity(6);
    pairs.push(("stage", loadout.stage_id.clone().unwrap_or_default()));
    pairs.push(("support_bonus", loadout.support_bonus.to_string()));
    pairs.push((
        "params",
        loadout.params.iter().map(u32::to_string).collect::<Vec<_>>().join(","),
    ));
    let items: Vec<Option<&str>> = loadout.item_ids.iter().map(|i| i.as_ref().map(ItemId::as_str)).collect();
    pairs.push(("items", join_slots(&items)));
    let sets: Vec<String> = loadout
        .memory_sets
        .iter()
        .map(|set| {
            let cards: Vec<Option<&str>> = set.cards.iter().map(|c| c.as_ref().map(CardId::as_str)).collect();
            join_slots(&cards)
        })
        .collect();
    pairs.push(("cards", sets.join(";")));

    let customized = loadout
        .memory_sets
        .iter()
        .any(|set| set.customizations.iter().any(|c| !c.is_empty()));
    if customized {
        let groups: Vec<Vec<Customization>> = loadout
            .memory_sets
            .iter()
            .map(|set| set.customizations.iter().map(Customization::canonical).collect())
            .collect();
        if let Ok(json) = serde_json::to_string(&groups) {
            pairs.push(("customizations", json));
        }
    }

    pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={}", encode_component(&v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Full explorer link for `loadout` under `base` (no trailing slash needed).
#[must_use]
pub fn explorer_url(base: &str, loadout: &Loadout) -> String {
    format!(
        "{}{EXPLORER_PATH}?{}",
        base.trim_end_matches('/'),
        loadout_to_query(loadout)
    )
}

fn parse_slots<T>(
    param: &str,
    raw: &str,
    max: usize,
    make: impl Fn(&str) -> T,
) -> Result<Vec<Option<T>>, ShareError> {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() > max {
        return Err(malformed(param, raw));
    }
    parts
        .into_iter()
        .map(|part| match part {
            "" => Ok(None),
            id if valid_token(id) => Ok(Some(make(id))),
            id => Err(malformed(param, id)),
        })
        .collect()
}

/// Parses a query string (with or without leading `?`) into a loadout.
pub fn loadout_from_query(query: &str) -> Result<Loadout, ShareError> {
    let mut params: HashMap<String, String> = HashMap::new();
    for pair in query.trim_start_matches('?').split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key).ok_or_else(|| malformed("query", pair))?;
        let value = decode_component(value).ok_or_else(|| malformed(&key, value))?;
        params.insert(key, value);
    }

    let required = |name: &str| {
        params
            .get(name)
            .filter(|v| name != "stage" || !v.is_empty())
            .ok_or_else(|| ShareError::IncompleteConfiguration {
                missing: name.to_string(),
            })
    };
    let stage = required("stage")?;
    let items = required("items")?;
    let cards = required("cards")?;

    if !valid_token(stage) {
        return Err(malformed("stage", stage));
    }

    let mut loadout = Loadout::new();
    loadout.stage_id = Some(stage.clone());

    if let Some(raw) = params.get("support_bonus") {
        loadout.support_bonus = raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| malformed("support_bonus", raw))?;
    }

    if let Some(raw) = params.get("params") {
        let values: Vec<u32> = raw
            .split(',')
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| malformed("params", raw))?;
        loadout.params = <[u32; PARAM_COUNT]>::try_from(values).map_err(|_| malformed("params", raw))?;
    }

    for (slot, item) in loadout
        .item_ids
        .iter_mut()
        .zip(parse_slots("items", items, ITEM_SLOTS, |s| ItemId::new(s))?)
    {
        *slot = item;
    }

    let sets: Vec<&str> = cards.split(';').collect();
    if sets.len() > MEMORY_SETS {
        return Err(malformed("cards", cards));
    }
    for (set, raw) in loadout.memory_sets.iter_mut().zip(sets) {
        for (slot, card) in set
            .cards
            .iter_mut()
            .zip(parse_slots("cards", raw, CARD_SLOTS, |s| CardId::new(s))?)
        {
            *slot = card;
        }
    }

    if let Some(raw) = params.get("customizations") {
        let groups: Vec<Vec<Customization>> =
            serde_json::from_str(raw).map_err(|_| malformed("customizations", raw))?;
        if groups.len() > MEMORY_SETS || groups.iter().any(|g| g.len() > CARD_SLOTS) {
            return Err(malformed("customizations", raw));
        }
        for (set, group) in loadout.memory_sets.iter_mut().zip(groups) {
            for (slot, custom) in set.customizations.iter_mut().zip(group) {
                *slot = custom;
            }
        }
    }

    Ok(loadout)
}
