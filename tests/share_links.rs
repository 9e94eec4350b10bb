use deckexplorer::share::{explorer_url, loadout_from_query, loadout_to_query, DEFAULT_BASE_URL};
use deckexplorer::{CardId, Customization, Loadout, LoadoutRecord, MemorySet, ShareError};

fn loadout() -> Loadout {
    let mut loadout = Loadout::new()
        .with_items([Some("p_item_hajime"), Some("p_item_2"), None])
        .with_memory_set(0, MemorySet::from_cards([Some("hski-ssr"), Some("sup-1"), Some("c_ssr+"), Some("c_r#1"), None, None]))
        .with_memory_set(1, MemorySet::from_cards([Some("hski-sr"), Some("sup-2"), None, Some("c_sr"), None, Some("c_n")]));
    loadout.stage_id = Some("contest-season-14:stage-3".to_string());
    loadout.support_bonus = 0.035;
    loadout.params = [1500, 1320, 990, 52];
    loadout.memory_sets[1].customizations[3] = Customization::new().with("retain", 1).with("cost", 0);
    loadout
}

#[test]
fn shared_url_reproduces_the_loadout() {
    let loadout = loadout();
    let url = explorer_url(DEFAULT_BASE_URL, &loadout);
    let query = url.split_once('?').map(|(_, q)| q).unwrap();

    let parsed = loadout_from_query(query).unwrap();
    assert_eq!(parsed.stage_id, loadout.stage_id);
    assert_eq!(parsed.item_ids, loadout.item_ids);
    assert_eq!(parsed.memory_sets[0].cards, loadout.memory_sets[0].cards);
    assert_eq!(parsed.memory_sets[1].cards[5], Some(CardId::new("c_n")));
    // Zero-level entries are dropped on the way out.
    assert_eq!(
        parsed.memory_sets[1].customizations[3],
        Customization::new().with("retain", 1)
    );
    assert_eq!(parsed.params, loadout.params);
}

#[test]
fn shared_loadout_converts_to_a_record() {
    let parsed = loadout_from_query(&loadout_to_query(&loadout())).unwrap();
    let record = LoadoutRecord::from(&parsed);
    assert_eq!(record.item_ids[0].as_deref(), Some("p_item_hajime"));
    assert_eq!(record.stage_id.as_deref(), Some("contest-season-14:stage-3"));
}

#[test]
fn foreign_links_fail_softly() {
    let incomplete = [
        "",
        "?",
        "utm_source=x&utm_medium=y",
        "stage=s1&cards=a",
    ];
    for query in incomplete {
        assert!(
            matches!(loadout_from_query(query), Err(ShareError::IncompleteConfiguration { .. })),
            "{query}"
        );
    }

    let malformed = [
        "stage=s1&items=a&cards=b&support_bonus=NaN",
        "stage=s1&items=a&cards=b&params=-1,2,3,4",
        "stage=%3Cscript%3E&items=a&cards=b",
        "stage=s1&items=a&cards=b&customizations=%5B%5B%7B%22x%22%3A-1%7D%5D%5D",
    ];
    for query in malformed {
        assert!(matches!(loadout_from_query(query), Err(ShareError::Malformed { .. })), "{query}");
    }
}
