use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use deckexplorer::candidates::{card_swap_variants, raw_swap_count, CardSwapSettings};
use deckexplorer::{
    CardCandidate, Customization, ExplorationInput, ExplorationMode, ExplorationSession, ExplorerConfig,
    ExplorerResult, Loadout, LoadoutRecord, MemorySet, SimulationConfig, SimulationOutcome, StaticCatalog, VariantKey,
};

fn base() -> Loadout {
    let mut loadout = Loadout::new()
        .with_items([Some("p_a"), Some("p_b"), Some("p_c")])
        .with_memory_set(0, MemorySet::from_cards([Some("idol"), Some("sup"), Some("a1"), Some("a2"), Some("a3"), Some("a4")]))
        .with_memory_set(1, MemorySet::from_cards([Some("idol2"), Some("sup2"), Some("b1"), Some("b2"), Some("b3"), Some("b4")]));
    loadout.memory_sets[1].customizations[2] = Customization::new().with("cost", 1);
    loadout
}

fn candidates() -> Vec<CardCandidate> {
    vec![
        CardCandidate::new("x"),
        CardCandidate::customized("y", Customization::new().with("power", 1)),
        CardCandidate::new("z"),
    ]
}

fn bench_card_swaps(c: &mut Criterion) {
    let base = base();
    let candidates = candidates();
    let catalog = StaticCatalog::new().with_unique("z");
    let settings = CardSwapSettings {
        target_slot_count: 4,
        customization_limit: 2,
    };

    let mut group = c.benchmark_group("generate");
    group.throughput(Throughput::Elements(raw_swap_count(8, 3).unwrap_or(0)));
    group.bench_function("card_swaps_t4_c3", |b| {
        b.iter(|| card_swap_variants(&base, &candidates, &settings, &catalog).unwrap());
    });
    group.finish();
}

fn bench_variant_key(c: &mut Criterion) {
    let loadout = base();
    c.bench_function("key/variant_key", |b| b.iter(|| VariantKey::of(&loadout)));
}

fn cheap_simulator(config: &SimulationConfig, _: &str, runs: usize) -> ExplorerResult<SimulationOutcome> {
    let cards = config.loadout.cards().count() as f64;
    Ok(SimulationOutcome::new((0..runs).map(|i| cards + (i % 7) as f64).collect()))
}

fn bench_explore(c: &mut Criterion) {
    let _ = env_logger::builder().is_test(true).try_init();
    let input = ExplorationInput {
        loadout: LoadoutRecord::from(&base()),
        card_candidates: candidates(),
        ..ExplorationInput::default()
    };

    for workers in [1, 4] {
        let config = ExplorerConfig {
            mode: ExplorationMode::Card,
            num_runs: 200,
            target_slot_count: 4,
            customization_limit: 2,
            workers: Some(workers),
            ..ExplorerConfig::default()
        };
        let mut session =
            ExplorationSession::new(config, Arc::new(cheap_simulator), Arc::new(StaticCatalog::new())).unwrap();
        c.bench_function(&format!("session/explore_card_workers_{workers}"), |b| {
            b.iter(|| session.explore(&input).unwrap());
        });
    }
}

criterion_group!(benches, bench_card_swaps, bench_variant_key, bench_explore);
criterion_main!(benches);
