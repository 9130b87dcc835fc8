//! Performance benchmarks for the Markup Engine.
//!
//! Covers the HTTP pricing path and the core functions on tender-sized inputs:
//! - Pricing a single item through `/calculate`
//! - Pricing batches of 10 to 5000 items
//! - Rounding, leaf derivation and redistribution over large batches
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use std::collections::HashMap;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rust_decimal::Decimal;

use markup_engine::api::{AppState, CalculationRequest, create_router};
use markup_engine::calculation::{
    RoundingItem, compute_leaves, evaluate_sequence, redistribute, round_batch,
};
use markup_engine::config::ConfigLoader;
use markup_engine::models::{
    BoqItemType, ClientPosition, ItemWorkCost, SourceRule, TargetCost,
};

use axum::{body::Body, http::Request};
use tower::ServiceExt;

/// Creates a test state with loaded configuration.
fn create_test_state() -> AppState {
    let config = ConfigLoader::load("./config/default").expect("Failed to load config");
    AppState::new(config)
}

/// Creates a calculation request with items cycling through every item type.
fn create_request_with_items(item_count: usize) -> CalculationRequest {
    let items: Vec<serde_json::Value> = BoqItemType::ALL
        .iter()
        .cycle()
        .take(item_count)
        .enumerate()
        .map(|(i, item_type)| {
            serde_json::json!({
                "id": format!("boq_{:05}", i),
                "type": item_type,
                "base_amount": format!("{}.{:02}", 100 + i * 7, i % 100),
                "quantity": (i % 9 + 1).to_string(),
                "client_position_id": format!("pos_{}", i / 10)
            })
        })
        .collect();

    serde_json::from_value(serde_json::json!({ "items": items }))
        .expect("Failed to create request")
}

async fn post_calculate(router: axum::Router, body: String) -> axum::response::Response {
    router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/calculate")
                .header("Content-Type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Benchmark: Single item priced through the API.
fn bench_single_item(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let router = create_router(create_test_state());
    let body = serde_json::to_string(&create_request_with_items(1)).unwrap();

    c.bench_function("single_item", |b| {
        b.to_async(&rt).iter(|| async {
            let response = post_calculate(router.clone(), body.clone()).await;
            black_box(response)
        })
    });
}

/// Benchmark: Batches of items, to understand scaling behavior.
fn bench_scaling(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let state = create_test_state();

    let mut group = c.benchmark_group("scaling");

    for item_count in [10usize, 100, 1000, 5000].iter() {
        let router = create_router(state.clone());
        let body = serde_json::to_string(&create_request_with_items(*item_count)).unwrap();

        group.throughput(Throughput::Elements(*item_count as u64));
        group.bench_with_input(BenchmarkId::new("items", item_count), item_count, |b, _| {
            b.to_async(&rt).iter(|| async {
                let response = post_calculate(router.clone(), body.clone()).await;
                black_box(response)
            })
        });
    }

    group.finish();
}

/// Benchmark: Evaluating the standard material sequence.
fn bench_evaluate_sequence(c: &mut Criterion) {
    let config = ConfigLoader::load("./config/default").expect("Failed to load config");
    let tactic = config.get_tactic("standard").expect("standard tactic");
    let sequence = tactic.sequence(BoqItemType::ComponentWork).expect("sequence");
    let parameters = config.default_parameters().clone();
    let base = Decimal::new(123456, 2);

    c.bench_function("evaluate_sequence", |b| {
        b.iter(|| black_box(evaluate_sequence(black_box(base), sequence, &parameters, 1)))
    });
}

/// Benchmark: Rounding 1000 lines with compensation.
fn bench_round_batch(c: &mut Criterion) {
    let items: Vec<RoundingItem> = (0..1000)
        .map(|i| RoundingItem {
            id: None,
            quantity: Decimal::from(i % 7 + 1),
            total: Decimal::new(1000 + i * 137, 2),
        })
        .collect();

    c.bench_function("round_batch_1000", |b| {
        b.iter(|| {
            black_box(round_batch(
                &items,
                Decimal::new(5, 0),
                Decimal::new(25, 1),
            ).unwrap())
        })
    });
}

/// Benchmark: Leaf derivation over 10000 positions.
fn bench_compute_leaves(c: &mut Criterion) {
    let positions: Vec<ClientPosition> = (0..10_000)
        .map(|i| {
            let number = Decimal::from(i);
            let level = (i % 4 + 1) as i32;
            if i % 11 == 0 {
                ClientPosition::additional(format!("p{}", i), number, level)
            } else {
                ClientPosition::new(format!("p{}", i), number, level)
            }
        })
        .collect();

    c.bench_function("compute_leaves_10000", |b| {
        b.iter(|| black_box(compute_leaves(&positions)))
    });
}

/// Benchmark: Redistribution over 1000 items in 10 categories.
fn bench_redistribute(c: &mut Criterion) {
    let items: Vec<ItemWorkCost> = (0..1000)
        .map(|i| ItemWorkCost {
            item_id: format!("item_{}", i),
            work_cost: Decimal::new(10_000 + i * 31, 2),
        })
        .collect();
    let category_map: HashMap<String, String> = (0..1000)
        .map(|i| (format!("item_{}", i), format!("cat_{}", i % 10)))
        .collect();
    let rules: Vec<SourceRule> = (0..3)
        .map(|i| SourceRule {
            category_id: format!("cat_{}", i),
            percentage: Decimal::new(15, 0),
        })
        .collect();
    let targets: Vec<TargetCost> = (5..10)
        .map(|i| TargetCost {
            category_id: format!("cat_{}", i),
        })
        .collect();

    c.bench_function("redistribute_1000", |b| {
        b.iter(|| black_box(redistribute(&items, &rules, &targets, &category_map)))
    });
}

criterion_group!(
    benches,
    bench_single_item,
    bench_scaling,
    bench_evaluate_sequence,
    bench_round_batch,
    bench_compute_leaves,
    bench_redistribute,
);
criterion_main!(benches);
