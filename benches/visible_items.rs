use criterion::{black_box, criterion_group, criterion_main, Criterion};
use query_history::controller::{derive_visible_items, Filter, SelectionState};
use query_history::history::{HistoryCollection, HistoryItem};

fn create_history(count: usize) -> HistoryCollection {
    let shapes = [
        "query Users { users { id name email } }",
        "{ posts(first: 10) { id title author { name } } }",
        "mutation CreatePost($title: String!) { createPost(title: $title) { id } }",
        "query Search($term: String) { search(term: $term) { __typename } }",
        "subscription OnComment { commentAdded { id body } }",
    ];

    HistoryCollection::from_items((0..count).map(|i| {
        HistoryItem::new(
            format!("item-{}", i),
            format!("# run {}\n{}", i, shapes[i % shapes.len()]),
            i % 7 == 0,
        )
    }))
}

fn bench_visible_items(c: &mut Criterion) {
    let items = create_history(1000);

    let all = SelectionState::initialize(&items);
    c.bench_function("visible_items_all_no_search", |b| {
        b.iter(|| derive_visible_items(black_box(&items), black_box(&all)).len())
    });

    let searching = SelectionState {
        search_term: "POST".to_string(),
        ..SelectionState::initialize(&items)
    };
    c.bench_function("visible_items_search", |b| {
        b.iter(|| derive_visible_items(black_box(&items), black_box(&searching)).len())
    });

    let starred = SelectionState {
        active_filter: Filter::Starred,
        search_term: "id".to_string(),
        ..SelectionState::initialize(&items)
    };
    c.bench_function("visible_items_starred_search", |b| {
        b.iter(|| derive_visible_items(black_box(&items), black_box(&starred)).len())
    });
}

criterion_group!(benches, bench_visible_items);
criterion_main!(benches);
