use criterion::{Criterion, criterion_group, criterion_main};
use gridnote_engine::{
    Direction, EditorState, Selection, TableMap, arrow_horizontal, go_to_next_cell,
    normalize_tables, parse, serialize,
};
mod common;

fn bench_markdown(c: &mut Criterion) {
    let mut group = c.benchmark_group("markdown");
    group.sample_size(10);

    let content = common::generate_document(10);
    group.bench_function("parse", |b| {
        b.iter(|| std::hint::black_box(parse(std::hint::black_box(&content))));
    });

    let doc = parse(&content);
    group.bench_function("serialize", |b| {
        b.iter(|| std::hint::black_box(serialize(std::hint::black_box(&doc))));
    });

    group.finish();
}

fn bench_table_ops(c: &mut Criterion) {
    let mut group = c.benchmark_group("tables");
    group.sample_size(10);

    let content = common::generate_table(100, 8);
    let state = EditorState::from_markdown(&content);
    let table = state.doc().child(0).cloned();

    group.bench_function("table_map_compute", |b| {
        b.iter(|| {
            if let Some(table) = &table {
                std::hint::black_box(TableMap::compute(table));
            }
        });
    });

    // cursor inside the first header cell
    let state = state.with_selection(Selection::cursor(4));
    group.bench_function("tab_to_next_cell", |b| {
        let tab = go_to_next_cell(Direction::Forward);
        b.iter(|| std::hint::black_box(tab(&state, None)));
    });
    group.bench_function("arrow_right", |b| {
        let arrow = arrow_horizontal(Direction::Forward);
        b.iter(|| std::hint::black_box(arrow(&state, None)));
    });
    group.bench_function("normalize_dry_run", |b| {
        b.iter(|| std::hint::black_box(normalize_tables(&state, None)));
    });

    group.finish();
}

criterion_group!(benches, bench_markdown, bench_table_ops);
criterion_main!(benches);
