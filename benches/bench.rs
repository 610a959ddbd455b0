use std::hint::black_box;
use std::time::Instant;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::widgets::StatefulWidget;
use tui_tree_diagram::{layout, ChildRecord, Config, Diagram, DiagramState, NodePath};

/// Every node has `fan_out` children, fetched and expanded down to `depth`.
fn example_state(fan_out: usize, depth: usize) -> DiagramState {
    let now = Instant::now();
    let mut state = DiagramState::new(Config::default());
    state.set_root("root", now);
    let mut frontier = vec![NodePath::root()];
    for _ in 0..depth {
        let mut next = Vec::new();
        for path in frontier {
            let requests = state.toggle_node(&path, false, now).unwrap();
            for request in requests {
                let children = (1..=fan_out)
                    .map(|index| ChildRecord::new(format!("{}_{index}", request.key), "bench.rs", 1))
                    .collect();
                state.resolve_fetch(request, Ok(children), now);
            }
            next.extend((1..=fan_out).map(|ordinal| path.child(ordinal)));
        }
        frontier = next;
    }
    state
}

fn layouts(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("layout");
    group.throughput(Throughput::Elements(1));

    let config = Config::default();
    for (name, fan_out, depth) in [("small", 3, 2), ("wide", 30, 2), ("deep", 2, 8)] {
        let state = example_state(fan_out, depth);
        let root = state.root().unwrap();
        group.bench_function(name, |bencher| {
            bencher.iter(|| black_box(layout(black_box(root), &config)));
        });
    }

    group.finish();
}

fn toggles(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("toggle");
    group.throughput(Throughput::Elements(1));

    for (name, fan_out, depth) in [("small", 3, 2), ("wide", 30, 2), ("deep", 2, 8)] {
        let mut state = example_state(fan_out, depth);
        let first = NodePath::root().child(1);
        // collapse and expand again: two render passes without any fetch
        group.bench_function(name, |bencher| {
            bencher.iter(|| {
                let now = Instant::now();
                black_box(state.toggle_node(&first, false, now).unwrap());
                black_box(state.toggle_node(&first, false, now).unwrap());
            });
        });
    }

    group.finish();
}

fn renders(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("render");
    group.throughput(Throughput::Elements(1)); // Frames per second

    let buffer_size = Rect::new(0, 0, 200, 60);

    group.bench_function("empty", |bencher| {
        bencher.iter_batched(
            DiagramState::default,
            |mut state| {
                let mut buffer = Buffer::empty(buffer_size);
                Diagram::new().render(buffer_size, black_box(&mut buffer), &mut state);
            },
            BatchSize::SmallInput,
        );
    });

    for (name, fan_out, depth) in [("small", 3, 2), ("wide", 30, 2)] {
        let mut state = example_state(fan_out, depth);
        let now = Instant::now() + Config::default().duration;
        group.bench_function(name, |bencher| {
            bencher.iter(|| {
                let mut buffer = Buffer::empty(buffer_size);
                Diagram::new()
                    .at(now)
                    .render(buffer_size, black_box(&mut buffer), &mut state);
            });
        });
    }

    group.finish();
}

/// Create flamegraphs with `cargo bench --bench bench -- --profile-time=5`
#[cfg(unix)]
fn profiled() -> Criterion {
    use pprof::criterion::{Output, PProfProfiler};
    Criterion::default().with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
}
#[cfg(not(unix))]
fn profiled() -> Criterion {
    Criterion::default()
}

criterion_group! {
    name = benches;
    config = profiled();
    targets = layouts, toggles, renders
}
criterion_main!(benches);
