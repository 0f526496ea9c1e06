use criterion::{black_box, criterion_group, criterion_main, Criterion};

#[path = "../tests/common/mod.rs"]
mod common;

use common::{load, Item};

fn document(words: usize) -> String {
    (0..words)
        .map(|index| match index % 3 {
            0 => format!("word{index}"),
            1 => format!("word{index}!"),
            _ => format!("[inner{index}, other{index}?]"),
        })
        .collect::<Vec<_>>()
        .join(",\n  ")
}

fn bench_initialize(c: &mut Criterion) {
    let text = document(200);
    c.bench_function("initialize_200_items", |b| b.iter(|| load(black_box(&text)).unwrap()));
}

fn bench_render_unchanged(c: &mut Criterion) {
    let mut doc = load(&document(200)).unwrap();
    c.bench_function("render_unchanged_200_items", |b| b.iter(|| doc.render().unwrap()));
}

fn bench_render_edited(c: &mut Criterion) {
    let mut doc = load(&document(200)).unwrap();
    {
        let mut root = doc.root.borrow_mut();
        root.items.remove(50);
        root.items.insert(100, Item::word("fresh"));
        root.items.push(Item::list(vec![Item::word("tail")]));
    }
    doc.word(0).borrow_mut().name = "renamed".to_string();

    c.bench_function("render_edited_200_items", |b| b.iter(|| doc.render().unwrap()));
}

criterion_group!(benches, bench_initialize, bench_render_unchanged, bench_render_edited);
criterion_main!(benches);
