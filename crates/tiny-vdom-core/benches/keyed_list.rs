use std::cell::RefCell;
use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tiny_vdom_core::{attrs, create, h, MemoryDocument, NodeId, Runtime, VNodeRef};

const ROW_COUNTS: &[usize] = &[16, 128, 1024];

fn table(keys: &[usize]) -> VNodeRef {
    create(
        "tbody",
        (),
        keys.iter().map(|&key| {
            h!(
                "tr",
                attrs! { "key" => key, "className" => if key % 2 == 0 { "even" } else { "odd" } },
                h!("td", (), key),
                h!("td", (), format!("row {key}"))
            )
        }),
    )
}

struct ListFixture {
    runtime: Runtime,
    container: NodeId,
    forward: Vec<usize>,
    reversed: Vec<usize>,
}

impl ListFixture {
    fn new(rows: usize) -> Self {
        let doc = Rc::new(RefCell::new(MemoryDocument::new()));
        let container = doc.borrow_mut().create_container();
        let runtime = Runtime::new(doc);
        let forward: Vec<usize> = (0..rows).collect();
        let reversed = forward.iter().rev().copied().collect();
        runtime
            .mount(table(&forward), container)
            .expect("initial mount");
        Self {
            runtime,
            container,
            forward,
            reversed,
        }
    }

    fn render(&self, keys: &[usize]) {
        let dom = self
            .runtime
            .render(table(keys), self.container)
            .expect("render");
        black_box(dom);
    }
}

fn bench_reverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed_reverse");
    for &rows in ROW_COUNTS {
        let fixture = ListFixture::new(rows);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, _| {
            b.iter(|| {
                fixture.render(&fixture.reversed);
                fixture.render(&fixture.forward);
            });
        });
    }
    group.finish();
}

fn bench_rotate(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed_rotate");
    for &rows in ROW_COUNTS {
        let fixture = ListFixture::new(rows);
        let mut rotated = fixture.forward.clone();
        rotated.rotate_left(1);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, _| {
            b.iter(|| {
                fixture.render(&rotated);
                fixture.render(&fixture.forward);
            });
        });
    }
    group.finish();
}

fn bench_unchanged(c: &mut Criterion) {
    let fixture = ListFixture::new(1024);
    c.bench_function("keyed_unchanged_1024", |b| {
        b.iter(|| fixture.render(&fixture.forward));
    });
}

criterion_group!(keyed_list, bench_reverse, bench_rotate, bench_unchanged);
criterion_main!(keyed_list);
