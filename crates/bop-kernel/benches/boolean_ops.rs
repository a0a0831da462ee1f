//! Boolean operation benchmarks.

use bop_kernel::math::Point3;
use bop_kernel::topo::make_box;
use bop_kernel::{BooleanOperation, BuilderAlgo, Shape};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn boxes() -> (Shape, Shape) {
    (
        make_box(Point3::origin(), 1.0, 1.0, 1.0),
        make_box(Point3::new(0.5, 0.5, 0.5), 1.0, 1.0, 1.0),
    )
}

fn fuse_overlapping_boxes(c: &mut Criterion) {
    let (a, b) = boxes();
    c.bench_function("fuse_overlapping_boxes", |bench| {
        bench.iter(|| {
            let mut op = BooleanOperation::fuse(vec![black_box(a.clone())], vec![b.clone()]);
            op.build()
        })
    });
}

fn cut_nested_boxes(c: &mut Criterion) {
    let outer = make_box(Point3::origin(), 3.0, 3.0, 3.0);
    let inner = make_box(Point3::new(1.0, 1.0, 1.0), 1.0, 1.0, 1.0);
    c.bench_function("cut_nested_boxes", |bench| {
        bench.iter(|| {
            let mut op = BooleanOperation::cut(vec![black_box(outer.clone())], vec![inner.clone()]);
            op.build()
        })
    });
}

fn general_fuse_serial_vs_parallel(c: &mut Criterion) {
    let (a, b) = boxes();
    for parallel in [false, true] {
        let name = if parallel {
            "general_fuse_parallel"
        } else {
            "general_fuse_serial"
        };
        c.bench_function(name, |bench| {
            bench.iter(|| {
                let mut algo = BuilderAlgo::new();
                algo.set_arguments(vec![black_box(a.clone()), b.clone()]);
                algo.set_run_parallel(parallel);
                algo.build()
            })
        });
    }
}

criterion_group!(
    benches,
    fuse_overlapping_boxes,
    cut_nested_boxes,
    general_fuse_serial_vs_parallel
);
criterion_main!(benches);
