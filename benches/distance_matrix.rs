use arborist::{Tree, parse_newick};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::path::PathBuf;

/// Caterpillar tree with `tips` leaves: every clade has one leaf child.
fn caterpillar(tips: usize) -> Tree {
    let mut newick = String::from("T0:1");
    for i in 1..tips {
        newick = format!("({newick},T{i}:1):1");
    }
    newick.push(';');
    match parse_newick(&newick) {
        Ok(tree) => tree,
        Err(err) => panic!("generated tree failed to parse: {err}"),
    }
}

fn bench_distance_matrix(c: &mut Criterion) {
    let mut group = c.benchmark_group("distance_matrix");
    let _ = group.sample_size(20);

    // Sizes straddle the point where work moves onto the rayon pool.
    for tips in [50, 200, 800] {
        let tree = caterpillar(tips);
        let _ = group.bench_with_input(
            BenchmarkId::new("distance_matrix", tips),
            &tree,
            |b, tree| b.iter(|| black_box(tree.distance_matrix())),
        );
        let _ = group.bench_with_input(
            BenchmarkId::new("tip_heights", tips),
            &tree,
            |b, tree| b.iter(|| black_box(tree.tip_heights())),
        );
    }

    group.finish();
}

criterion_group!(
    name = benches;
    config = {
        let mut criterion = Criterion::default();
        let benchmark_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("benchmark_results");
        criterion = criterion.output_directory(&benchmark_dir);
        criterion = criterion.warm_up_time(std::time::Duration::from_millis(500));
        criterion = criterion.measurement_time(std::time::Duration::from_secs(5));
        criterion
    };
    targets = bench_distance_matrix
);
criterion_main!(benches);
